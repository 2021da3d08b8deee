//! Call-tree nodes shared by every builder and consumer.
//!
//! Each parent owns its children outright. Builders keep whatever cursor
//! they need on the side; nodes never point back at their parent.

use crate::frame::Frame;
use crate::utils::config::SAMPLE_PERIOD_NS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Call trees keyed by thread id
pub type ThreadTrees = BTreeMap<String, Vec<Node>>;

/// One call-tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    #[serde(default)]
    pub package: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: u32,

    pub start_ns: u64,
    pub end_ns: u64,
    pub duration_ns: u64,
    pub fingerprint: u64,
    pub sample_count: u64,
    pub is_application: bool,

    /// Frame this node was built from
    #[serde(skip)]
    pub frame: Frame,

    #[serde(default)]
    pub children: Vec<Node>,
}

fn is_zero(line: &u32) -> bool {
    *line == 0
}

impl Node {
    /// Create a node for `frame` covering `[start_ns, end_ns)` with one sample
    pub fn from_frame(
        frame: &Frame,
        start_ns: u64,
        end_ns: u64,
        fingerprint: u64,
        is_application: bool,
    ) -> Self {
        Self {
            name: frame.function.clone(),
            package: frame.package_base_name().to_string(),
            path: frame.path.clone(),
            line: frame.line,
            start_ns,
            end_ns,
            duration_ns: end_ns.saturating_sub(start_ns),
            fingerprint,
            sample_count: 1,
            is_application,
            frame: frame.clone(),
            children: Vec::new(),
        }
    }

    /// Extend the node to end at `end_ns`, counting one more sample
    pub fn extend(&mut self, end_ns: u64) {
        self.set_end(end_ns);
        self.sample_count += 1;
    }

    /// Close the node at `end_ns` and estimate its sample count from duration
    pub fn close(&mut self, end_ns: u64) {
        self.set_end(end_ns);
        self.sample_count = estimate_sample_count(self.duration_ns);
    }

    fn set_end(&mut self, end_ns: u64) {
        self.end_ns = end_ns.max(self.start_ns);
        self.duration_ns = self.end_ns - self.start_ns;
    }

    /// Time spent in this node outside of its children
    pub fn self_time_ns(&self) -> u64 {
        let children: u64 = self.children.iter().map(|c| c.duration_ns).sum();
        self.duration_ns.saturating_sub(children)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Total number of nodes in this subtree, itself included
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Samples a span of `duration_ns` would have produced at the sampling period
pub fn estimate_sample_count(duration_ns: u64) -> u64 {
    duration_ns.div_ceil(SAMPLE_PERIOD_NS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_sample_count_rounds_up() {
        assert_eq!(estimate_sample_count(0), 0);
        assert_eq!(estimate_sample_count(1), 1);
        assert_eq!(estimate_sample_count(SAMPLE_PERIOD_NS), 1);
        assert_eq!(estimate_sample_count(SAMPLE_PERIOD_NS + 1), 2);
    }

    #[test]
    fn test_extend_counts_samples() {
        let frame = Frame::new("main", "/bin/app");
        let mut node = Node::from_frame(&frame, 10, 20, frame.fingerprint(), true);
        node.extend(40);
        assert_eq!(node.end_ns, 40);
        assert_eq!(node.duration_ns, 30);
        assert_eq!(node.sample_count, 2);
        assert_eq!(node.package, "app");
    }

    #[test]
    fn test_self_time_excludes_children() {
        let frame = Frame::new("main", "");
        let mut node = Node::from_frame(&frame, 0, 100, 1, true);
        node.children.push(Node::from_frame(&frame, 0, 30, 2, true));
        node.children.push(Node::from_frame(&frame, 40, 90, 3, true));
        assert_eq!(node.self_time_ns(), 20);
        assert_eq!(node.children[0].self_time_ns(), 30);
    }

    #[test]
    fn test_close_never_precedes_start() {
        let frame = Frame::new("main", "");
        let mut node = Node::from_frame(&frame, 3_000, 3_000, 1, false);
        node.close(1_000);
        assert_eq!(node.end_ns, 3_000);
        assert_eq!(node.duration_ns, 0);
        assert_eq!(node.sample_count, 0);
    }
}
