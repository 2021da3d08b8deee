//! Restricting call trees to time intervals.
//!
//! Intervals are first normalized (sorted and merged), then every node is
//! kept only if it overlaps the merged set. Surviving nodes get their sample
//! count re-estimated from the overlapping time.

pub mod interval;

pub use interval::{merge_intervals, overlapping_duration, overlaps, Interval, Span};

use crate::nodetree::{estimate_sample_count, Node, ThreadTrees};
use log::debug;

/// Time `node` spends inside the merged interval set
///
/// `intervals` must be sorted and non-overlapping, as returned by
/// [`merge_intervals`].
pub fn total_overlapping_duration(node: &impl Span, intervals: &[Interval]) -> u64 {
    let mut total = 0;
    for interval in intervals {
        if node.end_ns() <= interval.start_ns {
            break;
        }
        total += overlapping_duration(node, interval);
    }
    total
}

/// Keep only the parts of `roots` that overlap `intervals`
///
/// **Public** - main entry point for slicing one thread
///
/// # Arguments
/// * `roots` - Top-level nodes of one thread
/// * `intervals` - Time ranges to keep, in any order, possibly overlapping
///
/// # Returns
/// The surviving nodes with re-estimated sample counts. Empty when either
/// input is empty.
///
/// # Algorithm
/// 1. Sort the intervals and merge any that touch or overlap
/// 2. Visit nodes parent first, summing each node's overlap with the set
/// 3. Drop nodes without overlap and set the rest to `ceil(overlap / 10ms)`
///    samples
/// 4. Recurse into the children of every surviving node
pub fn slice_call_tree(roots: Vec<Node>, intervals: &[Interval]) -> Vec<Node> {
    let merged = merge_intervals(intervals.to_vec());
    slice_merged(roots, &merged)
}

fn slice_merged(nodes: Vec<Node>, merged: &[Interval]) -> Vec<Node> {
    nodes
        .into_iter()
        .filter_map(|mut node| {
            let overlap = total_overlapping_duration(&node, merged);
            if overlap == 0 {
                return None;
            }
            node.sample_count = estimate_sample_count(overlap);
            let children = std::mem::take(&mut node.children);
            node.children = slice_merged(children, merged);
            Some(node)
        })
        .collect()
}

/// Slice every thread, dropping threads left without nodes
pub fn slice_thread_trees(trees: ThreadTrees, intervals: &[Interval]) -> ThreadTrees {
    let merged = merge_intervals(intervals.to_vec());
    let sliced: ThreadTrees = trees
        .into_iter()
        .filter_map(|(thread_id, roots)| {
            let roots = slice_merged(roots, &merged);
            (!roots.is_empty()).then_some((thread_id, roots))
        })
        .collect();
    debug!("Sliced call trees down to {} threads", sliced.len());
    sliced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn node(name: &str, start_ns: u64, end_ns: u64, children: Vec<Node>) -> Node {
        let frame = Frame::new(name, "pkg");
        let mut node = Node::from_frame(&frame, start_ns, end_ns, frame.fingerprint(), true);
        node.children = children;
        node
    }

    #[test]
    fn test_total_overlap_sums_intervals() {
        let n = node("a", 0, 100, vec![]);
        let merged = vec![Interval::new(10, 20), Interval::new(50, 70), Interval::new(200, 300)];
        assert_eq!(total_overlapping_duration(&n, &merged), 30);
    }

    #[test]
    fn test_slice_drops_outside_nodes() {
        let roots = vec![
            node("a", 0, 40_000_000, vec![node("b", 0, 10_000_000, vec![]), node("c", 20_000_000, 40_000_000, vec![])]),
            node("d", 50_000_000, 60_000_000, vec![]),
        ];
        let sliced = slice_call_tree(roots, &[Interval::new(25_000_000, 45_000_000)]);
        assert_eq!(sliced.len(), 1);
        assert_eq!(sliced[0].name, "a");
        assert_eq!(sliced[0].sample_count, 2);
        assert_eq!(sliced[0].children.len(), 1);
        assert_eq!(sliced[0].children[0].name, "c");
        assert_eq!(sliced[0].children[0].sample_count, 2);
    }

    #[test]
    fn test_slice_empty_inputs() {
        assert!(slice_call_tree(vec![], &[Interval::new(0, 10)]).is_empty());
        assert!(slice_call_tree(vec![node("a", 0, 10, vec![])], &[]).is_empty());
    }

    #[test]
    fn test_touching_interval_does_not_overlap() {
        let sliced = slice_call_tree(vec![node("a", 0, 10, vec![])], &[Interval::new(10, 20)]);
        assert!(sliced.is_empty());
    }
}
