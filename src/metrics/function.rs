//! Per-function self time collected from one profile's call trees.

use crate::frame::Platform;
use crate::nodetree::{Node, ThreadTrees};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Self time of one function across a profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTreeFunction {
    pub fingerprint: u64,
    pub function: String,
    pub package: String,
    pub in_app: bool,

    /// Thread the function was first seen on
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thread_id: String,

    /// One entry per call-tree node attributed to the function
    pub self_times_ns: Vec<u64>,
    pub sum_self_time_ns: u64,
    pub sum_duration_ns: u64,
    pub max_duration_ns: u64,
    pub sample_count: u64,
}

impl CallTreeFunction {
    fn from_node(node: &Node, fingerprint: u64, thread_id: &str) -> Self {
        Self {
            fingerprint,
            function: node.name.clone(),
            package: node.package.clone(),
            in_app: node.is_application,
            thread_id: thread_id.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, node: &Node, self_time_ns: u64) {
        self.self_times_ns.push(self_time_ns);
        self.sum_self_time_ns += self_time_ns;
        self.sum_duration_ns += node.duration_ns;
        self.max_duration_ns = self.max_duration_ns.max(self_time_ns);
        self.sample_count += node.sample_count;
    }
}

/// Extract function metrics from every thread of a profile
///
/// **Public** - main entry point for per-profile function metrics
///
/// # Arguments
/// * `trees` - Call trees keyed by thread id
/// * `platform` - Platform the trees were built for
/// * `min_depth` - Nodes shallower than this are not counted (roots are 0)
///
/// # Returns
/// Functions with non-zero self time seen in more than one sample, heaviest
/// self time first, ties broken by total duration.
///
/// # Algorithm
/// 1. Walk each tree depth-first, computing each node's self time
/// 2. Carry system self time up to the nearest application ancestor
/// 3. Merge nodes of the same function by frame fingerprint
/// 4. Drop functions without self time or with a single sample, then sort
pub fn extract_functions(trees: &ThreadTrees, platform: Platform, min_depth: usize) -> Vec<CallTreeFunction> {
    let mut functions = BTreeMap::new();
    for (thread_id, roots) in trees {
        for root in roots {
            collect(root, platform, thread_id, 0, min_depth, &mut functions);
        }
    }
    merge_and_sort(functions)
}

/// Extract function metrics from the roots of a single thread
pub fn extract_thread_functions(roots: &[Node], platform: Platform, min_depth: usize) -> Vec<CallTreeFunction> {
    let mut functions = BTreeMap::new();
    for root in roots {
        collect(root, platform, "", 0, min_depth, &mut functions);
    }
    merge_and_sort(functions)
}

/// Keep at most `max_functions`, optionally only application functions
///
/// Expects the heaviest-first order [`extract_functions`] returns.
pub fn cap_and_filter_functions(
    functions: Vec<CallTreeFunction>,
    max_functions: usize,
    application_only: bool,
) -> Vec<CallTreeFunction> {
    functions
        .into_iter()
        .filter(|f| !application_only || f.in_app)
        .take(max_functions)
        .collect()
}

/// Whether a frame is meaningful on its own in function metrics
pub fn should_aggregate(node: &Node, platform: Platform) -> bool {
    if node.name.is_empty() {
        return false;
    }
    // Every cocoa thread starts in `main`
    !(platform == Platform::Cocoa && node.name == "main")
}

/// Returns the system self time below `node` not yet attributed to an
/// application frame
fn collect(
    node: &Node,
    platform: Platform,
    thread_id: &str,
    depth: usize,
    min_depth: usize,
    functions: &mut BTreeMap<u64, CallTreeFunction>,
) -> u64 {
    let pending: u64 = node
        .children
        .iter()
        .map(|child| collect(child, platform, thread_id, depth + 1, min_depth, functions))
        .sum();

    let self_time = node.self_time_ns();
    let (attributed, carried) = if node.is_application {
        (self_time + pending, 0)
    } else {
        (self_time, pending + self_time)
    };

    if attributed > 0 && depth >= min_depth && should_aggregate(node, platform) {
        let fingerprint = node.frame.fingerprint();
        functions
            .entry(fingerprint)
            .or_insert_with(|| CallTreeFunction::from_node(node, fingerprint, thread_id))
            .record(node, attributed);
    }
    carried
}

fn merge_and_sort(functions: BTreeMap<u64, CallTreeFunction>) -> Vec<CallTreeFunction> {
    let mut list: Vec<CallTreeFunction> = functions
        .into_values()
        .filter(|f| f.sum_self_time_ns > 0 && f.sample_count > 1)
        .collect();
    list.sort_by(|a, b| {
        b.sum_self_time_ns
            .cmp(&a.sum_self_time_ns)
            .then(b.sum_duration_ns.cmp(&a.sum_duration_ns))
    });
    list
}
