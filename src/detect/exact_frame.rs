//! Exact-frame search: the first node matching a catalog entry.

use super::catalog::ExactFrameRule;
use super::{Category, DetectOptions, Occurrence};
use crate::nodetree::{Node, ThreadTrees};
use log::debug;

/// Find the first node matching `rule`
///
/// Threads are visited in id order (only the active thread when the rule
/// asks for it), each tree depth-first with children in order. A node
/// matches when its package and name are in the rule, it lasted at least
/// `options.min_duration_ns` and it was seen in more than one sample.
pub fn detect_exact_frame(
    trees: &ThreadTrees,
    rule: &ExactFrameRule,
    options: &DetectOptions<'_>,
) -> Option<Occurrence> {
    let threads: Vec<(&String, &Vec<Node>)> = if rule.active_thread_only {
        let active = options.active_thread_id?;
        trees.get_key_value(active).into_iter().collect()
    } else {
        trees.iter().collect()
    };

    for (thread_id, roots) in threads {
        for root in roots {
            let mut path = Vec::new();
            if let Some(found) = search(root, rule, options.min_duration_ns, &mut path) {
                debug!("Matched \"{}\" on thread {}", rule.issue_title, thread_id);
                return Some(Occurrence::from_path(rule.issue_title, Category::BlockingCall, thread_id, &found, None));
            }
        }
    }
    None
}

fn search<'a>(
    node: &'a Node,
    rule: &ExactFrameRule,
    min_duration_ns: u64,
    path: &mut Vec<&'a Node>,
) -> Option<Vec<&'a Node>> {
    path.push(node);
    if node.sample_count != 1
        && node.duration_ns >= min_duration_ns
        && rule.matches(&node.package, &node.name)
    {
        return Some(path.clone());
    }
    for child in &node.children {
        if let Some(found) = search(child, rule, min_duration_ns, path) {
            return Some(found);
        }
    }
    path.pop();
    None
}
