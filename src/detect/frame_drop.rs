//! Heaviest-path search for the cause of a frozen frame.

use super::{Category, Occurrence};
use crate::fragment::{seconds_to_ns, Fragment, Measurements};
use crate::nodetree::{Node, ThreadTrees};
use crate::slice::{overlapping_duration, Interval};
use crate::utils::config::FROZEN_FRAME_MEASUREMENT;
use log::debug;

pub const FRAME_DROP_TITLE: &str = "Frame Drop";

/// Follow the heaviest path through the frozen interval
///
/// Among several candidates only those running during `frozen` are considered
/// and the longest one is taken (the first on ties). A lone child is
/// followed regardless. At the leaf the path is cut back to its last
/// application frame, which is returned as the final element.
pub fn find_frame_drop_cause<'a>(roots: &'a [Node], frozen: &Interval) -> Option<Vec<&'a Node>> {
    let mut path: Vec<&'a Node> = Vec::new();
    let mut candidates = roots;

    loop {
        let next = match candidates {
            [only] if !path.is_empty() => only,
            _ => heaviest_overlapping(candidates, frozen)?,
        };
        path.push(next);
        if next.is_leaf() {
            break;
        }
        candidates = &next.children;
    }

    let culprit = path.iter().rposition(|n| n.is_application)?;
    path.truncate(culprit + 1);
    Some(path)
}

fn heaviest_overlapping<'a>(nodes: &'a [Node], frozen: &Interval) -> Option<&'a Node> {
    let mut heaviest: Option<&'a Node> = None;
    for node in nodes.iter().filter(|n| overlapping_duration(*n, frozen) > 0) {
        if heaviest.map_or(true, |h| node.duration_ns > h.duration_ns) {
            heaviest = Some(node);
        }
    }
    heaviest
}

/// Frozen frame intervals of a fragment, in the time base of its call trees
///
/// Sample trees are timed in absolute nanoseconds and event trees from the
/// fragment start. Each measured value is a render duration ending at the
/// point's time.
pub fn frozen_intervals(fragment: &Fragment) -> Vec<Interval> {
    let (origin, relative) = match fragment {
        Fragment::Sample(f) => (f.start_ns(), false),
        Fragment::Event(f) => (f.start_ns(), true),
    };
    frozen_intervals_from(fragment.measurements(), origin, relative)
}

fn frozen_intervals_from(measurements: &Measurements, origin_ns: u64, relative: bool) -> Vec<Interval> {
    let Some(measurement) = measurements.get(FROZEN_FRAME_MEASUREMENT) else {
        return Vec::new();
    };
    measurement
        .values
        .iter()
        .map(|value| {
            let absolute_end = match value.timestamp {
                Some(ts) => seconds_to_ns(ts),
                None => origin_ns.saturating_add(value.elapsed_since_start_ns),
            };
            let end = if relative {
                absolute_end.saturating_sub(origin_ns)
            } else {
                absolute_end
            };
            let duration = value.value.max(0.0) as u64;
            Interval::new(end.saturating_sub(duration), end)
        })
        .collect()
}

/// Search the active thread for the cause of every frozen interval
pub fn detect_frame_drops(
    trees: &ThreadTrees,
    active_thread_id: &str,
    intervals: &[Interval],
) -> Vec<Occurrence> {
    let Some(roots) = trees.get(active_thread_id) else {
        return Vec::new();
    };
    let occurrences: Vec<Occurrence> = intervals
        .iter()
        .filter_map(|frozen| {
            let path = find_frame_drop_cause(roots, frozen)?;
            Some(Occurrence::from_path(
                FRAME_DROP_TITLE,
                Category::FrameDrop,
                active_thread_id,
                &path,
                Some(*frozen),
            ))
        })
        .collect();
    debug!(
        "Found {} frame drop causes in {} frozen intervals",
        occurrences.len(),
        intervals.len()
    );
    occurrences
}
