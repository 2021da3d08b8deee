//! Performance issue detection over built call trees.
//!
//! Two strategies run over the same trees:
//! - Exact-frame match against a per-platform catalog of blocking functions
//! - Heaviest-path search through each frozen frame interval

pub mod catalog;
pub mod exact_frame;
pub mod frame_drop;

pub use catalog::{rules_for, ExactFrameRule};
pub use exact_frame::detect_exact_frame;
pub use frame_drop::{detect_frame_drops, find_frame_drop_cause, frozen_intervals};

use crate::fragment::Fragment;
use crate::frame::Frame;
use crate::nodetree::{Node, ThreadTrees};
use crate::slice::Interval;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// Kind of detected issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BlockingCall,
    FrameDrop,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BlockingCall => "blocking_call",
            Category::FrameDrop => "frame_drop",
        }
    }
}

/// Options shared by the detectors
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions<'a> {
    /// The main/UI thread; rules restricted to it match nothing when unset
    pub active_thread_id: Option<&'a str>,
    pub min_duration_ns: u64,
}

impl<'a> DetectOptions<'a> {
    pub fn with_active_thread(mut self, thread_id: Option<&'a str>) -> Self {
        self.active_thread_id = thread_id;
        self
    }

    pub fn with_min_duration_ns(mut self, min_duration_ns: u64) -> Self {
        self.min_duration_ns = min_duration_ns;
        self
    }
}

/// A detected issue and the call path leading to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub issue_title: String,
    pub category: Category,

    /// Package of the culprit frame
    pub package: String,

    /// Function of the culprit frame
    pub function: String,

    pub frame: Frame,

    /// Frames from the root down to the culprit
    pub stack_trace: Vec<Frame>,

    pub thread_id: String,
    pub duration_ns: u64,
    pub sample_count: u64,

    /// Stable grouping key for the issue
    pub fingerprint: String,

    pub detected_at: DateTime<Utc>,

    /// Frozen interval the culprit was found in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
}

impl Occurrence {
    /// Build an occurrence from a root-first path whose last node is the culprit
    pub fn from_path(
        issue_title: &str,
        category: Category,
        thread_id: &str,
        path: &[&Node],
        interval: Option<Interval>,
    ) -> Self {
        let culprit = path.last();
        let package = culprit.map(|n| n.package.clone()).unwrap_or_default();
        let function = culprit.map(|n| n.name.clone()).unwrap_or_default();

        Self {
            fingerprint: occurrence_fingerprint(issue_title, category, &package, &function),
            issue_title: issue_title.to_string(),
            category,
            frame: culprit.map(|n| n.frame.clone()).unwrap_or_default(),
            stack_trace: path.iter().map(|n| n.frame.clone()).collect(),
            thread_id: thread_id.to_string(),
            duration_ns: culprit.map_or(0, |n| n.duration_ns),
            sample_count: culprit.map_or(0, |n| n.sample_count),
            detected_at: Utc::now(),
            package,
            function,
            interval,
        }
    }
}

fn occurrence_fingerprint(title: &str, category: Category, package: &str, function: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in [title, category.as_str(), package, function] {
        hasher.update(part.as_bytes());
        hasher.update(&[0]);
    }
    let mut hex = hasher.finalize().to_hex().to_string();
    hex.truncate(32);
    hex
}

/// Run every detector applicable to `fragment` over its call trees
///
/// The active thread defaults to the fragment's main thread. Exact-frame
/// rules come first in catalog order, followed by frame drops in interval
/// order.
pub fn detect_occurrences(
    fragment: &Fragment,
    trees: &ThreadTrees,
    options: &DetectOptions<'_>,
) -> Vec<Occurrence> {
    let active = options
        .active_thread_id
        .map(str::to_string)
        .or_else(|| fragment.main_thread_id());
    let options = DetectOptions {
        active_thread_id: active.as_deref(),
        ..*options
    };

    let mut occurrences: Vec<Occurrence> = rules_for(fragment.platform())
        .iter()
        .filter_map(|rule| detect_exact_frame(trees, rule, &options))
        .collect();

    if let Some(thread_id) = options.active_thread_id {
        let intervals = frozen_intervals(fragment);
        occurrences.extend(detect_frame_drops(trees, thread_id, &intervals));
    }

    info!(
        "Detected {} occurrences in fragment {}",
        occurrences.len(),
        fragment.id()
    );
    occurrences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(function: &str, package: &str) -> Node {
        let frame = Frame::new(function, package);
        Node::from_frame(&frame, 0, 20_000_000, frame.fingerprint(), true)
    }

    #[test]
    fn test_occurrence_from_path() {
        let root = node("main", "app");
        let leaf = node("readFileSync", "node:fs");
        let occurrence = Occurrence::from_path("title", Category::BlockingCall, "1", &[&root, &leaf], None);
        assert_eq!(occurrence.package, "node:fs");
        assert_eq!(occurrence.function, "readFileSync");
        assert_eq!(occurrence.frame.function, "readFileSync");
        assert_eq!(occurrence.stack_trace.len(), 2);
        assert_eq!(occurrence.duration_ns, 20_000_000);
        assert_eq!(occurrence.fingerprint.len(), 32);
    }

    #[test]
    fn test_fingerprint_stable_per_culprit() {
        let a = occurrence_fingerprint("t", Category::FrameDrop, "app", "f");
        let b = occurrence_fingerprint("t", Category::FrameDrop, "app", "f");
        let c = occurrence_fingerprint("t", Category::BlockingCall, "app", "f");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&Category::FrameDrop).unwrap();
        assert_eq!(json, "\"frame_drop\"");
    }

    #[test]
    fn test_empty_trees_yield_nothing() {
        let fragment = Fragment::Sample(Default::default());
        let options = DetectOptions::default().with_active_thread(Some("1"));
        assert!(detect_occurrences(&fragment, &ThreadTrees::new(), &options).is_empty());
    }
}
