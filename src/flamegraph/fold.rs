//! Folding call trees into weighted stacks.

use crate::frame::{fingerprint_of, Frame};
use crate::metrics::{quantile, FunctionMetrics};
use crate::nodetree::Node;
use crate::utils::config::DEFAULT_MIN_FREQUENCY;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One folded stack and its accumulated weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedStack {
    /// Frames from root to leaf
    pub frames: Vec<Frame>,
    /// Whether each frame was classified as application code
    pub is_application: Vec<bool>,
    /// Fingerprint of the terminal node, the deduplication key
    pub fingerprint: u64,
    pub weight: u64,
    /// Time spent in the terminal frame itself
    pub duration_ns: u64,
}

/// Statistics for one frame across every node folded into a flamegraph
///
/// Frames are identified by package base name and function, so a frame
/// reached through different callers shares one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    #[serde(skip)]
    pub fingerprint: u64,

    /// Number of nodes seen for the frame
    pub count: u64,
    pub weight: u64,
    pub sum_duration_ns: u64,
    pub sum_self_time_ns: u64,
    pub p75_duration_ns: u64,
    pub p95_duration_ns: u64,
    pub p99_duration_ns: u64,

    #[serde(skip)]
    durations_ns: Vec<u64>,
}

impl FrameInfo {
    fn add(&mut self, node: &Node) {
        self.count += 1;
        self.weight += node.duration_ns;
        self.sum_duration_ns += node.duration_ns;
        self.sum_self_time_ns += node.self_time_ns();
        self.durations_ns.push(node.duration_ns);
    }

    fn finish(&mut self) {
        self.durations_ns.sort_unstable();
        self.p75_duration_ns = quantile(&self.durations_ns, 0.75).unwrap_or(0);
        self.p95_duration_ns = quantile(&self.durations_ns, 0.95).unwrap_or(0);
        self.p99_duration_ns = quantile(&self.durations_ns, 0.99).unwrap_or(0);
    }
}

/// Accumulates folded stacks across any number of trees
///
/// Stacks are keyed by their terminal node's fingerprint. The first stack
/// seen for a key is kept and later ones only add weight.
#[derive(Debug, Default)]
pub struct Folder {
    stacks: Vec<FoldedStack>,
    index: HashMap<u64, usize>,
    frame_infos: Vec<FrameInfo>,
    frame_index: HashMap<u64, usize>,
    max_samples: Option<usize>,
}

impl Folder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_samples` stacks when finishing
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    /// Fold every root of one thread
    ///
    /// **Public** - main entry point for folding
    ///
    /// # Arguments
    /// * `roots` - Top-level call-tree nodes of one thread
    /// * `root_path` - Frames prepended to every stack, such as a thread label
    ///
    /// # Algorithm
    /// 1. Walk each tree depth-first, keeping the path from the root
    /// 2. At a leaf, record the path with the leaf's sample count
    /// 3. At an inner node, record the samples its children do not account for
    /// 4. Merge stacks by terminal fingerprint, adding weight
    pub fn add_trees(&mut self, roots: &[Node], root_path: &[Frame]) {
        let mut path: Vec<&Node> = Vec::new();
        for root in roots {
            self.visit(root, root_path, &mut path);
        }
    }

    fn visit<'a>(&mut self, node: &'a Node, root_path: &[Frame], path: &mut Vec<&'a Node>) {
        path.push(node);
        self.add_frame_info(node);
        if node.is_leaf() {
            self.record(root_path, path, node.sample_count, node.duration_ns);
        } else {
            let mut children_count = 0;
            for child in &node.children {
                self.visit(child, root_path, path);
                children_count += child.sample_count;
            }
            if node.sample_count > children_count {
                self.record(root_path, path, node.sample_count - children_count, node.self_time_ns());
            }
        }
        path.pop();
    }

    fn add_frame_info(&mut self, node: &Node) {
        let fingerprint = fingerprint_of(&node.frame);
        let idx = match self.frame_index.get(&fingerprint) {
            Some(&idx) => idx,
            None => {
                self.frame_index.insert(fingerprint, self.frame_infos.len());
                self.frame_infos.push(FrameInfo {
                    fingerprint,
                    ..Default::default()
                });
                self.frame_infos.len() - 1
            }
        };
        self.frame_infos[idx].add(node);
    }

    fn record(&mut self, root_path: &[Frame], path: &[&Node], weight: u64, duration_ns: u64) {
        let Some(terminal) = path.last() else {
            return;
        };
        if weight == 0 {
            return;
        }
        if let Some(&idx) = self.index.get(&terminal.fingerprint) {
            self.stacks[idx].weight += weight;
            self.stacks[idx].duration_ns += duration_ns;
            return;
        }

        let mut frames = root_path.to_vec();
        let mut is_application = vec![false; root_path.len()];
        for node in path {
            frames.push(node.frame.clone());
            is_application.push(node.is_application);
        }
        self.index.insert(terminal.fingerprint, self.stacks.len());
        self.stacks.push(FoldedStack {
            frames,
            is_application,
            fingerprint: terminal.fingerprint,
            weight,
            duration_ns,
        });
    }

    /// Drop stacks lighter than `min_frequency`, cap the rest and return the
    /// result
    ///
    /// When capped, stacks are ranked by weight, then duration, then depth;
    /// survivors keep their first-seen order.
    pub fn finish(self, min_frequency: u64) -> Flamegraph {
        let total = self.stacks.len();
        let mut stacks: Vec<FoldedStack> = self
            .stacks
            .into_iter()
            .filter(|s| s.weight >= min_frequency)
            .collect();
        debug!("Folded {} stacks, {} above minimum frequency {}", total, stacks.len(), min_frequency);

        if let Some(max_samples) = self.max_samples {
            if stacks.len() > max_samples {
                stacks = keep_heaviest(stacks, max_samples);
                debug!("Capped flamegraph to {} stacks", max_samples);
            }
        }

        let mut frame_infos = self.frame_infos;
        for info in &mut frame_infos {
            info.finish();
        }

        Flamegraph {
            stacks,
            frame_infos,
            metrics: Vec::new(),
        }
    }
}

fn keep_heaviest(stacks: Vec<FoldedStack>, max_samples: usize) -> Vec<FoldedStack> {
    let mut order: Vec<usize> = (0..stacks.len()).collect();
    order.sort_by(|&a, &b| {
        let (x, y) = (&stacks[a], &stacks[b]);
        y.weight
            .cmp(&x.weight)
            .then(y.duration_ns.cmp(&x.duration_ns))
            .then(y.frames.len().cmp(&x.frames.len()))
            .then(a.cmp(&b))
    });
    let mut keep = vec![false; stacks.len()];
    for &idx in order.iter().take(max_samples) {
        keep[idx] = true;
    }
    stacks
        .into_iter()
        .zip(keep)
        .filter_map(|(stack, keep)| keep.then_some(stack))
        .collect()
}

/// Weighted stacks in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flamegraph {
    pub stacks: Vec<FoldedStack>,

    /// Per-frame statistics in first-seen order
    pub frame_infos: Vec<FrameInfo>,

    /// Function metrics gathered alongside the trees, if requested
    pub metrics: Vec<FunctionMetrics>,
}

impl Flamegraph {
    /// Statistics for the frame with this single-frame fingerprint
    pub fn frame_info(&self, fingerprint: u64) -> Option<&FrameInfo> {
        self.frame_infos.iter().find(|info| info.fingerprint == fingerprint)
    }

    /// Weight per terminal fingerprint
    pub fn weights(&self) -> BTreeMap<u64, u64> {
        self.stacks.iter().map(|s| (s.fingerprint, s.weight)).collect()
    }

    pub fn total_weight(&self) -> u64 {
        self.stacks.iter().map(|s| s.weight).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// `root;child;leaf weight` lines for flamegraph renderers
    pub fn collapsed_lines(&self) -> Vec<String> {
        self.stacks
            .iter()
            .map(|stack| {
                let names: Vec<String> = stack.frames.iter().map(collapsed_name).collect();
                format!("{} {}", names.join(";"), stack.weight)
            })
            .collect()
    }
}

// Collapsed format reserves `;` as separator and the last space for the count
fn collapsed_name(frame: &Frame) -> String {
    let name = if frame.function.is_empty() {
        "unknown"
    } else {
        frame.function.as_str()
    };
    let package = frame.package_base_name();
    let label = if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}`{name}")
    };
    label.replace(';', ":").replace(' ', "_")
}

/// Fold `roots` with the default minimum frequency
pub fn fold(roots: &[Node], root_path: &[Frame]) -> Flamegraph {
    let mut folder = Folder::new();
    folder.add_trees(roots, root_path);
    folder.finish(DEFAULT_MIN_FREQUENCY)
}
