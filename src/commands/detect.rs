//! Detect command: search a fragment's call trees for known issues.

use super::utils::{emit_json, load_fragment};
use crate::builder::{BuildOptions, TreeBuilder};
use crate::detect::{detect_occurrences, DetectOptions};
use crate::frame::all_application;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the detect command
#[derive(Debug, Clone, Default)]
pub struct DetectArgs {
    pub input: PathBuf,

    /// Active thread; the fragment's main thread when unset
    pub thread: Option<String>,

    /// Ignore matches shorter than this
    pub min_duration_ms: u64,

    /// Output path; stdout when unset
    pub output: Option<PathBuf>,
}

/// Execute the detect command
pub fn execute_detect(args: DetectArgs) -> Result<()> {
    let fragment = load_fragment(&args.input)?;

    let build_options = BuildOptions::default().with_predicate(&all_application);
    let trees = fragment
        .call_trees(&build_options)
        .context("Failed to build call trees")?;

    let options = DetectOptions::default()
        .with_active_thread(args.thread.as_deref())
        .with_min_duration_ns(args.min_duration_ms.saturating_mul(1_000_000));
    let occurrences = detect_occurrences(&fragment, &trees, &options);

    for occurrence in &occurrences {
        info!(
            "{}: {} ({} ns on thread {})",
            occurrence.issue_title, occurrence.function, occurrence.duration_ns, occurrence.thread_id
        );
    }
    emit_json(&occurrences, args.output.as_ref())
}
