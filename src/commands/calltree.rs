//! Calltree command: build, optionally slice, and print call trees.

use super::utils::{emit_json, load_fragment};
use crate::builder::{BuildOptions, TreeBuilder};
use crate::frame::all_application;
use crate::slice::{slice_thread_trees, Interval};
use crate::utils::config::MAX_STACK_DEPTH;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the calltree command
#[derive(Debug, Clone)]
pub struct CalltreeArgs {
    pub input: PathBuf,

    /// Only build this thread
    pub thread: Option<String>,

    pub max_depth: usize,

    /// Keep only time inside these intervals, in the trees' time base
    pub slices: Vec<Interval>,

    /// Output path; stdout when unset
    pub output: Option<PathBuf>,
}

impl Default for CalltreeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            thread: None,
            max_depth: MAX_STACK_DEPTH,
            slices: Vec::new(),
            output: None,
        }
    }
}

/// Execute the calltree command
pub fn execute_calltree(args: CalltreeArgs) -> Result<()> {
    let fragment = load_fragment(&args.input)?;

    let options = BuildOptions::default()
        .with_active_thread(args.thread.as_deref())
        .with_max_depth(args.max_depth)
        .with_predicate(&all_application);
    let mut trees = fragment
        .call_trees(&options)
        .context("Failed to build call trees")?;

    if !args.slices.is_empty() {
        trees = slice_thread_trees(trees, &args.slices);
    }

    let nodes: usize = trees.values().flatten().map(|n| n.count()).sum();
    info!("Built {} nodes across {} threads", nodes, trees.len());

    emit_json(&trees, args.output.as_ref())
}

/// Validate calltree arguments
pub fn validate_calltree_args(args: &CalltreeArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }
    if args.max_depth == 0 {
        anyhow::bail!("max_depth must be greater than 0");
    }
    Ok(())
}
