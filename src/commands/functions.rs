//! Functions command: rank a fragment's functions by self time.

use super::utils::{emit_json, load_fragment};
use crate::builder::{BuildOptions, TreeBuilder};
use crate::frame::all_application;
use crate::metrics::{cap_and_filter_functions, extract_functions};
use crate::utils::config::{DEFAULT_FUNCTION_MIN_DEPTH, DEFAULT_MAX_UNIQUE_FUNCTIONS};
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the functions command
#[derive(Debug, Clone)]
pub struct FunctionsArgs {
    pub input: PathBuf,

    /// Only this thread; every thread when unset
    pub thread: Option<String>,

    /// Shallowest depth counted, roots are 0
    pub min_depth: usize,

    pub max_functions: usize,

    /// Keep system functions too
    pub include_system: bool,

    /// Output path; stdout when unset
    pub output: Option<PathBuf>,
}

impl Default for FunctionsArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            thread: None,
            min_depth: DEFAULT_FUNCTION_MIN_DEPTH,
            max_functions: DEFAULT_MAX_UNIQUE_FUNCTIONS,
            include_system: false,
            output: None,
        }
    }
}

/// Execute the functions command
pub fn execute_functions(args: FunctionsArgs) -> Result<()> {
    let fragment = load_fragment(&args.input)?;

    let build_options = BuildOptions::default()
        .with_active_thread(args.thread.as_deref())
        .with_predicate(&all_application);
    let trees = fragment
        .call_trees(&build_options)
        .context("Failed to build call trees")?;

    let functions = cap_and_filter_functions(
        extract_functions(&trees, fragment.platform(), args.min_depth),
        args.max_functions,
        !args.include_system,
    );

    info!("Ranked {} functions from {} threads", functions.len(), trees.len());
    if let Some(top) = functions.first() {
        info!("Heaviest: {} ({} ns self time)", top.function, top.sum_self_time_ns);
    }
    emit_json(&functions, args.output.as_ref())
}

/// Validate functions arguments
pub fn validate_functions_args(args: &FunctionsArgs) -> Result<()> {
    if args.max_functions == 0 {
        anyhow::bail!("max-functions must be greater than 0");
    }
    Ok(())
}
