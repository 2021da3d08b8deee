//! Stitch command: merge fragment files into one over a time window.

use super::utils::{emit_json, load_fragment};
use crate::frame::all_application;
use crate::output::fragment_output;
use crate::slice::Interval;
use crate::stitch::stitch;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the stitch command
#[derive(Debug, Clone, Default)]
pub struct StitchArgs {
    pub inputs: Vec<PathBuf>,

    /// Window start, nanoseconds since the epoch
    pub start_ns: u64,

    /// Window end (exclusive), nanoseconds since the epoch
    pub end_ns: u64,

    /// Output path; stdout when unset
    pub output: Option<PathBuf>,

    /// Emit the output profile format instead of a fragment
    pub as_output: bool,
}

/// Execute the stitch command
pub fn execute_stitch(args: StitchArgs) -> Result<()> {
    let fragments = args
        .inputs
        .iter()
        .map(|path| load_fragment(path))
        .collect::<Result<Vec<_>>>()?;

    let window = Interval::new(args.start_ns, args.end_ns);
    let stitched = stitch(fragments, window).context("Failed to stitch fragments")?;
    info!(
        "Stitched {} fragments into {} ({} encoding)",
        args.inputs.len(),
        stitched.id(),
        stitched.encoding()
    );

    if args.as_output {
        let output = fragment_output(&stitched, &all_application)
            .context("Failed to convert stitched fragment")?;
        emit_json(&output, args.output.as_ref())
    } else {
        emit_json(&stitched, args.output.as_ref())
    }
}

/// Validate stitch arguments
pub fn validate_stitch_args(args: &StitchArgs) -> Result<()> {
    if args.inputs.is_empty() {
        anyhow::bail!("At least one input fragment is required");
    }
    if let Some(missing) = args.inputs.iter().find(|p| !p.is_file()) {
        anyhow::bail!("Input file does not exist: {}", missing.display());
    }
    if args.end_ns <= args.start_ns {
        anyhow::bail!("Window end must be after window start");
    }
    Ok(())
}
