//! Flamegraph command: aggregate stored fragments into one flamegraph.
//!
//! The command:
//! 1. Opens the object store (directory or HTTP)
//! 2. Reads and builds every fragment on the read pool
//! 3. Folds the trees into a flamegraph
//! 4. Writes the sampled output and optionally an SVG

use super::utils::emit_json;
use crate::flamegraph::{
    aggregate_flamegraph, render_svg, AggregateOptions, FlamegraphConfig, FunctionMetricsOptions,
};
use crate::output::{flamegraph_output, write_svg};
use crate::storage::{CancelToken, FsStore, HttpStore, ObjectStore, ReadJob, ReadPool};
use crate::utils::config::{
    DEFAULT_MAX_FLAMEGRAPH_SAMPLES, DEFAULT_MIN_FREQUENCY, DEFAULT_READ_TIMEOUT, DEFAULT_READ_WORKERS,
};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Arguments for the flamegraph command
#[derive(Debug, Clone)]
pub struct FlamegraphArgs {
    /// Storage keys of the fragments to aggregate
    pub objects: Vec<String>,

    pub storage_dir: Option<PathBuf>,
    pub storage_url: Option<String>,

    pub min_frequency: u64,

    /// Most stacks kept in the flamegraph
    pub max_samples: usize,

    pub workers: usize,
    pub timeout: Duration,

    /// Aggregate application function metrics alongside the flamegraph
    pub function_metrics: Option<FunctionMetricsOptions>,

    /// SVG output path
    pub svg: Option<PathBuf>,

    /// Flamegraph configuration for the SVG
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// JSON output path; stdout when unset
    pub output: Option<PathBuf>,
}

impl Default for FlamegraphArgs {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            storage_dir: None,
            storage_url: None,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_samples: DEFAULT_MAX_FLAMEGRAPH_SAMPLES,
            workers: DEFAULT_READ_WORKERS,
            timeout: DEFAULT_READ_TIMEOUT,
            function_metrics: None,
            svg: None,
            flamegraph_config: None,
            output: None,
        }
    }
}

/// Execute the flamegraph command
pub fn execute_flamegraph(args: FlamegraphArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Step 1/4: Opening object store...");
    let store = open_store(&args)?;
    let pool = ReadPool::new(store, args.workers);

    info!("Step 2/4: Reading {} fragments...", args.objects.len());
    let jobs = args.objects.iter().map(ReadJob::new).collect();
    let mut options = AggregateOptions::default()
        .with_min_frequency(args.min_frequency)
        .with_max_samples(args.max_samples)
        .with_timeout(args.timeout);
    if let Some(metrics) = args.function_metrics {
        options = options.with_function_metrics(metrics);
    }

    info!("Step 3/4: Folding call trees...");
    let flamegraph = aggregate_flamegraph(&pool, jobs, &options, &CancelToken::new());
    if flamegraph.is_empty() {
        warn!("No stacks reached the minimum frequency of {}", args.min_frequency);
    }

    info!("Step 4/4: Writing output files...");
    if let Some(svg_path) = &args.svg {
        let svg = render_svg(&flamegraph, args.flamegraph_config.as_ref())
            .context("Failed to render flamegraph")?;
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }
    emit_json(&flamegraph_output(&flamegraph), args.output.as_ref())?;

    info!(
        "Flamegraph completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

fn open_store(args: &FlamegraphArgs) -> Result<Arc<dyn ObjectStore>> {
    match (&args.storage_dir, &args.storage_url) {
        (Some(dir), _) => Ok(Arc::new(FsStore::new(dir))),
        (None, Some(url)) => {
            let store = HttpStore::new(url).context("Failed to create HTTP object store")?;
            Ok(Arc::new(store))
        }
        (None, None) => anyhow::bail!("No object store configured"),
    }
}

/// Validate flamegraph arguments
pub fn validate_flamegraph_args(args: &FlamegraphArgs) -> Result<()> {
    if args.objects.is_empty() {
        anyhow::bail!("At least one object key is required");
    }

    match (&args.storage_dir, &args.storage_url) {
        (Some(_), Some(_)) => anyhow::bail!("Use either a storage directory or a storage URL, not both"),
        (None, None) => anyhow::bail!("A storage directory or storage URL is required"),
        (None, Some(url)) if !url.starts_with("http://") && !url.starts_with("https://") => {
            anyhow::bail!("Storage URL must start with http:// or https://")
        }
        _ => {}
    }

    if args.workers == 0 {
        anyhow::bail!("workers must be greater than 0");
    }
    if args.max_samples == 0 {
        anyhow::bail!("max-samples must be greater than 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> FlamegraphArgs {
        FlamegraphArgs {
            objects: vec!["1/2/p/c".to_string()],
            storage_dir: Some(PathBuf::from("/tmp")),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        assert!(validate_flamegraph_args(&args()).is_ok());
    }

    #[test]
    fn test_validate_args_both_stores() {
        let args = FlamegraphArgs {
            storage_url: Some("http://localhost:9000".to_string()),
            ..args()
        };
        assert!(validate_flamegraph_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_bad_url_scheme() {
        let args = FlamegraphArgs {
            storage_dir: None,
            storage_url: Some("ftp://localhost".to_string()),
            ..args()
        };
        assert!(validate_flamegraph_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_samples() {
        let args = FlamegraphArgs {
            max_samples: 0,
            ..args()
        };
        assert!(validate_flamegraph_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_no_objects() {
        let args = FlamegraphArgs {
            objects: Vec::new(),
            ..args()
        };
        assert!(validate_flamegraph_args(&args).is_err());
    }
}
