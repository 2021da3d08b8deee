//! Aggregating many stored profiles into one flamegraph.
//!
//! Reads and tree building fan out over the read pool; folding happens on
//! the calling thread as results arrive.

use super::fold::{Flamegraph, Folder};
use crate::builder::{BuildOptions, TreeBuilder};
use crate::fragment::Fragment;
use crate::frame::{all_application, ApplicationPredicate, Platform};
use crate::metrics::{cap_and_filter_functions, extract_thread_functions, FunctionAggregator};
use crate::nodetree::ThreadTrees;
use crate::slice::{slice_thread_trees, Interval};
use crate::storage::{CancelToken, ReadJob, ReadPool};
use crate::utils::config::{
    DEFAULT_FUNCTION_MIN_DEPTH, DEFAULT_MAX_FLAMEGRAPH_SAMPLES, DEFAULT_MAX_UNIQUE_FUNCTIONS,
    DEFAULT_MIN_FREQUENCY, DEFAULT_READ_TIMEOUT, MAX_STACK_DEPTH,
};
use crate::utils::error::JobError;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Options for [`aggregate_flamegraph`]
#[derive(Clone)]
pub struct AggregateOptions {
    pub min_frequency: u64,
    pub max_samples: usize,
    pub timeout: Duration,
    pub max_depth: usize,
    pub is_application: Arc<ApplicationPredicate>,

    /// Gather application function metrics while folding
    pub function_metrics: Option<FunctionMetricsOptions>,
}

/// Limits for function metrics gathered during aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMetricsOptions {
    pub min_depth: usize,
    pub max_unique_functions: usize,
}

impl Default for FunctionMetricsOptions {
    fn default() -> Self {
        Self {
            min_depth: DEFAULT_FUNCTION_MIN_DEPTH,
            max_unique_functions: DEFAULT_MAX_UNIQUE_FUNCTIONS,
        }
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_samples: DEFAULT_MAX_FLAMEGRAPH_SAMPLES,
            timeout: DEFAULT_READ_TIMEOUT,
            max_depth: MAX_STACK_DEPTH,
            is_application: Arc::new(all_application),
            function_metrics: None,
        }
    }
}

impl AggregateOptions {
    pub fn with_min_frequency(mut self, min_frequency: u64) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_function_metrics(mut self, metrics: FunctionMetricsOptions) -> Self {
        self.function_metrics = Some(metrics);
        self
    }
}

/// Build a flamegraph from every fragment named by `jobs`
///
/// Each job is built for its thread (the fragment's main thread when
/// unset) and sliced to its interval when one is given. Missing objects and
/// reads that ran out of time are skipped; any other failure is logged and
/// the job ignored. With function metrics enabled, each thread's
/// application functions are extracted, capped and aggregated as well.
pub fn aggregate_flamegraph(
    pool: &ReadPool,
    jobs: Vec<ReadJob>,
    options: &AggregateOptions,
    cancel: &CancelToken,
) -> Flamegraph {
    info!("Aggregating flamegraph from {} fragments", jobs.len());

    let predicate = Arc::clone(&options.is_application);
    let max_depth = options.max_depth;
    let results = pool.run(jobs, options.timeout, cancel, move |fragment, job| {
        build_job_trees(&fragment, job, max_depth, predicate.as_ref())
    });

    let mut folder = Folder::new().with_max_samples(options.max_samples);
    let mut functions = options
        .function_metrics
        .map(|m| (m, FunctionAggregator::new(m.max_unique_functions)));
    let mut folded = 0;
    for result in results {
        match result.result {
            Ok((platform, trees)) => {
                for roots in trees.values() {
                    folder.add_trees(roots, &[]);
                    if let Some((metrics, aggregator)) = functions.as_mut() {
                        let extracted = extract_thread_functions(roots, platform, metrics.min_depth);
                        aggregator.add_functions(&cap_and_filter_functions(
                            extracted,
                            metrics.max_unique_functions,
                            true,
                        ));
                    }
                }
                folded += 1;
            }
            Err(err) if err.is_skippable() => {
                debug!("Skipping {}: {}", result.job.path, err);
            }
            Err(err) => {
                warn!("Failed to build call trees for {}: {}", result.job.path, err);
            }
        }
    }

    debug!("Folded call trees from {} fragments", folded);
    let mut flamegraph = folder.finish(options.min_frequency);
    if let Some((_, aggregator)) = functions {
        flamegraph.metrics = aggregator.to_metrics();
    }
    flamegraph
}

fn build_job_trees(
    fragment: &Fragment,
    job: &ReadJob,
    max_depth: usize,
    predicate: &ApplicationPredicate,
) -> Result<(Platform, ThreadTrees), JobError> {
    let thread_id = job.thread_id.clone().or_else(|| fragment.main_thread_id());
    let options = BuildOptions::default()
        .with_active_thread(thread_id.as_deref())
        .with_max_depth(max_depth)
        .with_predicate(predicate);
    let trees = fragment.call_trees(&options)?;

    let trees = match job.interval {
        Some(interval) => slice_thread_trees(trees, &[tree_relative(fragment, interval)]),
        None => trees,
    };
    Ok((fragment.platform(), trees))
}

/// Event trees are timed from the fragment start, sample trees absolutely
fn tree_relative(fragment: &Fragment, interval: Interval) -> Interval {
    match fragment {
        Fragment::Sample(_) => interval,
        Fragment::Event(f) => {
            let origin = f.start_ns();
            Interval::new(
                interval.start_ns.saturating_sub(origin),
                interval.end_ns.saturating_sub(origin),
            )
        }
    }
}
