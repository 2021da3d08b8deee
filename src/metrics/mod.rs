//! Per-function metrics over call trees.
//!
//! Self time is extracted per profile and aggregated across profiles into
//! duration percentiles.

pub mod aggregator;
pub mod function;

pub use aggregator::{FunctionAggregator, FunctionMetrics};
pub use function::{
    cap_and_filter_functions, extract_functions, extract_thread_functions, should_aggregate,
    CallTreeFunction,
};

/// Nearest-rank quantile of an ascending slice
///
/// Returns `None` for an empty slice or a `q` outside `(0, 1]`.
pub fn quantile(sorted: &[u64], q: f64) -> Option<u64> {
    if sorted.is_empty() || q <= 0.0 || q > 1.0 {
        return None;
    }
    let rank = (sorted.len() as f64 * q).ceil() as usize;
    sorted.get(rank.saturating_sub(1)).copied()
}
