//! Function metrics aggregated across many profiles.

use super::function::CallTreeFunction;
use super::quantile;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated metrics for one function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetrics {
    pub fingerprint: u64,
    pub name: String,
    pub package: String,
    pub in_app: bool,
    pub p75: u64,
    pub p95: u64,
    pub p99: u64,
    pub avg: f64,
    pub sum: u64,
    pub sum_self_time: u64,
    pub count: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    function: CallTreeFunction,
    durations_ns: Vec<u64>,
    // Insertion sequence, the final tie-break for eviction
    seq: usize,
}

/// Bounded accumulator of per-profile function metrics
///
/// Functions are keyed by fingerprint. Once more than `max_functions` are
/// held, the one with the least self time (then least duration, then oldest)
/// is evicted.
#[derive(Debug)]
pub struct FunctionAggregator {
    entries: Vec<Entry>,
    index: HashMap<u64, usize>,
    max_functions: usize,
    next_seq: usize,
}

impl FunctionAggregator {
    pub fn new(max_functions: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            max_functions,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge one profile's functions into the aggregate
    pub fn add_functions(&mut self, functions: &[CallTreeFunction]) {
        for function in functions {
            self.add_function(function);
        }
    }

    fn add_function(&mut self, function: &CallTreeFunction) {
        if let Some(&idx) = self.index.get(&function.fingerprint) {
            let entry = &mut self.entries[idx];
            entry.durations_ns.extend_from_slice(&function.self_times_ns);
            entry.function.sum_self_time_ns += function.sum_self_time_ns;
            entry.function.sum_duration_ns += function.sum_duration_ns;
            entry.function.sample_count += function.sample_count;
        } else {
            self.index.insert(function.fingerprint, self.entries.len());
            self.entries.push(Entry {
                function: function.clone(),
                durations_ns: function.self_times_ns.clone(),
                seq: self.next_seq,
            });
            self.next_seq += 1;
        }

        while self.entries.len() > self.max_functions {
            self.evict_lightest();
        }
    }

    fn evict_lightest(&mut self) {
        let lightest = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.function.sum_self_time_ns, e.function.sum_duration_ns, e.seq))
            .map(|(idx, _)| idx);
        let Some(idx) = lightest else {
            return;
        };
        let evicted = self.entries.swap_remove(idx);
        self.index.remove(&evicted.function.fingerprint);
        if let Some(moved) = self.entries.get(idx) {
            self.index.insert(moved.function.fingerprint, idx);
        }
        debug!("Evicted function {} from metrics", evicted.function.function);
    }

    /// Percentiles and totals per function, largest total duration first
    ///
    /// Functions without self time are left out.
    pub fn to_metrics(&self) -> Vec<FunctionMetrics> {
        let mut entries: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| e.function.sum_self_time_ns > 0)
            .collect();
        entries.sort_by_key(|e| e.seq);

        let mut metrics: Vec<FunctionMetrics> = entries
            .into_iter()
            .map(|entry| {
                let mut durations = entry.durations_ns.clone();
                durations.sort_unstable();
                let f = &entry.function;
                let avg = if durations.is_empty() {
                    0.0
                } else {
                    f.sum_self_time_ns as f64 / durations.len() as f64
                };
                FunctionMetrics {
                    fingerprint: f.fingerprint,
                    name: f.function.clone(),
                    package: f.package.clone(),
                    in_app: f.in_app,
                    p75: quantile(&durations, 0.75).unwrap_or(0),
                    p95: quantile(&durations, 0.95).unwrap_or(0),
                    p99: quantile(&durations, 0.99).unwrap_or(0),
                    avg,
                    sum: f.sum_duration_ns,
                    sum_self_time: f.sum_self_time_ns,
                    count: f.sample_count,
                }
            })
            .collect();

        metrics.sort_by(|a, b| b.sum.cmp(&a.sum).then(b.sum_self_time.cmp(&a.sum_self_time)));
        metrics
    }
}
