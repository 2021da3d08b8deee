//! Bounded fan-out of storage reads.
//!
//! Jobs run on a fixed-size worker pool sized to what the object store
//! tolerates. Each job reads one fragment and optionally processes it on the
//! worker (building call trees, for example). Results fan back in over a
//! channel, success and failure alike, each tagged with the job it belongs to.

use super::{read_fragment, ObjectStore};
use crate::fragment::Fragment;
use crate::slice::Interval;
use crate::utils::error::{JobError, StorageError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use workerpool::thunk::{Thunk, ThunkWorker};
use workerpool::Pool;

/// One fragment to read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadJob {
    /// Storage key of the fragment
    pub path: String,
    /// Restrict processing to this thread
    pub thread_id: Option<String>,
    /// Restrict processing to this time range
    pub interval: Option<Interval>,
}

impl ReadJob {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }
}

/// Outcome of one job
#[derive(Debug)]
pub struct ReadJobResult<T> {
    pub job: ReadJob,
    pub result: Result<T, JobError>,
}

/// Cooperative cancellation shared between a caller and its jobs
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ReadPool {
    pool: Pool<ThunkWorker<()>>,
    store: Arc<dyn ObjectStore>,
}

impl ReadPool {
    /// Create a pool running at most `workers` reads at once
    pub fn new(store: Arc<dyn ObjectStore>, workers: usize) -> Self {
        Self {
            pool: Pool::<ThunkWorker<()>>::new(workers.max(1)),
            store,
        }
    }

    /// Read every job's fragment
    pub fn read_all(
        &self,
        jobs: Vec<ReadJob>,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Vec<ReadJobResult<Fragment>> {
        self.run(jobs, timeout, cancel, |fragment, _| Ok(fragment))
    }

    /// Read every job's fragment and process it on the worker
    ///
    /// Returns one result per job, in job order. Jobs that had not reported
    /// by the deadline yield `DeadlineExceeded`; jobs that observed `cancel`
    /// yield `Cancelled`. Work still queued when the deadline passes is
    /// abandoned without touching storage.
    pub fn run<T, F>(
        &self,
        jobs: Vec<ReadJob>,
        timeout: Duration,
        cancel: &CancelToken,
        process: F,
    ) -> Vec<ReadJobResult<T>>
    where
        T: Send + 'static,
        F: Fn(Fragment, &ReadJob) -> Result<T, JobError> + Send + Sync + 'static,
    {
        let deadline = Instant::now() + timeout;
        let expired = CancelToken::new();
        let process = Arc::new(process);
        let (tx, rx) = mpsc::channel::<(usize, Result<T, JobError>)>();

        debug!("Dispatching {} read jobs", jobs.len());
        for (idx, job) in jobs.iter().enumerate() {
            let tx = tx.clone();
            let store = Arc::clone(&self.store);
            let cancel = cancel.clone();
            let expired = expired.clone();
            let process = Arc::clone(&process);
            let job = job.clone();
            self.pool.execute(Thunk::of(move || {
                let result = if cancel.is_cancelled() {
                    Err(StorageError::Cancelled.into())
                } else if expired.is_cancelled() || Instant::now() >= deadline {
                    Err(StorageError::DeadlineExceeded.into())
                } else {
                    read_fragment(store.as_ref(), &job.path)
                        .map_err(JobError::from)
                        .and_then(|fragment| (*process)(fragment, &job))
                };
                // The receiver is gone once the caller stopped waiting.
                let _ = tx.send((idx, result));
            }));
        }
        drop(tx);

        let mut results: Vec<Option<Result<T, JobError>>> = jobs.iter().map(|_| None).collect();
        let mut pending = jobs.len();
        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((idx, result)) => {
                    if let Some(slot) = results.get_mut(idx) {
                        if slot.is_none() {
                            pending -= 1;
                        }
                        *slot = Some(result);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Read deadline exceeded with {} jobs outstanding", pending);
                    expired.cancel();
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let timed_out = expired.is_cancelled();
        jobs.into_iter()
            .zip(results)
            .map(|(job, result)| ReadJobResult {
                job,
                result: result.unwrap_or_else(|| {
                    Err(if timed_out {
                        StorageError::DeadlineExceeded.into()
                    } else if cancel.is_cancelled() {
                        StorageError::Cancelled.into()
                    } else {
                        StorageError::Disconnected.into()
                    })
                }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{SampleData, SampleFragment};
    use crate::storage::{write_fragment, MemoryStore};

    fn store_with(ids: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for id in ids {
            let fragment = Fragment::Sample(SampleFragment {
                id: id.to_string(),
                profiler_id: "p".into(),
                organization_id: 1,
                project_id: 1,
                profile: SampleData::default(),
                ..Default::default()
            });
            write_fragment(store.as_ref(), &fragment).unwrap();
        }
        store
    }

    #[test]
    fn test_results_in_job_order() {
        let pool = ReadPool::new(store_with(&["a", "b", "c"]), 2);
        let jobs = vec![ReadJob::new("1/1/p/c"), ReadJob::new("1/1/p/missing"), ReadJob::new("1/1/p/a")];
        let results = pool.read_all(jobs, Duration::from_secs(5), &CancelToken::new());

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].result.as_ref().unwrap().id(), "c");
        assert!(matches!(
            results[1].result,
            Err(JobError::Storage(StorageError::NotFound(_)))
        ));
        assert_eq!(results[2].job.path, "1/1/p/a");
    }

    #[test]
    fn test_cancelled_jobs_report_cancellation() {
        let pool = ReadPool::new(store_with(&["a"]), 1);
        let cancel = CancelToken::new();
        cancel.cancel();
        let results = pool.read_all(vec![ReadJob::new("1/1/p/a")], Duration::from_secs(5), &cancel);
        assert!(matches!(
            results[0].result,
            Err(JobError::Storage(StorageError::Cancelled))
        ));
    }

    #[test]
    fn test_deadline_reported_per_job() {
        let pool = ReadPool::new(store_with(&["a"]), 1);
        let results = pool.run(
            vec![ReadJob::new("1/1/p/a")],
            Duration::from_millis(20),
            &CancelToken::new(),
            |fragment, _| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(fragment)
            },
        );
        assert!(matches!(
            results[0].result,
            Err(JobError::Storage(StorageError::DeadlineExceeded))
        ));
    }
}
