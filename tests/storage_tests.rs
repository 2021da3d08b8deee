use flamestitch::flamegraph::{aggregate_flamegraph, AggregateOptions, FunctionMetricsOptions};
use flamestitch::fragment::{Fragment, Sample, SampleData, SampleFragment};
use flamestitch::frame::Frame;
use flamestitch::slice::Interval;
use flamestitch::storage::{
    read_fragment, write_fragment, CancelToken, FsStore, ObjectStore, ReadJob, ReadPool,
};
use flamestitch::utils::error::{JobError, StorageError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn fragment(id: &str, start: f64) -> Fragment {
    let samples = (0..6)
        .map(|i| Sample {
            stack_id: 0,
            thread_id: "1".to_string(),
            timestamp: start + i as f64 * 0.01,
        })
        .collect();
    Fragment::Sample(SampleFragment {
        id: id.to_string(),
        profiler_id: "profiler".to_string(),
        organization_id: 1,
        project_id: 2,
        profile: SampleData {
            frames: vec![Frame::new("work", "app"), Frame::new("main", "app")],
            stacks: vec![vec![0, 1]],
            samples,
            ..Default::default()
        },
        ..Default::default()
    })
}

fn fs_store(dir: &tempfile::TempDir, fragments: &[Fragment]) -> Arc<FsStore> {
    let store = Arc::new(FsStore::new(dir.path()));
    for fragment in fragments {
        write_fragment(store.as_ref(), fragment).unwrap();
    }
    store
}

#[test]
fn test_fs_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let original = fragment("c1", 10.0);
    let store = fs_store(&dir, std::slice::from_ref(&original));

    assert!(dir.path().join("1/2/profiler/c1").exists());
    assert_eq!(read_fragment(store.as_ref(), "1/2/profiler/c1").unwrap(), original);
}

#[test]
fn test_fs_store_rejects_parent_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    assert!(matches!(
        store.get("../outside"),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn test_read_pool_reports_missing_objects() {
    let dir = tempfile::tempdir().unwrap();
    let store = fs_store(&dir, &[fragment("c1", 10.0)]);
    let pool = ReadPool::new(store, 4);

    let results = pool.read_all(
        vec![ReadJob::new("1/2/profiler/c1"), ReadJob::new("1/2/profiler/gone")],
        Duration::from_secs(5),
        &CancelToken::new(),
    );
    assert!(results[0].result.is_ok());
    match &results[1].result {
        Err(err @ JobError::Storage(StorageError::NotFound(_))) => assert!(err.is_skippable()),
        other => panic!("unexpected result: {:?}", other.as_ref().map(|f| f.id())),
    }
}

#[test]
fn test_aggregate_flamegraph_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = fs_store(&dir, &[fragment("c1", 10.0), fragment("c2", 20.0)]);
    let pool = ReadPool::new(store, 2);

    let jobs = vec![
        ReadJob::new("1/2/profiler/c1"),
        ReadJob::new("1/2/profiler/c2"),
        ReadJob::new("1/2/profiler/missing"),
    ];
    let flamegraph = aggregate_flamegraph(
        &pool,
        jobs,
        &AggregateOptions::default(),
        &CancelToken::new(),
    );

    assert_eq!(flamegraph.collapsed_lines(), vec!["app`main;app`work 10"]);
}

#[test]
fn test_aggregate_respects_job_interval() {
    let dir = tempfile::tempdir().unwrap();
    let store = fs_store(&dir, &[fragment("c1", 10.0)]);
    let pool = ReadPool::new(store, 1);

    // 40ms of the 50ms profile
    let job = ReadJob::new("1/2/profiler/c1")
        .with_thread("1")
        .with_interval(Interval::new(10_000_000_000, 10_040_000_000));
    let flamegraph = aggregate_flamegraph(
        &pool,
        vec![job],
        &AggregateOptions::default(),
        &CancelToken::new(),
    );

    assert_eq!(flamegraph.total_weight(), 4);
}

#[test]
fn test_aggregate_collects_function_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let store = fs_store(&dir, &[fragment("c1", 10.0), fragment("c2", 20.0)]);
    let pool = ReadPool::new(store, 2);

    let options = AggregateOptions::default().with_function_metrics(FunctionMetricsOptions::default());
    let flamegraph = aggregate_flamegraph(
        &pool,
        vec![ReadJob::new("1/2/profiler/c1"), ReadJob::new("1/2/profiler/c2")],
        &options,
        &CancelToken::new(),
    );

    // Roots sit above the default minimum depth
    assert_eq!(flamegraph.metrics.len(), 1);
    let work = &flamegraph.metrics[0];
    assert_eq!(work.name, "work");
    assert_eq!(work.count, 10);
    assert_eq!(work.sum, 100_000_000);
    assert_eq!(work.sum_self_time, 100_000_000);
    assert_eq!(work.p75, 50_000_000);
}

#[test]
fn test_aggregate_without_function_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let store = fs_store(&dir, &[fragment("c1", 10.0)]);
    let pool = ReadPool::new(store, 1);

    let flamegraph = aggregate_flamegraph(
        &pool,
        vec![ReadJob::new("1/2/profiler/c1")],
        &AggregateOptions::default().with_max_samples(1),
        &CancelToken::new(),
    );
    assert!(flamegraph.metrics.is_empty());
    assert_eq!(flamegraph.stacks.len(), 1);
    assert_eq!(flamegraph.frame_infos.len(), 2);
}
