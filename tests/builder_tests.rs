use flamestitch::builder::{BuildOptions, TreeBuilder};
use flamestitch::fragment::{
    Action, Event, EventData, EventFragment, EventTime, Fragment, Method, Sample, SampleData,
    SampleFragment,
};
use flamestitch::frame::{Frame, Platform};
use flamestitch::utils::error::BuildError;
use pretty_assertions::assert_eq;

fn android_event(action: Action, method_id: u64, ts: u64) -> Event {
    Event {
        action,
        thread_id: 1,
        method_id,
        time: EventTime::wall_ns(ts),
    }
}

fn android_method(id: u64, name: &str) -> Method {
    Method {
        class_name: "com.example.app.Worker".to_string(),
        id,
        name: name.to_string(),
        ..Default::default()
    }
}

#[test]
fn test_android_trace_with_missing_exit() {
    let fragment = Fragment::Event(EventFragment {
        platform: Platform::Android,
        profile: EventData {
            events: vec![
                android_event(Action::Enter, 1, 1000),
                android_event(Action::Enter, 2, 1000),
                android_event(Action::Exit, 1, 2000),
                android_event(Action::Enter, 1, 3000),
            ],
            methods: vec![android_method(1, "run"), android_method(2, "step")],
            ..Default::default()
        },
        ..Default::default()
    });

    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
    let roots = &trees["1"];
    assert_eq!(roots.len(), 2);

    let a = &roots[0];
    assert_eq!((a.start_ns, a.end_ns, a.duration_ns), (1000, 2000, 1000));
    assert_eq!(a.children.len(), 1);
    let child = &a.children[0];
    assert_eq!((child.start_ns, child.end_ns, child.duration_ns), (1000, 2000, 1000));

    let b = &roots[1];
    assert_eq!((b.start_ns, b.end_ns, b.duration_ns), (3000, 3000, 0));
    assert!(b.children.is_empty());
}

fn sample(stack_id: usize, timestamp: f64) -> Sample {
    Sample {
        stack_id,
        thread_id: "1".to_string(),
        timestamp,
    }
}

fn two_frame_fragment(samples: Vec<Sample>) -> Fragment {
    Fragment::Sample(SampleFragment {
        profile: SampleData {
            frames: vec![Frame::new("a", "app"), Frame::new("b", "app")],
            stacks: vec![vec![1, 0], vec![0, 1]],
            samples,
            ..Default::default()
        },
        ..Default::default()
    })
}

#[test]
fn test_contiguous_samples_merge_into_one_node_per_depth() {
    // stack {1,0} is leaf first: `a` is the root frame
    let fragment = two_frame_fragment(vec![sample(0, 0.01), sample(0, 0.04), sample(0, 0.05)]);

    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
    let roots = &trees["1"];
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name, "a");
    assert_eq!(roots[0].start_ns, 10_000_000);
    assert_eq!(roots[0].end_ns, 50_000_000);
    assert_eq!(roots[0].sample_count, 2);
    assert_eq!(roots[0].children.len(), 1);
    assert_eq!(roots[0].children[0].name, "b");
    assert_eq!(roots[0].children[0].end_ns, 50_000_000);
    assert!(roots[0].children[0].children.is_empty());
}

#[test]
fn test_contiguity_merge_end_at_second_sample() {
    let fragment = two_frame_fragment(vec![sample(0, 0.01), sample(0, 0.04)]);

    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
    let roots = &trees["1"];
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].end_ns, 40_000_000);
    assert_eq!(roots[0].children.len(), 1);
}

#[test]
fn test_build_is_deterministic() {
    let fragment = two_frame_fragment(vec![
        sample(0, 0.01),
        sample(1, 0.02),
        sample(0, 0.03),
        sample(1, 0.04),
    ]);

    let first = fragment.call_trees(&BuildOptions::default()).unwrap();
    let second = fragment.call_trees(&BuildOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_invalid_stack_id_fails_whole_build() {
    let fragment = two_frame_fragment(vec![sample(0, 0.01), sample(7, 0.02), sample(0, 0.03)]);
    let err = fragment.call_trees(&BuildOptions::default()).unwrap_err();
    assert_eq!(err, BuildError::InvalidStackId(7));
}

#[test]
fn test_thread_filter() {
    let mut samples = vec![sample(0, 0.01), sample(0, 0.02)];
    samples.push(Sample {
        stack_id: 0,
        thread_id: "2".to_string(),
        timestamp: 0.01,
    });
    samples.push(Sample {
        stack_id: 0,
        thread_id: "2".to_string(),
        timestamp: 0.02,
    });
    let fragment = two_frame_fragment(samples);

    let options = BuildOptions::default().with_active_thread(Some("2"));
    let trees = fragment.call_trees(&options).unwrap();
    assert_eq!(trees.keys().cloned().collect::<Vec<String>>(), vec!["2".to_string()]);
}
