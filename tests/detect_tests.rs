use flamestitch::builder::{BuildOptions, TreeBuilder};
use flamestitch::detect::catalog::SYNC_FUNCTION_ON_MAIN_THREAD;
use flamestitch::detect::frame_drop::FRAME_DROP_TITLE;
use flamestitch::detect::{detect_occurrences, Category, DetectOptions};
use flamestitch::fragment::{
    Action, Event, EventData, EventFragment, EventTime, Fragment, Measurement, MeasurementValue,
    Method, Sample, SampleData, SampleFragment, ThreadInfo, ThreadMetadata,
};
use flamestitch::frame::{Frame, Platform};
use flamestitch::utils::config::FROZEN_FRAME_MEASUREMENT;
use pretty_assertions::assert_eq;

fn node_fragment() -> Fragment {
    let samples = (0..6)
        .map(|i| Sample {
            stack_id: 0,
            thread_id: "7".to_string(),
            timestamp: 100.0 + i as f64 * 0.01,
        })
        .collect();
    let mut fragment = SampleFragment {
        platform: Platform::Node,
        profile: SampleData {
            frames: vec![
                Frame::new("readFileSync", "node:fs"),
                Frame::new("loadConfig", "app"),
            ],
            stacks: vec![vec![0, 1]],
            samples,
            ..Default::default()
        },
        ..Default::default()
    };
    fragment.profile.thread_metadata.insert(
        "7".to_string(),
        ThreadMetadata {
            name: "main".to_string(),
            priority: None,
        },
    );
    Fragment::Sample(fragment)
}

#[test]
fn test_blocking_call_on_main_thread() {
    let fragment = node_fragment();
    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();

    let occurrences = detect_occurrences(&fragment, &trees, &DetectOptions::default());
    assert_eq!(occurrences.len(), 1);

    let occurrence = &occurrences[0];
    assert_eq!(occurrence.issue_title, SYNC_FUNCTION_ON_MAIN_THREAD);
    assert_eq!(occurrence.category, Category::BlockingCall);
    assert_eq!(occurrence.package, "node:fs");
    assert_eq!(occurrence.function, "readFileSync");
    assert_eq!(occurrence.thread_id, "7");
    assert_eq!(occurrence.duration_ns, 50_000_000);
    let stack: Vec<&str> = occurrence
        .stack_trace
        .iter()
        .map(|f| f.function.as_str())
        .collect();
    assert_eq!(stack, vec!["loadConfig", "readFileSync"]);
}

#[test]
fn test_min_duration_suppresses_short_calls() {
    let fragment = node_fragment();
    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();

    let options = DetectOptions::default().with_min_duration_ns(60_000_000);
    assert!(detect_occurrences(&fragment, &trees, &options).is_empty());
}

#[test]
fn test_other_thread_not_searched() {
    let fragment = node_fragment();
    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();

    let options = DetectOptions::default().with_active_thread(Some("8"));
    assert!(detect_occurrences(&fragment, &trees, &options).is_empty());
}

fn event(action: Action, method_id: u64, ts: u64) -> Event {
    Event {
        action,
        thread_id: 1,
        method_id,
        time: EventTime::wall_ns(ts),
    }
}

#[test]
fn test_frame_drop_blames_last_application_frame() {
    let mut measurements = std::collections::BTreeMap::new();
    measurements.insert(
        FROZEN_FRAME_MEASUREMENT.to_string(),
        Measurement {
            unit: "nanosecond".to_string(),
            values: vec![MeasurementValue {
                timestamp: None,
                elapsed_since_start_ns: 80_000_000,
                value: 50_000_000.0,
            }],
        },
    );

    let fragment = Fragment::Event(EventFragment {
        platform: Platform::Android,
        timestamp: 50.0,
        duration_ns: 100_000_000,
        profile: EventData {
            events: vec![
                event(Action::Enter, 1, 0),
                event(Action::Enter, 2, 10_000_000),
                event(Action::Exit, 2, 90_000_000),
                event(Action::Exit, 1, 100_000_000),
            ],
            methods: vec![
                Method {
                    class_name: "com.example.app.Feed".to_string(),
                    id: 1,
                    name: "onDraw".to_string(),
                    in_app: Some(true),
                    ..Default::default()
                },
                Method {
                    class_name: "android.graphics.Canvas".to_string(),
                    id: 2,
                    name: "drawBitmap".to_string(),
                    in_app: Some(false),
                    ..Default::default()
                },
            ],
            threads: vec![ThreadInfo {
                id: 1,
                name: "main".to_string(),
            }],
            ..Default::default()
        },
        measurements,
        ..Default::default()
    });

    let trees = fragment.call_trees(&BuildOptions::default()).unwrap();
    let occurrences = detect_occurrences(&fragment, &trees, &DetectOptions::default());

    assert_eq!(occurrences.len(), 1);
    let occurrence = &occurrences[0];
    assert_eq!(occurrence.issue_title, FRAME_DROP_TITLE);
    assert_eq!(occurrence.category, Category::FrameDrop);
    assert_eq!(occurrence.function, "com.example.app.Feed.onDraw");
    assert_eq!(occurrence.thread_id, "1");
    assert_eq!(occurrence.stack_trace.len(), 1);
    assert_eq!(
        occurrence.interval.map(|i| (i.start_ns, i.end_ns)),
        Some((30_000_000, 80_000_000))
    );
}
