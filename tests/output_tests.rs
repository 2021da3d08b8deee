use flamestitch::fragment::{
    Action, Event, EventData, EventFragment, EventTime, Fragment, Method, Sample, SampleData,
    SampleFragment, ThreadInfo, ThreadMetadata,
};
use flamestitch::frame::{all_application, Frame, Platform};
use flamestitch::output::{
    fragment_output, read_fragment_file, read_output, write_json, write_output, FrameEventKind,
    ThreadProfile,
};
use flamestitch::utils::config::SCHEMA_VERSION;
use flamestitch::utils::error::OutputError;
use pretty_assertions::assert_eq;

fn event(thread_id: u64, action: Action, method_id: u64, ts: u64) -> Event {
    Event {
        action,
        thread_id,
        method_id,
        time: EventTime::wall_ns(ts),
    }
}

fn two_thread_fragment() -> Fragment {
    Fragment::Event(EventFragment {
        platform: Platform::Android,
        duration_ns: 500,
        profile: EventData {
            events: vec![
                event(2, Action::Enter, 1, 0),
                event(1, Action::Enter, 2, 10),
                event(2, Action::Exit, 1, 100),
                event(1, Action::Unwind, 2, 200),
            ],
            methods: vec![
                Method {
                    class_name: "com.example.Sync".to_string(),
                    id: 1,
                    name: "pull".to_string(),
                    ..Default::default()
                },
                Method {
                    class_name: "com.example.Ui".to_string(),
                    id: 2,
                    name: "draw".to_string(),
                    in_app: Some(false),
                    ..Default::default()
                },
            ],
            threads: vec![
                ThreadInfo {
                    id: 1,
                    name: "main".to_string(),
                },
                ThreadInfo {
                    id: 2,
                    name: "sync".to_string(),
                },
            ],
            ..Default::default()
        },
        ..Default::default()
    })
}

#[test]
fn test_event_fragment_output() {
    let output = fragment_output(&two_thread_fragment(), &all_application).unwrap();

    assert_eq!(output.version, SCHEMA_VERSION);
    assert_eq!(output.platform, Platform::Android);
    assert_eq!(output.duration_ns, 500);
    assert_eq!(output.profiles.len(), 2);
    assert_eq!(output.active_profile_index, 0);

    let names: Vec<(&str, bool)> = output
        .shared
        .frames
        .iter()
        .map(|f| (f.name.as_str(), f.is_application))
        .collect();
    // thread 1 converts first
    assert_eq!(
        names,
        vec![("com.example.Ui.draw", false), ("com.example.Sync.pull", true)]
    );

    let ThreadProfile::Evented(main) = &output.profiles[0] else {
        panic!("expected an evented profile");
    };
    assert_eq!(main.name, "main");
    let events: Vec<(FrameEventKind, u64)> = main.events.iter().map(|e| (e.kind, e.at)).collect();
    assert_eq!(
        events,
        vec![(FrameEventKind::Open, 10), (FrameEventKind::Close, 200)]
    );
}

#[test]
fn test_output_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/profile.json");

    let output = fragment_output(&two_thread_fragment(), &all_application).unwrap();
    write_output(&output, &path).unwrap();
    let loaded = read_output(&path).unwrap();

    assert_eq!(loaded, output);
}

#[test]
fn test_fragment_file_is_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fragment.json");

    let mut thread_metadata = std::collections::BTreeMap::new();
    thread_metadata.insert(
        "1".to_string(),
        ThreadMetadata {
            name: "MainThread".to_string(),
            priority: None,
        },
    );
    let fragment = Fragment::Sample(SampleFragment {
        platform: Platform::Python,
        profile: SampleData {
            frames: vec![
                Frame::new("handler", "app"),
                Frame::new("<module>", "").with_file("<string>", 1),
            ],
            stacks: vec![vec![0, 1]],
            samples: vec![Sample {
                stack_id: 0,
                thread_id: "1".to_string(),
                timestamp: 1.0,
            }],
            thread_metadata,
        },
        ..Default::default()
    });
    write_json(&fragment, &path).unwrap();

    let Fragment::Sample(loaded) = read_fragment_file(&path).unwrap() else {
        panic!("expected a sample fragment");
    };
    assert_eq!(loaded.profile.stacks, vec![vec![0]]);
}

#[test]
fn test_mismatched_exit_is_integrity_error() {
    let fragment = Fragment::Event(EventFragment {
        profile: EventData {
            events: vec![
                event(1, Action::Enter, 1, 0),
                event(1, Action::Enter, 2, 5),
                event(1, Action::Exit, 1, 10),
            ],
            methods: Vec::new(),
            ..Default::default()
        },
        ..Default::default()
    });
    assert!(matches!(
        fragment_output(&fragment, &all_application),
        Err(OutputError::DataIntegrity(_))
    ));
}
