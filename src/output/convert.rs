//! Conversion of fragments and flamegraphs into the output format.

use super::profile::{
    EventedProfile, FrameEvent, FrameEventKind, Output, OutputFrame, SampledProfile, SharedData,
    ThreadProfile, UNIT_COUNT, UNIT_NANOSECONDS,
};
use crate::flamegraph::Flamegraph;
use crate::fragment::{Action, EventFragment, Fragment, Measurements, Method, SampleFragment};
use crate::frame::{ApplicationPredicate, Frame, Platform};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use chrono::Utc;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

/// Shared frame table that deduplicates identical frames
#[derive(Default)]
struct FrameTable {
    frames: Vec<OutputFrame>,
    // Frames each entry was built from, parallel to `frames`
    sources: Vec<Frame>,
    index: HashMap<Frame, usize>,
}

impl FrameTable {
    fn insert(&mut self, frame: &Frame, is_application: bool) -> usize {
        if let Some(&idx) = self.index.get(frame) {
            return idx;
        }
        let idx = self.frames.len();
        self.frames.push(OutputFrame::from_frame(frame, is_application));
        self.sources.push(frame.clone());
        self.index.insert(frame.clone(), idx);
        idx
    }
}

/// Convert a fragment of either encoding
pub fn fragment_output(
    fragment: &Fragment,
    is_application: &ApplicationPredicate,
) -> Result<Output, OutputError> {
    match fragment {
        Fragment::Sample(f) => sample_output(f, is_application),
        Fragment::Event(f) => event_output(f, is_application),
    }
}

/// Convert an event fragment into one evented profile per thread
///
/// # Errors
/// * `OutputError::DataIntegrity` - an exit does not match the innermost
///   open frame of its thread
pub fn event_output(
    fragment: &EventFragment,
    is_application: &ApplicationPredicate,
) -> Result<Output, OutputError> {
    let clock = fragment.profile.event_clock();
    let methods = fragment.profile.methods_by_id();
    let thread_names: HashMap<u64, &str> = fragment
        .profile
        .threads
        .iter()
        .map(|t| (t.id, t.name.as_str()))
        .collect();

    let mut by_thread: BTreeMap<u64, Vec<(Action, u64, u64)>> = BTreeMap::new();
    let mut max_ts = 0;
    for event in &fragment.profile.events {
        let ts = clock.timestamp_ns(&event.time);
        max_ts = max_ts.max(ts);
        by_thread
            .entry(event.thread_id)
            .or_default()
            .push((event.action, event.method_id, ts));
    }
    let end_value = fragment.duration_ns.max(max_ts);

    let mut table = FrameTable::default();
    let mut method_frames: HashMap<u64, usize> = HashMap::new();
    let mut profiles = Vec::with_capacity(by_thread.len());

    for (thread_id, events) in by_thread {
        let mut open: Vec<(u64, usize)> = Vec::new();
        let mut frame_events = Vec::with_capacity(events.len());

        for (action, method_id, ts) in events {
            match action {
                Action::Enter => {
                    let frame = *method_frames.entry(method_id).or_insert_with(|| {
                        let frame = match methods.get(&method_id) {
                            Some(method) => method.frame(),
                            None => Method::unknown(method_id).frame(),
                        };
                        table.insert(&frame, frame.is_application(is_application))
                    });
                    open.push((method_id, frame));
                    frame_events.push(FrameEvent { kind: FrameEventKind::Open, frame, at: ts });
                }
                Action::Exit | Action::Unwind => {
                    let Some(&(open_method, frame)) = open.last() else {
                        continue;
                    };
                    if open_method != method_id {
                        return Err(OutputError::DataIntegrity(format!(
                            "exit of method {} on thread {} does not match open method {}",
                            method_id, thread_id, open_method
                        )));
                    }
                    open.pop();
                    frame_events.push(FrameEvent { kind: FrameEventKind::Close, frame, at: ts });
                }
            }
        }

        while let Some((_, frame)) = open.pop() {
            frame_events.push(FrameEvent { kind: FrameEventKind::Close, frame, at: end_value });
        }

        profiles.push(ThreadProfile::Evented(EventedProfile {
            name: thread_names.get(&thread_id).copied().unwrap_or_default().to_string(),
            thread_id: thread_id.to_string(),
            unit: UNIT_NANOSECONDS.to_string(),
            start_value: 0,
            end_value,
            events: frame_events,
        }));
    }

    let active = fragment.main_thread_id().map(|id| id.to_string());
    info!(
        "Converted event fragment {} ({} threads, {} frames)",
        fragment.id,
        profiles.len(),
        table.frames.len()
    );
    Ok(assemble(
        fragment.platform,
        end_value,
        table,
        profiles,
        active.as_deref(),
        fragment.measurements.clone(),
    ))
}

/// Convert a sample fragment into one sampled profile per thread
///
/// Each sample weighs the time until the next sample on its thread; the
/// last sample weighs nothing.
///
/// # Errors
/// * `OutputError::DataIntegrity` - a sample or stack refers past its table
pub fn sample_output(
    fragment: &SampleFragment,
    is_application: &ApplicationPredicate,
) -> Result<Output, OutputError> {
    let data = &fragment.profile;
    let origin = fragment.start_ns();

    let mut by_thread: BTreeMap<&str, Vec<(u64, usize)>> = BTreeMap::new();
    for sample in &data.samples {
        by_thread
            .entry(sample.thread_id.as_str())
            .or_default()
            .push((sample.timestamp_ns(), sample.stack_id));
    }

    let mut table = FrameTable::default();
    let mut stack_frames: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut profiles = Vec::with_capacity(by_thread.len());

    for (thread_id, mut samples) in by_thread {
        samples.sort_by_key(|&(ts, _)| ts);

        let mut stacks = Vec::with_capacity(samples.len());
        let mut weights = Vec::with_capacity(samples.len());
        for (i, &(ts, stack_id)) in samples.iter().enumerate() {
            if !stack_frames.contains_key(&stack_id) {
                let stack = data.stacks.get(stack_id).ok_or_else(|| {
                    OutputError::DataIntegrity(format!("sample refers to missing stack {}", stack_id))
                })?;
                let mut indices = Vec::with_capacity(stack.len());
                for &frame_id in stack.iter().rev() {
                    let frame = data.frames.get(frame_id).ok_or_else(|| {
                        OutputError::DataIntegrity(format!(
                            "stack {} refers to missing frame {}",
                            stack_id, frame_id
                        ))
                    })?;
                    indices.push(table.insert(frame, frame.is_application(is_application)));
                }
                stack_frames.insert(stack_id, indices);
            }
            stacks.push(stack_frames[&stack_id].clone());
            let next = samples.get(i + 1).map_or(ts, |&(next_ts, _)| next_ts);
            weights.push(next - ts);
        }

        let start_value = samples.first().map_or(0, |&(ts, _)| ts - origin);
        let end_value = samples.last().map_or(0, |&(ts, _)| ts - origin);
        let name = data
            .thread_metadata
            .get(thread_id)
            .map(|meta| meta.name.clone())
            .unwrap_or_default();

        profiles.push(ThreadProfile::Sampled(SampledProfile {
            name,
            thread_id: thread_id.to_string(),
            unit: UNIT_NANOSECONDS.to_string(),
            start_value,
            end_value,
            samples: stacks,
            weights,
        }));
    }

    let duration = fragment.end_ns() - origin;
    debug!(
        "Converted sample fragment {} ({} threads)",
        fragment.id,
        profiles.len()
    );
    Ok(assemble(
        fragment.platform,
        duration,
        table,
        profiles,
        fragment.main_thread_id(),
        fragment.measurements.clone(),
    ))
}

/// Convert a flamegraph into a single sampled profile weighted by count
pub fn flamegraph_output(flamegraph: &Flamegraph) -> Output {
    let mut table = FrameTable::default();
    let mut samples = Vec::with_capacity(flamegraph.stacks.len());
    let mut weights = Vec::with_capacity(flamegraph.stacks.len());

    for stack in &flamegraph.stacks {
        let indices = stack
            .frames
            .iter()
            .zip(&stack.is_application)
            .map(|(frame, &is_application)| table.insert(frame, is_application))
            .collect();
        samples.push(indices);
        weights.push(stack.weight);
    }

    let frame_infos = table
        .sources
        .iter()
        .map(|frame| flamegraph.frame_info(frame.fingerprint()).cloned().unwrap_or_default())
        .collect();

    let total = flamegraph.total_weight();
    let profile = ThreadProfile::Sampled(SampledProfile {
        name: "flamegraph".to_string(),
        thread_id: String::new(),
        unit: UNIT_COUNT.to_string(),
        start_value: 0,
        end_value: total,
        samples,
        weights,
    });
    let mut output = assemble(Platform::default(), total, table, vec![profile], None, Measurements::new());
    output.shared.frame_infos = frame_infos;
    output.metrics = flamegraph.metrics.clone();
    output
}

fn assemble(
    platform: Platform,
    duration_ns: u64,
    table: FrameTable,
    profiles: Vec<ThreadProfile>,
    active_thread_id: Option<&str>,
    measurements: Measurements,
) -> Output {
    let active_profile_index = active_thread_id
        .and_then(|id| profiles.iter().position(|p| p.thread_id() == id))
        .unwrap_or(0);

    Output {
        version: SCHEMA_VERSION.to_string(),
        platform,
        active_profile_index,
        duration_ns,
        shared: SharedData {
            frames: table.frames,
            frame_infos: Vec::new(),
        },
        profiles,
        measurements,
        metrics: Vec::new(),
        generated_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Event, EventData, EventTime, Sample, SampleData, ThreadInfo};
    use crate::frame::all_application;
    use pretty_assertions::assert_eq;

    fn method(id: u64, name: &str) -> Method {
        Method {
            class_name: "com.example.Main".into(),
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    fn event(action: Action, method_id: u64, ts: u64) -> Event {
        Event { action, thread_id: 1, method_id, time: EventTime::wall_ns(ts) }
    }

    fn event_fragment(events: Vec<Event>) -> EventFragment {
        EventFragment {
            profile: EventData {
                events,
                methods: vec![method(1, "a"), method(2, "b")],
                threads: vec![ThreadInfo { id: 1, name: "main".into() }],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_event_output_closes_open_frames() {
        let fragment = event_fragment(vec![
            event(Action::Enter, 1, 0),
            event(Action::Enter, 2, 10),
            event(Action::Exit, 2, 20),
            event(Action::Enter, 2, 30),
        ]);
        let output = event_output(&fragment, &all_application).unwrap();

        assert_eq!(output.shared.frames.len(), 2);
        assert_eq!(output.duration_ns, 30);
        let ThreadProfile::Evented(profile) = &output.profiles[0] else {
            panic!("expected evented profile");
        };
        assert_eq!(profile.name, "main");
        let kinds: Vec<(FrameEventKind, usize, u64)> =
            profile.events.iter().map(|e| (e.kind, e.frame, e.at)).collect();
        assert_eq!(
            kinds,
            vec![
                (FrameEventKind::Open, 0, 0),
                (FrameEventKind::Open, 1, 10),
                (FrameEventKind::Close, 1, 20),
                (FrameEventKind::Open, 1, 30),
                (FrameEventKind::Close, 1, 30),
                (FrameEventKind::Close, 0, 30),
            ]
        );
    }

    #[test]
    fn test_event_output_mismatched_exit() {
        let fragment = event_fragment(vec![
            event(Action::Enter, 1, 0),
            event(Action::Enter, 2, 10),
            event(Action::Exit, 1, 20),
        ]);
        let err = event_output(&fragment, &all_application).unwrap_err();
        assert!(matches!(err, OutputError::DataIntegrity(_)));
    }

    #[test]
    fn test_event_output_exit_on_empty_stack_ignored() {
        let fragment = event_fragment(vec![event(Action::Exit, 1, 0), event(Action::Enter, 1, 5)]);
        let output = event_output(&fragment, &all_application).unwrap();
        let ThreadProfile::Evented(profile) = &output.profiles[0] else {
            panic!("expected evented profile");
        };
        assert_eq!(profile.events.len(), 2);
    }

    #[test]
    fn test_sample_output_weights() {
        let fragment = SampleFragment {
            profile: SampleData {
                frames: vec![Frame::new("leaf", "app"), Frame::new("root", "app")],
                stacks: vec![vec![0, 1], vec![1]],
                samples: vec![
                    Sample { stack_id: 1, thread_id: "1".into(), timestamp: 1.03 },
                    Sample { stack_id: 0, thread_id: "1".into(), timestamp: 1.0 },
                    Sample { stack_id: 0, thread_id: "1".into(), timestamp: 1.01 },
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        let output = sample_output(&fragment, &all_application).unwrap();
        let ThreadProfile::Sampled(profile) = &output.profiles[0] else {
            panic!("expected sampled profile");
        };
        assert_eq!(profile.samples, vec![vec![0, 1], vec![0, 1], vec![0]]);
        assert_eq!(profile.weights, vec![10_000_000, 20_000_000, 0]);
        assert_eq!(output.shared.frames[0].name, "root");
        assert_eq!(output.duration_ns, 30_000_000);
    }

    #[test]
    fn test_sample_output_invalid_stack() {
        let fragment = SampleFragment {
            profile: SampleData {
                samples: vec![Sample { stack_id: 3, thread_id: "1".into(), timestamp: 1.0 }],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            sample_output(&fragment, &all_application),
            Err(OutputError::DataIntegrity(_))
        ));
    }
}
