//! Stitching event-encoded fragments.

use super::{collect_in_window, delta_between};
use crate::fragment::{
    merge_measurements, ns_to_seconds, EventData, EventFragment, Measurements, Method, ThreadInfo,
};
use crate::slice::Interval;
use crate::utils::error::StitchError;
use log::debug;
use std::collections::{HashMap, HashSet};

/// State of one stitch invocation
///
/// Method ids are renumbered from 1 across all fragments so identical
/// local ids in different fragments never alias.
#[derive(Debug, Default)]
pub struct StitchContext {
    next_method_id: u64,
    methods: Vec<Method>,
    threads: Vec<ThreadInfo>,
    seen_threads: HashSet<u64>,
    measurements: Measurements,
}

impl StitchContext {
    pub fn new() -> Self {
        Self {
            next_method_id: 1,
            ..Self::default()
        }
    }

    fn allocate_method_id(&mut self) -> u64 {
        let id = self.next_method_id;
        self.next_method_id += 1;
        id
    }

    /// Register a fragment's methods and return its local-to-global id map
    fn register_methods(&mut self, methods: Vec<Method>) -> HashMap<u64, u64> {
        let mut ids = HashMap::with_capacity(methods.len());
        for mut method in methods {
            let global = self.allocate_method_id();
            ids.insert(method.id, global);
            method.id = global;
            self.methods.push(method);
        }
        ids
    }

    fn register_threads(&mut self, threads: Vec<ThreadInfo>) {
        for thread in threads {
            if self.seen_threads.insert(thread.id) {
                self.threads.push(thread);
            }
        }
    }
}

/// Merge event fragments into one with a global method table
///
/// The merged origin is the later of the first fragment's start and the
/// window start. Every kept event is moved onto that origin.
pub fn stitch_events(
    mut fragments: Vec<EventFragment>,
    window: Interval,
) -> Result<EventFragment, StitchError> {
    fragments.sort_by_key(|f| (f.start_ns(), f.end_ns()));

    let Some(first) = fragments.first() else {
        return Err(StitchError::NoFragments);
    };
    if fragments.iter().any(|f| f.profile.clock != first.profile.clock) {
        return Err(StitchError::ClockMismatch);
    }

    let origin_ns = first.start_ns().max(window.start_ns);
    let target = first.profile.event_clock();
    let mut merged = EventFragment {
        id: first.id.clone(),
        profiler_id: first.profiler_id.clone(),
        organization_id: first.organization_id,
        project_id: first.project_id,
        platform: first.platform,
        timestamp: ns_to_seconds(origin_ns),
        duration_ns: 0,
        profile: EventData {
            clock: first.profile.clock,
            start_time: first.profile.start_time,
            ..EventData::default()
        },
        measurements: Measurements::new(),
    };

    let mut ctx = StitchContext::new();
    let mut max_ns = 0;
    for fragment in fragments {
        let fragment_start = fragment.start_ns();
        let source = fragment.profile.event_clock();
        let delta_ns = delta_between(origin_ns, fragment_start);

        let mut ids = ctx.register_methods(fragment.profile.methods);
        let mut events = fragment.profile.events;
        for event in events.iter_mut() {
            event.method_id = match ids.get(&event.method_id) {
                Some(&id) => id,
                None => {
                    let id = ctx.allocate_method_id();
                    ids.insert(event.method_id, id);
                    id
                }
            };
        }

        let (events, fragment_max) =
            collect_in_window(events, &source, &target, fragment_start, delta_ns, window)?;
        max_ns = max_ns.max(fragment_max);
        merged.profile.events.extend(events);

        ctx.register_threads(fragment.profile.threads);
        merge_measurements(&mut ctx.measurements, fragment.measurements);
    }

    merged.duration_ns = max_ns;
    merged.profile.methods = ctx.methods;
    merged.profile.threads = ctx.threads;
    merged.measurements = ctx.measurements;

    debug!(
        "Stitched {} methods, {} events, origin {}ns",
        merged.profile.methods.len(),
        merged.profile.events.len(),
        origin_ns
    );
    Ok(merged)
}
