//! Raw profiling fragments (chunks) as decoded from storage.
//!
//! Two encodings exist:
//! - Sample-encoded: frames, stacks and samples referencing stacks by index
//! - Event-encoded: methods plus enter/exit/unwind events
//!
//! Both are carried by the closed [`Fragment`] enum.

pub mod event;
pub mod measurement;
pub mod sample;

pub use event::{
    Action, Clock, ClockTime, Event, EventClock, EventData, EventFragment, EventTime, Method,
    MonotonicTime, ThreadInfo,
};
pub use measurement::{merge_measurements, Measurement, MeasurementValue, Measurements};
pub use sample::{ns_to_seconds, seconds_to_ns, Sample, SampleData, SampleFragment, ThreadMetadata};

use crate::frame::Platform;
use crate::storage::storage_path;
use serde::{Deserialize, Serialize};

/// A fragment in either encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Sample(SampleFragment),
    Event(EventFragment),
}

impl Fragment {
    pub fn id(&self) -> &str {
        match self {
            Fragment::Sample(f) => &f.id,
            Fragment::Event(f) => &f.id,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Fragment::Sample(f) => f.platform,
            Fragment::Event(f) => f.platform,
        }
    }

    /// Absolute start of the fragment in nanoseconds
    pub fn start_ns(&self) -> u64 {
        match self {
            Fragment::Sample(f) => f.start_ns(),
            Fragment::Event(f) => f.start_ns(),
        }
    }

    /// Absolute end of the fragment in nanoseconds
    pub fn end_ns(&self) -> u64 {
        match self {
            Fragment::Sample(f) => f.end_ns(),
            Fragment::Event(f) => f.end_ns(),
        }
    }

    pub fn measurements(&self) -> &Measurements {
        match self {
            Fragment::Sample(f) => &f.measurements,
            Fragment::Event(f) => &f.measurements,
        }
    }

    /// Thread id of the UI/main thread, when the fragment names one
    pub fn main_thread_id(&self) -> Option<String> {
        match self {
            Fragment::Sample(f) => f.main_thread_id().map(str::to_string),
            Fragment::Event(f) => f.main_thread_id().map(|id| id.to_string()),
        }
    }

    /// Platform-specific cleanup applied once after decoding
    pub fn normalize(&mut self) {
        match self {
            Fragment::Sample(f) => f.normalize(),
            Fragment::Event(f) => f.profile.repair_wall_clock(),
        }
    }

    /// Key of this fragment in the object store
    pub fn storage_path(&self) -> String {
        let (org, project, profiler, id) = match self {
            Fragment::Sample(f) => (f.organization_id, f.project_id, &f.profiler_id, &f.id),
            Fragment::Event(f) => (f.organization_id, f.project_id, &f.profiler_id, &f.id),
        };
        storage_path(org, project, profiler, id)
    }

    pub fn encoding(&self) -> &'static str {
        match self {
            Fragment::Sample(_) => "sample",
            Fragment::Event(_) => "event",
        }
    }
}

impl From<SampleFragment> for Fragment {
    fn from(fragment: SampleFragment) -> Self {
        Fragment::Sample(fragment)
    }
}

impl From<EventFragment> for Fragment {
    fn from(fragment: EventFragment) -> Self {
        Fragment::Event(fragment)
    }
}
