//! Event-encoded fragments: method enter/exit events from method tracing.

use super::measurement::Measurements;
use super::sample::seconds_to_ns;
use crate::frame::{Frame, Platform};
use crate::utils::config::{CLOCK_REPAIR_GAP_NS, MAIN_THREAD_NAME, UNKNOWN_METHOD_NAME};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A chunk of method-trace events with a locally scoped method table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventFragment {
    #[serde(default, rename = "chunk_id")]
    pub id: String,
    #[serde(default)]
    pub profiler_id: String,
    #[serde(default)]
    pub organization_id: u64,
    #[serde(default)]
    pub project_id: u64,
    #[serde(default)]
    pub platform: Platform,
    /// Start of the fragment, seconds since the epoch
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub duration_ns: u64,
    pub profile: EventData,
    #[serde(default)]
    pub measurements: Measurements,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub clock: Clock,
    pub events: Vec<Event>,
    pub methods: Vec<Method>,
    #[serde(default)]
    pub threads: Vec<ThreadInfo>,
    /// Origin of the global clock, in nanoseconds
    #[serde(default)]
    pub start_time: u64,
}

/// Clock domain event times are read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clock {
    #[default]
    Dual,
    Cpu,
    Wall,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Enter,
    Exit,
    Unwind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub action: Action,
    pub thread_id: u64,
    pub method_id: u64,
    #[serde(default)]
    pub time: EventTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(default)]
    pub global: ClockTime,
    #[serde(default, rename = "Monotonic")]
    pub monotonic: MonotonicTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonotonicTime {
    #[serde(default)]
    pub wall: ClockTime,
    #[serde(default)]
    pub cpu: ClockTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTime {
    #[serde(default)]
    pub secs: u64,
    #[serde(default)]
    pub nanos: u64,
}

impl ClockTime {
    pub fn from_ns(ns: u64) -> Self {
        Self {
            secs: ns / NANOS_PER_SEC,
            nanos: ns % NANOS_PER_SEC,
        }
    }

    pub fn as_ns(&self) -> u64 {
        self.secs.saturating_mul(NANOS_PER_SEC).saturating_add(self.nanos)
    }
}

impl EventTime {
    /// Time record with only the monotonic wall clock set
    pub fn wall_ns(ns: u64) -> Self {
        Self {
            monotonic: MonotonicTime {
                wall: ClockTime::from_ns(ns),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Reads and writes event times in one clock domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClock {
    pub clock: Clock,
    pub start_time: u64,
}

impl EventClock {
    /// Nanoseconds since the start of the trace
    pub fn timestamp_ns(&self, time: &EventTime) -> u64 {
        match self.clock {
            Clock::Global => time.global.as_ns().saturating_sub(self.start_time),
            Clock::Cpu => time.monotonic.cpu.as_ns(),
            Clock::Wall | Clock::Dual => time.monotonic.wall.as_ns(),
        }
    }

    /// Store `ns` (relative to trace start) back into the time record
    pub fn set_timestamp_ns(&self, time: &mut EventTime, ns: u64) {
        match self.clock {
            Clock::Global => time.global = ClockTime::from_ns(ns.saturating_add(self.start_time)),
            Clock::Cpu => time.monotonic.cpu = ClockTime::from_ns(ns),
            Clock::Wall | Clock::Dual => time.monotonic.wall = ClockTime::from_ns(ns),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,
    pub id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_file: String,
    #[serde(default)]
    pub source_line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
}

impl Method {
    /// Placeholder for a method id that the method table does not declare
    pub fn unknown(id: u64) -> Self {
        Self {
            class_name: UNKNOWN_METHOD_NAME.to_string(),
            id,
            name: UNKNOWN_METHOD_NAME.to_string(),
            ..Self::default()
        }
    }

    /// `Class.method(signature)`; constructors render as `Class(signature)`
    pub fn full_name(&self) -> String {
        if self.class_name.is_empty() {
            return self.name.clone();
        }
        let mut name = self.class_name.clone();
        if self.name != "<init>" {
            name.push('.');
            name.push_str(&self.name);
        }
        name.push_str(&self.signature);
        name
    }

    /// Class name up to its last `.`
    pub fn package_name(&self) -> &str {
        match self.class_name.rfind('.') {
            Some(idx) => &self.class_name[..idx],
            None => &self.class_name,
        }
    }

    pub fn frame(&self) -> Frame {
        let file = self
            .source_file
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Frame {
            function: self.full_name(),
            package: self.package_name().to_string(),
            file,
            path: self.source_file.clone(),
            line: self.source_line,
            in_app: self.in_app,
            ..Frame::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl EventData {
    pub fn event_clock(&self) -> EventClock {
        EventClock {
            clock: self.clock,
            start_time: self.start_time,
        }
    }

    pub fn methods_by_id(&self) -> HashMap<u64, &Method> {
        self.methods.iter().map(|m| (m.id, m)).collect()
    }

    /// Thread named `main`, if any
    pub fn main_thread_id(&self) -> Option<u64> {
        self.threads
            .iter()
            .find(|t| t.name == MAIN_THREAD_NAME)
            .map(|t| t.id)
    }

    /// Repair wall-clock times that went backwards
    ///
    /// Some tracers overflow their wall clock and produce decreasing times.
    /// From the first regression on, each time is rebuilt from the highest
    /// time seen on its thread plus the step since the previous raw time.
    /// A time that also precedes the previous raw time is placed one second
    /// after the highest.
    pub fn repair_wall_clock(&mut self) {
        if matches!(self.clock, Clock::Global | Clock::Cpu) {
            return;
        }

        let mut max_ns: HashMap<u64, u64> = HashMap::new();
        let mut latest_ns: HashMap<u64, u64> = HashMap::new();

        let regression = self.events.iter().position(|event| {
            let current = event.time.monotonic.wall.as_ns();
            let latest = latest_ns.entry(event.thread_id).or_default();
            if current < *latest {
                return true;
            }
            *latest = current;
            let max = max_ns.entry(event.thread_id).or_default();
            *max = (*max).max(current);
            false
        });

        let Some(start) = regression else {
            return;
        };
        if start == 0 {
            return;
        }

        for event in self.events[start..].iter_mut() {
            let current = event.time.monotonic.wall.as_ns();
            let max = max_ns.entry(event.thread_id).or_default();
            let latest = latest_ns.entry(event.thread_id).or_default();

            let adjusted = if current < *max && current < *latest {
                *max + CLOCK_REPAIR_GAP_NS
            } else {
                *max + current.saturating_sub(*latest)
            };
            *max = (*max).max(adjusted);
            *latest = current;
            event.time.monotonic.wall = ClockTime::from_ns(adjusted);
        }
    }
}

impl EventFragment {
    pub fn start_ns(&self) -> u64 {
        seconds_to_ns(self.timestamp)
    }

    pub fn end_ns(&self) -> u64 {
        self.start_ns().saturating_add(self.duration_ns)
    }

    pub fn main_thread_id(&self) -> Option<u64> {
        self.profile.main_thread_id()
    }
}
