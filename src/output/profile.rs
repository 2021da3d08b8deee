//! Output profile format.
//!
//! A shared frame table plus one evented or sampled profile per thread.
//! All values are in nanoseconds relative to the start of the output,
//! except flamegraph profiles which carry sample counts.

use crate::flamegraph::FrameInfo;
use crate::fragment::Measurements;
use crate::frame::{Frame, Platform};
use crate::metrics::FunctionMetrics;
use serde::{Deserialize, Serialize};

pub const UNIT_NANOSECONDS: &str = "nanoseconds";
pub const UNIT_COUNT: &str = "count";

/// Complete output document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Schema version
    pub version: String,

    #[serde(default)]
    pub platform: Platform,

    /// Index into `profiles` of the main thread
    #[serde(default)]
    pub active_profile_index: usize,

    pub duration_ns: u64,

    pub shared: SharedData,

    pub profiles: Vec<ThreadProfile>,

    #[serde(default, skip_serializing_if = "Measurements::is_empty")]
    pub measurements: Measurements,

    /// Aggregated function metrics, flamegraphs only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<FunctionMetrics>,

    /// ISO 8601 generation time
    pub generated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedData {
    pub frames: Vec<OutputFrame>,

    /// Per-frame statistics parallel to `frames`, flamegraphs only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frame_infos: Vec<FrameInfo>,
}

/// One frame table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFrame {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: u32,

    pub is_application: bool,
}

fn is_zero(line: &u32) -> bool {
    *line == 0
}

impl OutputFrame {
    pub fn from_frame(frame: &Frame, is_application: bool) -> Self {
        Self {
            name: frame.function.clone(),
            package: frame.package_base_name().to_string(),
            file: frame.file.clone(),
            path: frame.path.clone(),
            line: frame.line,
            is_application,
        }
    }
}

/// Per-thread profile, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadProfile {
    Evented(EventedProfile),
    Sampled(SampledProfile),
}

impl ThreadProfile {
    pub fn thread_id(&self) -> &str {
        match self {
            ThreadProfile::Evented(p) => &p.thread_id,
            ThreadProfile::Sampled(p) => &p.thread_id,
        }
    }

    pub fn end_value(&self) -> u64 {
        match self {
            ThreadProfile::Evented(p) => p.end_value,
            ThreadProfile::Sampled(p) => p.end_value,
        }
    }
}

/// Open/close events against the shared frame table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventedProfile {
    pub name: String,
    pub thread_id: String,
    pub unit: String,
    pub start_value: u64,
    pub end_value: u64,
    pub events: Vec<FrameEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameEventKind {
    #[serde(rename = "O")]
    Open,
    #[serde(rename = "C")]
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvent {
    #[serde(rename = "type")]
    pub kind: FrameEventKind,
    pub frame: usize,
    pub at: u64,
}

/// Root-first frame index stacks with one weight each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledProfile {
    pub name: String,
    pub thread_id: String,
    pub unit: String,
    pub start_value: u64,
    pub end_value: u64,
    pub samples: Vec<Vec<usize>>,
    pub weights: Vec<u64>,
}
