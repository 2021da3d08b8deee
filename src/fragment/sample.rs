//! Sample-encoded fragments: frames, stacks and timestamped samples.

use super::measurement::Measurements;
use crate::frame::{Frame, Platform};
use crate::utils::config::MAIN_THREAD_NAME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chunk of stack samples with locally scoped frame and stack tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFragment {
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
    pub profile: SampleData,
    #[serde(default)]
    pub measurements: Measurements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleData {
    pub frames: Vec<Frame>,
    /// Frame indices per stack, leaf first
    pub stacks: Vec<Vec<usize>>,
    pub samples: Vec<Sample>,
    #[serde(default)]
    pub thread_metadata: BTreeMap<String, ThreadMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub stack_id: usize,
    pub thread_id: String,
    /// Seconds since the epoch
    pub timestamp: f64,
}

impl Sample {
    pub fn timestamp_ns(&self) -> u64 {
        seconds_to_ns(self.timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

/// Convert fractional seconds to whole nanoseconds
pub fn seconds_to_ns(seconds: f64) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * 1e9).round() as u64
}

/// Convert nanoseconds to fractional seconds
pub fn ns_to_seconds(ns: u64) -> f64 {
    ns as f64 / 1e9
}

impl SampleFragment {
    /// Timestamp of the earliest sample
    pub fn start_ns(&self) -> u64 {
        self.profile
            .samples
            .iter()
            .map(Sample::timestamp_ns)
            .min()
            .unwrap_or(0)
    }

    /// Timestamp of the latest sample
    pub fn end_ns(&self) -> u64 {
        self.profile
            .samples
            .iter()
            .map(Sample::timestamp_ns)
            .max()
            .unwrap_or(0)
    }

    /// Thread whose metadata names it the main thread
    pub fn main_thread_id(&self) -> Option<&str> {
        self.profile
            .thread_metadata
            .iter()
            .find(|(_, meta)| meta.name == MAIN_THREAD_NAME)
            .map(|(id, _)| id.as_str())
    }

    /// Apply platform-specific cleanup to the decoded stacks
    pub fn normalize(&mut self) {
        if self.platform == Platform::Python {
            self.trim_python_module_frames();
        }
    }

    // Python stacks end with a synthetic `<module>` frame from the
    // interpreter entry point. It carries no information.
    fn trim_python_module_frames(&mut self) {
        let frames = &self.profile.frames;
        for stack in self.profile.stacks.iter_mut() {
            let is_module = stack
                .last()
                .and_then(|&frame_id| frames.get(frame_id))
                .is_some_and(Frame::is_python_module_frame);
            if is_module {
                stack.pop();
            }
        }
    }
}
