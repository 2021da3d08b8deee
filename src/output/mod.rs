//! Output format and writers.
//!
//! This module turns fragments and flamegraphs into the output format and
//! writes results to disk:
//! - JSON outputs, call trees and occurrences
//! - SVG flamegraphs

pub mod convert;
pub mod json;
pub mod profile;
pub mod svg;

pub use convert::{event_output, flamegraph_output, fragment_output, sample_output};
pub use json::{output_to_string, read_fragment_file, read_output, write_json, write_output};
pub use profile::{
    EventedProfile, FrameEvent, FrameEventKind, Output, OutputFrame, SampledProfile, SharedData,
    ThreadProfile,
};
pub use svg::write_svg;
