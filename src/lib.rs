//! flamestitch
//!
//! Call-tree algebra for profiling data: build per-thread call trees from
//! sample-encoded or event-encoded fragments, stitch time-adjacent
//! fragments, slice trees to time intervals, fold them into flamegraphs,
//! rank functions by self time and search them for known performance issues.
//!
//! This crate provides the core implementation for the `flamestitch` CLI.
//!
//! ## Getting Started
//!
//! ```bash
//! flamestitch calltree --input fragment.json
//! flamestitch flamegraph --storage-dir ./profiles --object 1/2/p/c --svg out.svg
//! ```

pub mod builder;
pub mod commands;
pub mod detect;
pub mod flamegraph;
pub mod fragment;
pub mod frame;
pub mod metrics;
pub mod nodetree;
pub mod output;
pub mod slice;
pub mod stitch;
pub mod storage;
pub mod utils;
