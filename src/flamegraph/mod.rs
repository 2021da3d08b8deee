//! Flamegraph folding and rendering.
//!
//! Call trees from any number of profiles are folded into weighted
//! root-to-leaf stacks, filtered by a minimum frequency, capped to the
//! heaviest stacks and rendered to SVG or emitted as a sampled profile.
//! Per-frame statistics and optional function metrics ride along.

pub mod aggregate;
pub mod fold;
pub mod svg;

pub use aggregate::{aggregate_flamegraph, AggregateOptions, FunctionMetricsOptions};
pub use fold::{fold, Flamegraph, FoldedStack, Folder, FrameInfo};
pub use svg::{render_svg, FlamegraphConfig};
