//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the library components and own all user-facing
//! output.

pub mod calltree;
pub mod convert;
pub mod detect;
pub mod flamegraph;
pub mod functions;
pub mod stitch;
pub mod utils;

pub use calltree::{execute_calltree, validate_calltree_args, CalltreeArgs};
pub use convert::{execute_convert, ConvertArgs};
pub use detect::{execute_detect, DetectArgs};
pub use flamegraph::{execute_flamegraph, validate_flamegraph_args, FlamegraphArgs};
pub use functions::{execute_functions, validate_functions_args, FunctionsArgs};
pub use stitch::{execute_stitch, validate_stitch_args, StitchArgs};
pub use utils::display_version;
