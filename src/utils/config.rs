//! Configuration and constants for the library and CLI.

use std::time::Duration;

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Sampling period assumed when estimating sample counts from durations
pub const SAMPLE_PERIOD_NS: u64 = 10_000_000;

/// Deepest frame the event builder keeps per thread
pub const MAX_STACK_DEPTH: usize = 128;

/// Folded stacks lighter than this are dropped from flamegraphs
pub const DEFAULT_MIN_FREQUENCY: u64 = 4;

/// Most folded stacks a flamegraph keeps; the lightest are dropped first
pub const DEFAULT_MAX_FLAMEGRAPH_SAMPLES: usize = 1_000;

/// Most distinct functions kept per profile and per aggregate
pub const DEFAULT_MAX_UNIQUE_FUNCTIONS: usize = 100;

/// Shallowest call-tree depth counted by function metrics. Roots are depth 0.
pub const DEFAULT_FUNCTION_MIN_DEPTH: usize = 1;

/// Concurrent storage reads. Sized for a typical object store.
pub const DEFAULT_READ_WORKERS: usize = 16;

/// Deadline for a whole batch of storage reads
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single HTTP request against the object store
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Hashed in place of an empty package or function name
pub const UNKNOWN_COMPONENT: &str = "-";

/// Thread name marking the UI/main thread
pub const MAIN_THREAD_NAME: &str = "main";

/// Measurement carrying frozen frame render durations
pub const FROZEN_FRAME_MEASUREMENT: &str = "frozen_frame_renders";

// Synthetic frame the python profiler adds at the bottom of every stack
pub const PYTHON_MODULE_FUNCTION: &str = "<module>";
pub const PYTHON_MODULE_FILE: &str = "<string>";

/// Name used for methods referenced by events but never declared
pub const UNKNOWN_METHOD_NAME: &str = "unknown";

/// Wall clock gap inserted when event times jump backwards twice in a row
pub const CLOCK_REPAIR_GAP_NS: u64 = 1_000_000_000;

/// Environment variables consulted by the CLI
pub const STORAGE_DIR_ENV: &str = "FLAMESTITCH_STORAGE_DIR";
pub const STORAGE_URL_ENV: &str = "FLAMESTITCH_STORAGE_URL";
