//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while building call trees
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("profile contains invalid stack id: {0}")]
    InvalidStackId(usize),

    #[error("profile contains invalid frame id: {0}")]
    InvalidFrameId(usize),
}

/// Errors that can occur while stitching fragments together
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StitchError {
    #[error("no fragments to stitch")]
    NoFragments,

    #[error("cannot stitch sample-encoded and event-encoded fragments together")]
    MixedEncodings,

    #[error("cannot stitch event fragments recorded with different clocks")]
    ClockMismatch,

    #[error("shifting timestamp {timestamp_ns}ns by {delta_ns}ns would go below zero")]
    NegativeTimestamp { timestamp_ns: u64, delta_ns: i64 },
}

/// Errors that can occur during flamegraph rendering
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("rendered flamegraph is not valid UTF-8")]
    InvalidSvg(#[from] std::string::FromUtf8Error),

    #[error("failed to render flamegraph: {0}")]
    Render(String),
}

/// Errors that can occur during conversion and file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

/// Errors reported by object stores and read jobs
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("read deadline exceeded")]
    DeadlineExceeded,

    #[error("read cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("read pool stopped before all jobs reported")]
    Disconnected,
}

/// Failure of one read-and-build job in the pool
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl JobError {
    /// Whether the object was missing or the read ran out of time.
    ///
    /// Aggregations skip these quietly instead of reporting them.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            JobError::Storage(StorageError::NotFound(_))
                | JobError::Storage(StorageError::DeadlineExceeded)
        )
    }
}
