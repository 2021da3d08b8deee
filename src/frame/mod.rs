//! Frame identity.
//!
//! A [`Frame`] is one resolved function location. Frames are immutable once a
//! fragment is decoded; call-tree nodes, folded stacks and detected
//! occurrences all refer back to them.

pub mod fingerprint;
pub mod platform;

pub use fingerprint::{fingerprint_of, StackHasher};
pub use platform::Platform;

use crate::utils::config::{PYTHON_MODULE_FILE, PYTHON_MODULE_FUNCTION};
use serde::{Deserialize, Serialize};

/// Injected classification of frames that belong to the profiled application
pub type ApplicationPredicate = dyn Fn(&Frame) -> bool + Send + Sync;

/// One resolved function location
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    /// Function or method name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub function: String,

    /// Module name, preferred over `package` when present
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,

    /// Package, image or library path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub package: String,

    /// Short file name
    #[serde(default, rename = "filename", skip_serializing_if = "String::is_empty")]
    pub file: String,

    /// Absolute file path
    #[serde(default, rename = "abs_path", skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, rename = "lineno", skip_serializing_if = "is_zero")]
    pub line: u32,

    /// Explicit in-app flag; `None` defers to the platform predicate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
}

fn is_zero(line: &u32) -> bool {
    *line == 0
}

impl Frame {
    /// Create a frame from a function and package
    pub fn new(function: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_in_app(mut self, in_app: bool) -> Self {
        self.in_app = Some(in_app);
        self
    }

    /// Module if set, else the last path segment of the package, else empty
    ///
    /// Both `/` and `\` separators are understood so Windows image paths
    /// reduce to their file name too.
    pub fn package_base_name(&self) -> &str {
        if !self.module.is_empty() {
            return &self.module;
        }
        let trimmed = self.package.trim_end_matches(['/', '\\']);
        match trimmed.rfind(['/', '\\']) {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        }
    }

    /// Single-frame fingerprint
    pub fn fingerprint(&self) -> u64 {
        fingerprint_of(self)
    }

    /// Explicit in-app flag if present, otherwise ask the predicate
    pub fn is_application(&self, predicate: &ApplicationPredicate) -> bool {
        self.in_app.unwrap_or_else(|| predicate(self))
    }

    /// Whether this frame is the synthetic python module frame
    pub fn is_python_module_frame(&self) -> bool {
        self.function == PYTHON_MODULE_FUNCTION && self.file == PYTHON_MODULE_FILE
    }
}

/// Default predicate: every unflagged frame counts as application code
pub fn all_application(_frame: &Frame) -> bool {
    true
}
