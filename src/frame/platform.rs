//! Runtime platforms that produce profiles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime that recorded a fragment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Cocoa,
    Java,
    #[serde(rename = "javascript")]
    JavaScript,
    Node,
    Php,
    Python,
    Rust,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Cocoa => "cocoa",
            Platform::Java => "java",
            Platform::JavaScript => "javascript",
            Platform::Node => "node",
            Platform::Php => "php",
            Platform::Python => "python",
            Platform::Rust => "rust",
            Platform::Unknown => "unknown",
        }
    }

    /// Parse a platform name, falling back to `Unknown`
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "android" => Platform::Android,
            "cocoa" => Platform::Cocoa,
            "java" => Platform::Java,
            "javascript" => Platform::JavaScript,
            "node" => Platform::Node,
            "php" => Platform::Php,
            "python" => Platform::Python,
            "rust" => Platform::Rust,
            _ => Platform::Unknown,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
