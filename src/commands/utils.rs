//! Helpers shared by the commands.

use crate::fragment::Fragment;
use crate::output::{read_fragment_file, write_json};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Load a fragment file with the path in the error context
pub fn load_fragment(path: &Path) -> Result<Fragment> {
    read_fragment_file(path).with_context(|| format!("Failed to read fragment {}", path.display()))
}

/// Write `value` to `output`, or pretty-print it to stdout when unset
pub fn emit_json<T: Serialize + ?Sized>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            write_json(value, path).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
            println!("{}", json);
        }
    }
    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("flamestitch v{}", env!("CARGO_PKG_VERSION"));
    println!("Output Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call-tree building, stitching, slicing, folding and issue detection");
    println!("for sampled and traced profiles.");
}
