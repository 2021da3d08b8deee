//! JSON output writer and readers.
//!
//! Writes outputs, call trees and fragments to JSON files with pretty
//! formatting, and reads fragments and outputs back.

use super::profile::Output;
use crate::fragment::Fragment;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write an output document to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_output(output: &Output, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    write_json(output, output_path)
}

/// Write any serializable value as pretty JSON
///
/// **Public** - used for call trees, fragments and occurrences
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing JSON to: {}", output_path.display());
    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(OutputError::SerializationFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!(
        "JSON written successfully ({} bytes)",
        calculate_file_size(output_path)
    );
    Ok(())
}

/// Serialize an output document to a pretty JSON string
pub fn output_to_string(output: &Output) -> Result<String, OutputError> {
    serde_json::to_string_pretty(output).map_err(OutputError::SerializationFailed)
}

/// Validate an output path and create its parent directories
///
/// **Internal** - shared by the JSON and SVG writers
pub(crate) fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    validate_output_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read an output document from a JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_output(input_path: impl AsRef<Path>) -> Result<Output, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading output from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let output: Output =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Output loaded: version {}, {} profiles",
        output.version,
        output.profiles.len()
    );
    Ok(output)
}

/// Read and normalize a fragment from a JSON file
///
/// **Public** - the CLI's way of loading fragments without a store
pub fn read_fragment_file(input_path: impl AsRef<Path>) -> Result<Fragment, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading fragment from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let mut fragment: Fragment =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;
    fragment.normalize();

    debug!(
        "Fragment loaded: {} ({} encoding)",
        fragment.id(),
        fragment.encoding()
    );
    Ok(fragment)
}
