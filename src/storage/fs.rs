//! Object store backed by a local directory.

use super::ObjectStore;
use crate::utils::error::StorageError;
use log::debug;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Stores each object as a file under `root`, keyed by its relative path
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Keys are relative; anything escaping the root is refused.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsStore {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        debug!("Reading object from: {}", file.display());
        std::fs::read(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!("Writing {} bytes to: {}", bytes.len(), file.display());
        std::fs::write(&file, bytes)?;
        Ok(())
    }
}
