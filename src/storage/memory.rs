//! In-memory object store, used by tests and local tooling.

use super::ObjectStore;
use crate::utils::error::StorageError;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Disconnected)?;
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StorageError::Disconnected)?;
        objects.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }
}
