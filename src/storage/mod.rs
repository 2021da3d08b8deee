//! Object storage for fragments.
//!
//! Fragments live under `{org}/{project}/{profiler}/{chunk}` keys as JSON.
//! Compression, when the backing store applies any, happens outside this
//! crate.

pub mod fs;
pub mod http;
pub mod memory;
pub mod readjob;

pub use fs::FsStore;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use readjob::{CancelToken, ReadJob, ReadJobResult, ReadPool};

use crate::fragment::Fragment;
use crate::utils::error::StorageError;

/// Minimal blob store interface
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `path`
    ///
    /// # Errors
    /// * `StorageError::NotFound` - no object at `path`
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `bytes` at `path`, replacing any existing object
    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Storage key of a fragment
pub fn storage_path(organization_id: u64, project_id: u64, profiler_id: &str, id: &str) -> String {
    format!("{organization_id}/{project_id}/{profiler_id}/{id}")
}

/// Fetch and decode a fragment, normalizing it for its platform
pub fn read_fragment(store: &dyn ObjectStore, path: &str) -> Result<Fragment, StorageError> {
    let bytes = store.get(path)?;
    let mut fragment: Fragment = serde_json::from_slice(&bytes)?;
    fragment.normalize();
    Ok(fragment)
}

/// Encode a fragment and store it under its own storage path
pub fn write_fragment(store: &dyn ObjectStore, fragment: &Fragment) -> Result<String, StorageError> {
    let path = fragment.storage_path();
    let bytes = serde_json::to_vec(fragment)?;
    store.put(&path, &bytes)?;
    Ok(path)
}
