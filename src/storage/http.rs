//! Object store reached over HTTP (GET/PUT on `{base_url}/{path}`).

use super::ObjectStore;
use crate::utils::config::DEFAULT_HTTP_TIMEOUT;
use crate::utils::error::StorageError;
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

pub struct HttpStore {
    client: Client,
    base_url: String,
}

impl HttpStore {
    /// Create a store with the default request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, StorageError> {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StorageError::RequestFailed)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Using HTTP object store at {}", base_url);
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl ObjectStore for HttpStore {
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().map_err(map_request_error)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(path.to_string())),
            status if status.is_success() => Ok(response.bytes()?.to_vec()),
            status => Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            }),
        }
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let url = self.url(path);
        debug!("PUT {} ({} bytes)", url, bytes.len());
        let response = self
            .client
            .put(&url)
            .body(bytes.to_vec())
            .send()
            .map_err(map_request_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            })
        }
    }
}

fn map_request_error(err: reqwest::Error) -> StorageError {
    if err.is_timeout() {
        StorageError::DeadlineExceeded
    } else {
        StorageError::RequestFailed(err)
    }
}
