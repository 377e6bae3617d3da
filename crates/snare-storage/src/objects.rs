// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob storage for call recordings and evidence.
//!
//! [`FallbackObjectStore`] routes to a remote S3-compatible endpoint when one
//! is configured and falls back to a local directory with the same keyspace
//! whenever the remote is absent or failing.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use snare_config::model::ObjectStorageConfig;
use snare_core::{AdapterType, ObjectStore, PluginAdapter, SnareError};
use tracing::{debug, warn};

/// Rejects empty, absolute, and parent-relative keys.
fn validate_key(key: &str) -> Result<(), SnareError> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(SnareError::InvalidInput(format!("invalid object key `{key}`")))
    }
}

/// Objects stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SnareError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl PluginAdapter for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ObjectStore
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, SnareError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SnareError::storage)?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(SnareError::storage)?;
        debug!(key = %key, "object stored locally");
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SnareError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SnareError::NotFound(key.to_string()))
            }
            Err(e) => Err(SnareError::storage(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), SnareError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnareError::storage(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, SnareError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(SnareError::storage)
    }
}

/// Path-style HTTP object store (`{endpoint}/{bucket}/{key}`), such as a
/// MinIO bucket with a write policy or a presigning proxy.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, bucket: &str, timeout: Duration) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SnareError::storage)?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn url_for(&self, key: &str) -> Result<String, SnareError> {
        validate_key(key)?;
        Ok(format!("{}/{}/{key}", self.endpoint, self.bucket))
    }
}

fn http_err(action: &str, status: StatusCode) -> SnareError {
    SnareError::storage(format!("object {action} returned {status}"))
}

#[async_trait]
impl PluginAdapter for HttpObjectStore {
    fn name(&self) -> &str {
        "http"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ObjectStore
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, SnareError> {
        let response = self
            .client
            .put(self.url_for(key)?)
            .body(bytes)
            .send()
            .await
            .map_err(SnareError::storage)?;
        if !response.status().is_success() {
            return Err(http_err("put", response.status()));
        }
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SnareError> {
        let response = self
            .client
            .get(self.url_for(key)?)
            .send()
            .await
            .map_err(SnareError::storage)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(SnareError::NotFound(key.to_string())),
            s if s.is_success() => Ok(response
                .bytes()
                .await
                .map_err(SnareError::storage)?
                .to_vec()),
            s => Err(http_err("get", s)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), SnareError> {
        let response = self
            .client
            .delete(self.url_for(key)?)
            .send()
            .await
            .map_err(SnareError::storage)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            s => Err(http_err("delete", s)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, SnareError> {
        let response = self
            .client
            .head(self.url_for(key)?)
            .send()
            .await
            .map_err(SnareError::storage)?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            s if s.is_success() => Ok(true),
            s => Err(http_err("head", s)),
        }
    }
}

/// Remote store with a local fallback sharing the same keys.
pub struct FallbackObjectStore {
    primary: Option<Arc<dyn ObjectStore>>,
    local: LocalObjectStore,
}

impl FallbackObjectStore {
    pub fn new(primary: Option<Arc<dyn ObjectStore>>, local: LocalObjectStore) -> Self {
        Self { primary, local }
    }

    pub fn from_config(config: &ObjectStorageConfig) -> Result<Self, SnareError> {
        let primary = match &config.endpoint {
            Some(endpoint) => Some(Arc::new(HttpObjectStore::new(
                endpoint,
                &config.bucket,
                Duration::from_secs(30),
            )?) as Arc<dyn ObjectStore>),
            None => None,
        };
        Ok(Self::new(primary, LocalObjectStore::new(&config.local_path)))
    }
}

#[async_trait]
impl PluginAdapter for FallbackObjectStore {
    fn name(&self) -> &str {
        "fallback"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ObjectStore
    }
}

#[async_trait]
impl ObjectStore for FallbackObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, SnareError> {
        validate_key(key)?;
        if let Some(primary) = &self.primary {
            match primary.put(key, bytes.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(e) => warn!(key = %key, error = %e, "remote put failed, storing locally"),
            }
        }
        self.local.put(key, bytes).await
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, SnareError> {
        validate_key(key)?;
        if let Some(primary) = &self.primary {
            match primary.get(key).await {
                Ok(bytes) => return Ok(bytes),
                Err(SnareError::NotFound(_)) => {}
                Err(e) => warn!(key = %key, error = %e, "remote get failed, trying local"),
            }
        }
        self.local.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), SnareError> {
        validate_key(key)?;
        if let Some(primary) = &self.primary
            && let Err(e) = primary.delete(key).await
        {
            warn!(key = %key, error = %e, "remote delete failed");
        }
        self.local.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, SnareError> {
        validate_key(key)?;
        if let Some(primary) = &self.primary {
            match primary.exists(key).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => warn!(key = %key, error = %e, "remote exists check failed"),
            }
        }
        self.local.exists(key).await
    }
}
