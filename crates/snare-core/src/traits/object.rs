// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object storage trait for recorded audio and other blobs.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::traits::adapter::PluginAdapter;

/// Key-based blob storage.
#[async_trait]
pub trait ObjectStore: PluginAdapter {
    /// Stores the bytes and returns the key they were stored under.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, SnareError>;

    /// Fetches the bytes, or [`SnareError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, SnareError>;

    /// Removes the key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), SnareError>;

    async fn exists(&self, key: &str) -> Result<bool, SnareError>;
}
