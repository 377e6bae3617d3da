// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by the I/O backends.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for storage, transcription, and reporting backends.
///
/// Provides identity and health check capabilities so the binary can
/// report which concrete backend is wired in.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, SnareError> {
        Ok(HealthStatus::Healthy)
    }
}
