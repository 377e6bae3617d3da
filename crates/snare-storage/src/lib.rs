// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for the Snare honeypot.
//!
//! Session state lives in a JSON document store with filter-based updates:
//! [`SqliteDocumentStore`] for deployments (WAL mode, embedded migrations,
//! single-writer thread) and [`MemoryDocumentStore`] for tests. Recorded
//! audio goes to an object store with a local-filesystem fallback.

pub mod document;
pub mod memory;
pub mod objects;
pub mod sqlite;

use std::sync::Arc;

use snare_config::model::{StorageBackend, StorageConfig};
use snare_core::{DocumentStore, SnareError};

pub use memory::MemoryDocumentStore;
pub use objects::{FallbackObjectStore, HttpObjectStore, LocalObjectStore};
pub use sqlite::SqliteDocumentStore;

/// Opens the document store selected by `config.backend`.
pub async fn open_document_store(
    config: &StorageConfig,
) -> Result<Arc<dyn DocumentStore>, SnareError> {
    Ok(match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteDocumentStore::from_config(config).await?),
        StorageBackend::Memory => Arc::new(MemoryDocumentStore::new()),
    })
}
