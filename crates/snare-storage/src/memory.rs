// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process document store for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use snare_core::{
    AdapterType, DocumentStore, Filter, PluginAdapter, SnareError, Update, UpdateOutcome,
};

use crate::document::{apply_update, matches, seed_from_filter};

/// Collections of JSON documents held in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every document in a collection, oldest first.
    pub fn dump(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> SnareError {
    SnareError::Internal("document store lock poisoned".into())
}

#[async_trait]
impl PluginAdapter for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, SnareError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)))
            .cloned())
    }

    async fn find_latest(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Value>, SnareError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let mut newest: Vec<Value> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .rev()
                    .filter(|d| matches(d, filter))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        newest.reverse();
        Ok(newest)
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), SnareError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, SnareError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) {
            let mut next = doc.clone();
            let modified = apply_update(&mut next, update)?;
            *doc = next;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: u64::from(modified),
                upserted: false,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }
        let mut seeded = seed_from_filter(filter)?;
        apply_update(&mut seeded, update)?;
        docs.push(seeded);
        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted: true,
        })
    }
}
