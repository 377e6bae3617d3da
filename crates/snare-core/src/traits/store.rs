// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document store trait and its filter/update vocabulary.
//!
//! The store is collection-style: documents are JSON objects, filters are
//! conjunctions of conditions on dotted field paths, and updates combine
//! set, increment, and push operators. No cross-collection transactions are
//! assumed. A single `update_one` call must be atomic, which makes a
//! filtered update usable as a compare-and-swap.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SnareError;
use crate::traits::adapter::PluginAdapter;

/// A single field condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field exists and equals the value.
    Eq(String, Value),
    /// Field is absent or differs from the value.
    Ne(String, Value),
}

/// Conjunction of field conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a filter on `session_id`.
    pub fn session(session_id: &str) -> Self {
        Self::new().eq("session_id", session_id)
    }

    pub fn eq(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(path.to_string(), value.into()));
        self
    }

    pub fn ne(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Ne(path.to_string(), value.into()));
        self
    }
}

/// Field-level update operators applied in order: set, inc, push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub set: Vec<(String, Value)>,
    pub inc: Vec<(String, i64)>,
    pub push: Vec<(String, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set.push((path.to_string(), value.into()));
        self
    }

    pub fn inc(mut self, path: &str, by: i64) -> Self {
        self.inc.push((path.to_string(), by));
        self
    }

    pub fn push(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.push.push((path.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.push.is_empty()
    }
}

/// Result of an update call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents that matched the filter.
    pub matched: u64,
    /// Documents whose content changed.
    pub modified: u64,
    /// Whether a new document was inserted.
    pub upserted: bool,
}

/// Collection-style document persistence.
#[async_trait]
pub trait DocumentStore: PluginAdapter {
    /// Returns the first matching document in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter)
    -> Result<Option<Value>, SnareError>;

    /// Returns the newest `limit` matching documents, oldest first.
    async fn find_latest(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Value>, SnareError>;

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), SnareError>;

    /// Atomically updates the first matching document. With `upsert`, a
    /// miss inserts a document built from the filter's equality conditions
    /// with the update applied.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, SnareError>;
}
