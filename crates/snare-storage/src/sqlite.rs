// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed document store.
//!
//! Documents are JSON text in a single `documents` table. All access goes
//! through tokio-rusqlite's single background thread, so each
//! `update_one` is an atomic read-modify-write.

use async_trait::async_trait;
use serde_json::Value;
use snare_config::model::StorageConfig;
use snare_core::traits::Condition;
use snare_core::{
    AdapterType, DocumentStore, Filter, HealthStatus, PluginAdapter, SnareError, Update,
    UpdateOutcome,
};
use tracing::{debug, info};

use crate::document::{apply_update, matches, seed_from_filter};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Failures raised on the database thread.
#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error(transparent)]
    Update(#[from] SnareError),
}

fn map_tr_err(e: tokio_rusqlite::Error<StoreError>) -> SnareError {
    SnareError::storage(e.to_string())
}

pub struct SqliteDocumentStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteDocumentStore {
    /// Opens (creating if needed) the database, applies pragmas, and runs
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, SnareError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(SnareError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SnareError::storage(e.to_string()))?;

        conn.call(move |conn| -> Result<(), StoreError> {
            if wal_mode {
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute_batch("PRAGMA busy_timeout = 5000; PRAGMA synchronous = NORMAL;")?;
            embedded::migrations::runner()
                .run(conn)
                .map_err(|e| StoreError::Migration(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = %path, wal_mode, "document store opened");
        Ok(Self { conn })
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, SnareError> {
        Self::open(&config.database_path, config.wal_mode).await
    }

    /// Flushes the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), SnareError> {
        self.conn
            .call(|conn| -> Result<(), StoreError> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// SQL prefilter for string equality conditions. Rows it returns are
/// re-checked with [`matches`], so it only has to be a superset.
fn prefilter(filter: &Filter) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut params = Vec::new();
    for condition in &filter.conditions {
        if let Condition::Eq(path, Value::String(value)) = condition {
            let n = params.len() + 2;
            clause.push_str(&format!(" AND json_extract(body, ?{n}) = ?{}", n + 1));
            params.push(format!("$.{path}"));
            params.push(value.clone());
        }
    }
    (clause, params)
}

/// Candidate rows in a collection, in the requested id order.
fn candidates(
    conn: &rusqlite::Connection,
    collection: &str,
    filter: &Filter,
    newest_first: bool,
) -> Result<Vec<(i64, Value)>, StoreError> {
    let (clause, extra) = prefilter(filter);
    let order = if newest_first { "DESC" } else { "ASC" };
    let sql = format!(
        "SELECT id, body FROM documents WHERE collection = ?1{clause} ORDER BY id {order}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = std::iter::once(&collection as &dyn rusqlite::ToSql)
        .chain(extra.iter().map(|p| p as &dyn rusqlite::ToSql))
        .collect();
    let rows = stmt.query_map(params.as_slice(), |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, body) = row?;
        let doc: Value = serde_json::from_str(&body)?;
        if matches(&doc, filter) {
            out.push((id, doc));
        }
    }
    Ok(out)
}

#[async_trait]
impl PluginAdapter for SqliteDocumentStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::DocumentStore
    }

    async fn health_check(&self) -> Result<HealthStatus, SnareError> {
        self.conn
            .call(|conn| -> Result<(), StoreError> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>, SnareError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.conn
            .call(move |conn| -> Result<Option<Value>, StoreError> {
                Ok(candidates(conn, &collection, &filter, false)?
                    .into_iter()
                    .next()
                    .map(|(_, doc)| doc))
            })
            .await
            .map_err(map_tr_err)
    }

    async fn find_latest(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
    ) -> Result<Vec<Value>, SnareError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        self.conn
            .call(move |conn| -> Result<Vec<Value>, StoreError> {
                let mut newest: Vec<Value> = candidates(conn, &collection, &filter, true)?
                    .into_iter()
                    .take(limit)
                    .map(|(_, doc)| doc)
                    .collect();
                newest.reverse();
                Ok(newest)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), SnareError> {
        let collection = collection.to_string();
        let body = document.to_string();
        self.conn
            .call(move |conn| -> Result<(), StoreError> {
                conn.execute(
                    "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                    rusqlite::params![collection, body],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateOutcome, SnareError> {
        let collection = collection.to_string();
        let filter = filter.clone();
        let update = update.clone();
        self.conn
            .call(move |conn| -> Result<UpdateOutcome, StoreError> {
                let tx = conn.transaction()?;
                let found = candidates(&tx, &collection, &filter, false)?.into_iter().next();

                let outcome = match found {
                    Some((id, mut doc)) => {
                        let modified = apply_update(&mut doc, &update)?;
                        if modified {
                            tx.execute(
                                "UPDATE documents SET body = ?1 WHERE id = ?2",
                                rusqlite::params![doc.to_string(), id],
                            )?;
                        }
                        UpdateOutcome {
                            matched: 1,
                            modified: u64::from(modified),
                            upserted: false,
                        }
                    }
                    None if upsert => {
                        let mut doc = seed_from_filter(&filter)?;
                        apply_update(&mut doc, &update)?;
                        tx.execute(
                            "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                            rusqlite::params![collection, doc.to_string()],
                        )?;
                        UpdateOutcome {
                            matched: 0,
                            modified: 0,
                            upserted: true,
                        }
                    }
                    None => UpdateOutcome::default(),
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)
    }
}

