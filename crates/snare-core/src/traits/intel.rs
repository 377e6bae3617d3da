// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session intelligence sink.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::types::{ExtractedEntity, SessionId, Tactic};

/// Owner of per-session entity state.
///
/// Implementations apply dedup, threat max-merge, and tactic union
/// atomically under the session's lock.
#[async_trait]
pub trait IntelligenceSink: Send + Sync + 'static {
    /// Merges candidates into the session. Returns only the entities that
    /// were new to the session, in candidate order.
    async fn merge_intelligence(
        &self,
        session_id: &SessionId,
        candidates: Vec<ExtractedEntity>,
        threat_level: f64,
        tactics: &[Tactic],
    ) -> Result<Vec<ExtractedEntity>, SnareError>;
}
