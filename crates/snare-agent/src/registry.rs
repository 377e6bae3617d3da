// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of live-call sessions.
//!
//! The registry is the source of truth for a call while it is active. Each
//! session sits behind its own async mutex, so mutations of one call are
//! totally ordered and never contend with another call. Documents in the
//! store are written as a side effect and a failed write only degrades
//! persistence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use snare_core::session::SESSIONS;
use snare_core::{
    DocumentStore, EntityLedger, ExtractedEntity, ExtractedIntelligence, Filter,
    IntelligenceSink, LiveMeta, ModeSwitch, SessionDocument, SessionId, SessionStatus,
    SnareError, Speaker, Tactic, TakeoverMode, TranscriptEntry, Update, UrlScanResult,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::lifecycle::now;

/// Termination reason recorded when a call ends normally.
pub const CALL_ENDED_REASON: &str = "Call ended";

/// Parameters for a new live session.
#[derive(Debug, Clone)]
pub struct NewLiveSession {
    pub original_session_id: Option<String>,
    pub voice_clone_id: Option<String>,
    pub mode: TakeoverMode,
    pub language: String,
}

impl Default for NewLiveSession {
    fn default() -> Self {
        Self {
            original_session_id: None,
            voice_clone_id: None,
            mode: TakeoverMode::AiCoached,
            language: "en".to_string(),
        }
    }
}

/// In-memory state of one live call.
#[derive(Debug, Clone)]
pub struct LiveSessionState {
    pub id: SessionId,
    pub original_session_id: Option<String>,
    pub voice_clone_id: Option<String>,
    pub mode: TakeoverMode,
    pub status: SessionStatus,
    pub language: String,
    pub transcript: Vec<TranscriptEntry>,
    /// Incremented on every scammer utterance.
    pub turn_count: u32,
    pub entities: EntityLedger,
    /// Never decreases.
    pub threat_level: f64,
    pub tactics: BTreeSet<Tactic>,
    pub url_scan_results: BTreeMap<String, UrlScanResult>,
    pub mode_switches: Vec<ModeSwitch>,
    pub started_at: DateTime<Utc>,
}

impl LiveSessionState {
    fn new(id: SessionId, params: NewLiveSession) -> Self {
        Self {
            id,
            original_session_id: params.original_session_id,
            voice_clone_id: params.voice_clone_id,
            mode: params.mode,
            status: SessionStatus::Active,
            language: params.language,
            transcript: Vec::new(),
            turn_count: 0,
            entities: EntityLedger::new(),
            threat_level: 0.0,
            tactics: BTreeSet::new(),
            url_scan_results: BTreeMap::new(),
            mode_switches: Vec::new(),
            started_at: Utc::now(),
        }
    }

    fn live_meta(&self) -> LiveMeta {
        LiveMeta {
            original_session_id: self.original_session_id.clone(),
            voice_clone_id: self.voice_clone_id.clone(),
            mode: self.mode,
            language: self.language.clone(),
            mode_switches: self.mode_switches.clone(),
        }
    }

    fn document(&self) -> SessionDocument {
        let mut doc = SessionDocument::new(self.id.as_str());
        doc.created_at = self.started_at;
        doc.live = Some(self.live_meta());
        doc
    }

    /// Absorbs the threat level and tactics, then admits the candidates.
    /// Returns only the entities new to this session.
    fn merge(
        &mut self,
        candidates: Vec<ExtractedEntity>,
        threat_level: f64,
        tactics: &[Tactic],
    ) -> Vec<ExtractedEntity> {
        self.threat_level = self.threat_level.max(threat_level);
        self.tactics.extend(tactics.iter().copied());
        candidates
            .into_iter()
            .filter(|e| self.entities.admit(e.clone()))
            .collect()
    }
}

/// Summary returned when a live session ends.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub original_session_id: Option<String>,
    pub voice_clone_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub turn_count: u32,
    pub final_mode: TakeoverMode,
    pub transcript: Vec<TranscriptEntry>,
    pub entities: Vec<ExtractedEntity>,
    pub extracted_intelligence: ExtractedIntelligence,
    pub threat_level: f64,
    pub tactics: Vec<Tactic>,
    pub url_scan_results: Vec<UrlScanResult>,
    pub mode_switches: Vec<ModeSwitch>,
}

impl SessionReport {
    fn from_state(state: LiveSessionState) -> Self {
        let ended_at = Utc::now();
        Self {
            session_id: state.id.0.clone(),
            extracted_intelligence: state.entities.to_intelligence(),
            duration_secs: (ended_at - state.started_at).num_seconds(),
            original_session_id: state.original_session_id,
            voice_clone_id: state.voice_clone_id,
            started_at: state.started_at,
            ended_at,
            turn_count: state.turn_count,
            final_mode: state.mode,
            transcript: state.transcript,
            entities: state.entities.entities().to_vec(),
            threat_level: state.threat_level,
            tactics: state.tactics.into_iter().collect(),
            url_scan_results: state.url_scan_results.into_values().collect(),
            mode_switches: state.mode_switches,
        }
    }
}

/// Process-wide map of active live sessions.
///
/// Construct one at startup and share it by `Arc`; call
/// [`shutdown`](Self::shutdown) before exit to persist every open call.
pub struct LiveSessionRegistry {
    sessions: DashMap<String, Arc<Mutex<LiveSessionState>>>,
    store: Arc<dyn DocumentStore>,
}

impl LiveSessionRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
        }
    }

    fn slot(&self, id: &SessionId) -> Result<Arc<Mutex<LiveSessionState>>, SnareError> {
        self.sessions
            .get(id.as_str())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SnareError::NotFound(format!("live session {id}")))
    }

    /// Opens a session with a fresh `live-` id and persists its document.
    pub async fn create_session(&self, params: NewLiveSession) -> Result<SessionId, SnareError> {
        let id = SessionId(new_live_id());
        let state = LiveSessionState::new(id.clone(), params);
        let document = serde_json::to_value(state.document())
            .map_err(|e| SnareError::Internal(format!("session document: {e}")))?;
        self.store.insert_one(SESSIONS, document).await?;

        info!(session_id = %id, mode = %state.mode, language = %state.language, "live session created");
        self.sessions
            .insert(id.0.clone(), Arc::new(Mutex::new(state)));
        Ok(id)
    }

    /// A copy of the session's current state.
    pub async fn get(&self, id: &SessionId) -> Option<LiveSessionState> {
        let slot = self.slot(id).ok()?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Current takeover mode, if the session is open.
    pub async fn mode(&self, id: &SessionId) -> Option<TakeoverMode> {
        let slot = self.slot(id).ok()?;
        let mode = slot.lock().await.mode;
        Some(mode)
    }

    /// Switches the takeover mode of an active session.
    ///
    /// Returns false when the session is not active or already in `to`.
    pub async fn switch_mode(&self, id: &SessionId, to: TakeoverMode) -> Result<bool, SnareError> {
        let slot = self.slot(id)?;
        let mut state = slot.lock().await;
        if state.status != SessionStatus::Active || state.mode == to {
            return Ok(false);
        }
        let switch = ModeSwitch {
            from: state.mode,
            to,
            at: Utc::now(),
            turn: state.turn_count,
        };
        state.mode = to;
        state.mode_switches.push(switch.clone());
        info!(session_id = %id, from = %switch.from, to = %switch.to, turn = switch.turn, "takeover mode switched");

        let update = Update::new()
            .set("live.mode", to.to_string())
            .set("last_updated", now())
            .push("live.mode_switches", to_json(&switch)?);
        self.persist(id, update).await;
        Ok(true)
    }

    /// Appends a transcript line. Scammer lines advance the turn counter.
    pub async fn add_transcript(
        &self,
        id: &SessionId,
        speaker: Speaker,
        text: &str,
        confidence: f64,
    ) -> Result<TranscriptEntry, SnareError> {
        let slot = self.slot(id)?;
        let mut state = slot.lock().await;
        if speaker == Speaker::Scammer {
            state.turn_count += 1;
        }
        let entry = TranscriptEntry {
            speaker,
            text: text.to_string(),
            confidence,
            timestamp: Utc::now(),
            turn: state.turn_count,
        };
        state.transcript.push(entry.clone());
        Ok(entry)
    }

    /// The last `window` transcript entries.
    pub async fn recent_transcript(
        &self,
        id: &SessionId,
        window: usize,
    ) -> Result<Vec<TranscriptEntry>, SnareError> {
        let slot = self.slot(id)?;
        let state = slot.lock().await;
        let start = state.transcript.len().saturating_sub(window);
        Ok(state.transcript[start..].to_vec())
    }

    /// Records aggregated URL verdicts against the session.
    pub async fn record_url_scans(
        &self,
        id: &SessionId,
        results: &[UrlScanResult],
    ) -> Result<(), SnareError> {
        let slot = self.slot(id)?;
        let mut state = slot.lock().await;
        for result in results {
            state
                .url_scan_results
                .insert(result.url.clone(), result.clone());
        }
        Ok(())
    }

    /// Closes the session, persists its final intelligence, and removes it.
    pub async fn end_session(&self, id: &SessionId) -> Result<SessionReport, SnareError> {
        let slot = self.slot(id)?;
        let mut state = slot.lock().await;
        if state.status == SessionStatus::Terminated {
            return Err(SnareError::NotFound(format!("live session {id}")));
        }
        state.status = SessionStatus::Terminated;
        let report = SessionReport::from_state(state.clone());
        drop(state);
        self.sessions.remove(id.as_str());

        let update = Update::new()
            .set("status", SessionStatus::Terminated.to_string())
            .set("termination_reason", CALL_ENDED_REASON)
            .set("scam_score", report.threat_level)
            .set("message_count", report.turn_count)
            .set("live.mode", report.final_mode.to_string())
            .set("extracted_intelligence", to_json(&report.extracted_intelligence)?)
            .set("last_updated", now());
        self.persist(id, update).await;

        info!(
            session_id = %id,
            turns = report.turn_count,
            entities = report.entities.len(),
            threat_level = report.threat_level,
            duration_secs = report.duration_secs,
            "live session ended"
        );
        Ok(report)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn list_active(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .iter()
            .map(|entry| SessionId(entry.key().clone()))
            .collect();
        ids.sort();
        ids
    }

    /// Ends every open session.
    pub async fn shutdown(&self) -> Vec<SessionReport> {
        let ids = self.list_active();
        if ids.is_empty() {
            return Vec::new();
        }
        info!(count = ids.len(), "ending open live sessions");
        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            match self.end_session(&id).await {
                Ok(report) => reports.push(report),
                Err(e) => debug!(session_id = %id, error = %e, "session already gone"),
            }
        }
        reports
    }

    async fn persist(&self, id: &SessionId, update: Update) {
        if let Err(e) = self
            .store
            .update_one(SESSIONS, &Filter::session(id.as_str()), &update, false)
            .await
        {
            warn!(session_id = %id, error = %e, "failed to persist live session");
        }
    }
}

#[async_trait]
impl IntelligenceSink for LiveSessionRegistry {
    async fn merge_intelligence(
        &self,
        session_id: &SessionId,
        candidates: Vec<ExtractedEntity>,
        threat_level: f64,
        tactics: &[Tactic],
    ) -> Result<Vec<ExtractedEntity>, SnareError> {
        let slot = self.slot(session_id)?;
        let mut state = slot.lock().await;
        let fresh = state.merge(candidates, threat_level, tactics);
        if !fresh.is_empty() {
            debug!(
                session_id = %session_id,
                new = fresh.len(),
                total = state.entities.len(),
                threat_level = state.threat_level,
                "live intelligence updated"
            );
        }
        Ok(fresh)
    }
}

/// `live-` followed by ten hex characters.
fn new_live_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("live-{}", &hex[..10])
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, SnareError> {
    serde_json::to_value(value).map_err(|e| SnareError::Internal(format!("serialize: {e}")))
}
