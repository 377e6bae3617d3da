// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted session records.
//!
//! These are the shapes written to the document store. The in-memory live
//! session state lives with the registry that owns it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ExtractedIntelligence, ModeSwitch, SessionStatus, Speaker, TakeoverMode};

/// Collection holding one document per session.
pub const SESSIONS: &str = "sessions";
/// Collection holding conversation messages.
pub const MESSAGES: &str = "messages";
/// Collection holding live-call transcripts.
pub const LIVE_CALLS: &str = "live_calls";

/// Conversational agent bookkeeping kept on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub turn_count: u32,
    pub sentiment: String,
    pub last_action: String,
    pub notes: String,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            turn_count: 0,
            sentiment: "neutral".into(),
            last_action: "listen".into(),
            notes: String::new(),
        }
    }
}

/// Live-call fields carried by sessions created for a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMeta {
    pub original_session_id: Option<String>,
    pub voice_clone_id: Option<String>,
    pub mode: TakeoverMode,
    pub language: String,
    #[serde(default)]
    pub mode_switches: Vec<ModeSwitch>,
}

/// The root aggregate of one engagement, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session_id: String,
    pub status: SessionStatus,
    pub message_count: u32,
    pub scam_score: f64,
    pub is_confirmed_scam: bool,
    pub is_reported: bool,
    #[serde(default)]
    pub agent_state: AgentState,
    #[serde(default)]
    pub extracted_intelligence: ExtractedIntelligence,
    #[serde(default)]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub live: Option<LiveMeta>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl SessionDocument {
    /// A fresh, unconfirmed session.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Active,
            message_count: 0,
            scam_score: 0.0,
            is_confirmed_scam: false,
            is_reported: false,
            agent_state: AgentState::default(),
            extracted_intelligence: ExtractedIntelligence::default(),
            termination_reason: None,
            live: None,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.status == SessionStatus::Terminated
    }
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub sender: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied channel metadata, stored as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl StoredMessage {
    pub fn new(session_id: impl Into<String>, sender: Speaker, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_defaults() {
        let doc = SessionDocument::new("s-1");
        assert_eq!(doc.status, SessionStatus::Active);
        assert_eq!(doc.agent_state.sentiment, "neutral");
        assert_eq!(doc.agent_state.last_action, "listen");
        assert!(!doc.is_confirmed_scam);
        assert!(!doc.is_reported);
    }

    #[test]
    fn status_serializes_lowercase() {
        let doc = SessionDocument::new("s-1");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["agent_state"]["turn_count"], 0);
    }

    #[test]
    fn malformed_document_fails_to_parse() {
        let json = serde_json::json!({ "session_id": "s-1", "status": 42 });
        assert!(serde_json::from_value::<SessionDocument>(json).is_err());
    }
}
