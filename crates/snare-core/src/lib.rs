// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Snare scam-engagement honeypot.
//!
//! This crate provides the error type, the domain types (entities,
//! sessions, transcripts, scan results), and the collaborator traits that
//! the extraction, transcription, URL scanning, and lifecycle crates are
//! written against.

pub mod error;
pub mod session;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SnareError;
pub use session::{AgentState, LiveMeta, SessionDocument, StoredMessage};
pub use types::{
    AdapterType, AgentReply, AudioFormat, ChatMessage, EntityLedger, EntityType,
    ExtractedEntity, ExtractedIntelligence, HealthStatus, ModeSwitch, ScamVerdict,
    ScannerVerdict, SessionId, SessionStatus, Speaker, StructuredIntel, Tactic, TakeoverMode,
    TranscriptEntry, Transcription, UrlScanResult,
};

// Re-export all collaborator traits at crate root.
pub use traits::{
    ConversationAgent, DocumentStore, Filter, IntelExtractor, IntelligenceSink, ObjectStore,
    PluginAdapter, ReportSink, ScamClassifier, Transcriber, Update, UpdateOutcome, UrlScanner,
};
