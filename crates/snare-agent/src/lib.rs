// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for the Snare honeypot.
//!
//! - [`MessageEngine`] handles inbound text messages: classification, agent
//!   replies, background extraction, and the lifecycle check.
//! - [`LifecycleManager`] applies the report-once and max-messages rules.
//! - [`LiveSessionRegistry`] owns the state of live calls, and [`LiveCall`]
//!   wires transcription, extraction, URL scanning, and the AI takeover loop
//!   for one call.

pub mod engine;
pub mod lifecycle;
pub mod live;
pub mod registry;
pub mod report;

pub use engine::{
    DocumentIntelSink, MessageEngine, MessageOutcome, OutcomeStatus, SessionGuard, SessionLocks,
};
pub use lifecycle::{
    LifecycleDecision, LifecycleManager, MAX_MESSAGES, MAX_MESSAGES_REASON,
    REPORT_AFTER_MESSAGES, evaluate,
};
pub use live::{CallEvent, CallStats, LiveCall, LiveServices};
pub use registry::{LiveSessionRegistry, LiveSessionState, NewLiveSession, SessionReport};
pub use report::{LoggingReporter, WebhookReporter, reporter_from_config};
