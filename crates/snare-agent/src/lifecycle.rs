// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report and terminate rules evaluated after every inbound message.
//!
//! The decision is a pure function of the stored session. Applying it goes
//! through filtered updates so two concurrent checks of the same session
//! cannot both report: the write that flips `is_reported` only matches while
//! the flag is still false, and only the caller whose write matched delivers
//! the report.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use snare_core::session::SESSIONS;
use snare_core::{DocumentStore, Filter, ReportSink, SessionDocument, SessionStatus, SnareError, Update};
use tracing::{debug, info, warn};

/// Message count at which a session is terminated.
pub const MAX_MESSAGES: u32 = 50;

/// Message count after which a confirmed scam must be reported.
pub const REPORT_AFTER_MESSAGES: u32 = 5;

/// Termination reason recorded for the message limit.
pub const MAX_MESSAGES_REASON: &str = "Max messages reached";

/// What the rules require for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleDecision {
    pub report: bool,
    pub terminate: Option<&'static str>,
}

impl LifecycleDecision {
    pub fn is_noop(&self) -> bool {
        !self.report && self.terminate.is_none()
    }
}

/// Evaluates the report and max-messages rules against a stored session.
pub fn evaluate(session: &SessionDocument) -> LifecycleDecision {
    let report = session.is_confirmed_scam
        && session.message_count >= REPORT_AFTER_MESSAGES
        && session.status == SessionStatus::Active
        && !session.is_reported;
    let terminate = (session.message_count >= MAX_MESSAGES && !session.is_terminated())
        .then_some(MAX_MESSAGES_REASON);
    LifecycleDecision { report, terminate }
}

/// Applies [`evaluate`] to stored sessions.
pub struct LifecycleManager {
    store: Arc<dyn DocumentStore>,
    reporter: Arc<dyn ReportSink>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, reporter: Arc<dyn ReportSink>) -> Self {
        Self { store, reporter }
    }

    /// Checks one session and applies whatever the rules require.
    ///
    /// Returns the transitions this call actually performed. A transition
    /// another caller already made is not repeated, so calling this any
    /// number of times delivers at most one report per session.
    pub async fn check(&self, session_id: &str) -> Result<LifecycleDecision, SnareError> {
        let Some(raw) = self
            .store
            .find_one(SESSIONS, &Filter::session(session_id))
            .await?
        else {
            debug!(session_id, "lifecycle check on unknown session");
            return Ok(LifecycleDecision::default());
        };
        let session: SessionDocument = match serde_json::from_value(raw) {
            Ok(session) => session,
            Err(e) => {
                warn!(session_id, error = %e, "stored session unreadable, skipping lifecycle check");
                return Ok(LifecycleDecision::default());
            }
        };

        let wanted = evaluate(&session);
        let mut applied = LifecycleDecision::default();

        if wanted.report {
            applied.report = self.report_once(session_id).await?;
        }
        if let Some(reason) = wanted.terminate
            && self.terminate(session_id, reason).await?
        {
            applied.terminate = Some(reason);
        }
        Ok(applied)
    }

    /// Marks the session reported, then delivers the re-read document. Only
    /// the caller whose mark matched goes on to deliver.
    async fn report_once(&self, session_id: &str) -> Result<bool, SnareError> {
        let filter = Filter::session(session_id)
            .eq("is_reported", false)
            .eq("status", SessionStatus::Active.to_string());
        let update = Update::new()
            .set("status", SessionStatus::Reported.to_string())
            .set("is_reported", true)
            .set("last_updated", now());
        let outcome = self.store.update_one(SESSIONS, &filter, &update, false).await?;
        if outcome.matched == 0 {
            debug!(session_id, "session already reported by a concurrent check");
            return Ok(false);
        }
        info!(session_id, "session met reporting criteria, sending report");

        let marked = self
            .store
            .find_one(SESSIONS, &Filter::session(session_id))
            .await?
            .ok_or_else(|| SnareError::NotFound(format!("session {session_id}")))?;
        let marked: SessionDocument = serde_json::from_value(marked)
            .map_err(|e| SnareError::Internal(format!("reported session unreadable: {e}")))?;

        match self.reporter.send_report(&marked).await {
            Ok(()) => {
                metrics::counter!("snare_reports_sent_total").increment(1);
                info!(session_id, reporter = self.reporter.name(), "report delivered");
            }
            Err(e) => warn!(session_id, error = %e, "report delivery failed"),
        }
        Ok(true)
    }

    async fn terminate(&self, session_id: &str, reason: &str) -> Result<bool, SnareError> {
        let filter = Filter::session(session_id).ne("status", SessionStatus::Terminated.to_string());
        let update = Update::new()
            .set("status", SessionStatus::Terminated.to_string())
            .set("termination_reason", reason)
            .set("last_updated", now());
        let outcome = self.store.update_one(SESSIONS, &filter, &update, false).await?;
        if outcome.matched == 0 {
            return Ok(false);
        }
        metrics::counter!("snare_sessions_terminated_total").increment(1);
        info!(session_id, reason, "session terminated");
        Ok(true)
    }
}

pub(crate) fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}
