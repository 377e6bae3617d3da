// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end message-flow testing.
//!
//! `TestHarness` assembles a [`MessageEngine`] over mock collaborators and a
//! document store (in-memory by default, or a temp SQLite database). It
//! provides `send_message()` to drive the full text flow in tests.

use std::sync::Arc;

use snare_agent::{MessageEngine, MessageOutcome};
use snare_core::session::SESSIONS;
use snare_core::{DocumentStore, Filter, SessionDocument, SnareError};
use snare_storage::{MemoryDocumentStore, SqliteDocumentStore};

use crate::mock_adapters::RecordingReportSink;
use crate::mock_provider::{MockAgent, MockClassifier};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    classifier: MockClassifier,
    mission_context: String,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            replies: Vec::new(),
            classifier: MockClassifier::scam(0.95),
            mission_context: "Keep the caller engaged and collect payment details.".to_string(),
            sqlite: false,
        }
    }

    /// Set mock agent replies.
    pub fn with_replies(mut self, replies: Vec<String>) -> Self {
        self.replies = replies;
        self
    }

    /// Replace the classifier (a confident scam verdict by default).
    pub fn with_classifier(mut self, classifier: MockClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_mission_context(mut self, mission_context: &str) -> Self {
        self.mission_context = mission_context.to_string();
        self
    }

    /// Back the harness with a temp SQLite database instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SnareError> {
        let (store, temp_dir): (Arc<dyn DocumentStore>, _) = if self.sqlite {
            let temp_dir = tempfile::TempDir::new().map_err(SnareError::storage)?;
            let db_path = temp_dir.path().join("test.db");
            let store = SqliteDocumentStore::open(&db_path.to_string_lossy(), true).await?;
            (Arc::new(store), Some(temp_dir))
        } else {
            (Arc::new(MemoryDocumentStore::new()), None)
        };

        let classifier = Arc::new(self.classifier);
        let agent = Arc::new(MockAgent::with_replies(self.replies));
        let reporter = Arc::new(RecordingReportSink::new());
        let engine = MessageEngine::new(
            Arc::clone(&store),
            classifier.clone(),
            agent.clone(),
            reporter.clone(),
        )
        .with_mission_context(self.mission_context);

        Ok(TestHarness {
            store,
            classifier,
            agent,
            reporter,
            engine: Arc::new(engine),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators.
pub struct TestHarness {
    /// Document store (memory, or temp SQLite cleaned up on drop).
    pub store: Arc<dyn DocumentStore>,
    pub classifier: Arc<MockClassifier>,
    pub agent: Arc<MockAgent>,
    /// Receives mandatory reports.
    pub reporter: Arc<RecordingReportSink>,
    pub engine: Arc<MessageEngine>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Sends one scammer message and waits for its background extraction
    /// and lifecycle check to finish.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageOutcome, SnareError> {
        let outcome = self.engine.handle_message(session_id, text, None).await?;
        self.engine.settle().await;
        Ok(outcome)
    }

    /// Current stored state of a session, if any.
    pub async fn session(&self, session_id: &str) -> Result<Option<SessionDocument>, SnareError> {
        let Some(raw) = self
            .store
            .find_one(SESSIONS, &Filter::session(session_id))
            .await?
        else {
            return Ok(None);
        };
        serde_json::from_value(raw)
            .map(Some)
            .map_err(|e| SnareError::Internal(format!("unreadable session {session_id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use snare_agent::OutcomeStatus;
    use snare_core::SessionStatus;

    use super::*;

    #[tokio::test]
    async fn send_message_returns_agent_reply() {
        let harness = TestHarness::builder()
            .with_replies(vec!["which bank sir?".to_string()])
            .build()
            .await
            .unwrap();

        let outcome = harness.send_message("s-1", "your card is blocked").await.unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.reply.as_deref(), Some("which bank sir?"));
        assert_eq!(harness.agent.histories().await.len(), 1);
    }

    #[tokio::test]
    async fn benign_classifier_keeps_agent_silent() {
        let harness = TestHarness::builder()
            .with_classifier(MockClassifier::benign(0.2))
            .build()
            .await
            .unwrap();

        let outcome = harness.send_message("s-1", "hello").await.unwrap();
        assert_eq!(outcome.reply, None);
        assert!(harness.agent.histories().await.is_empty());
        let session = harness.session("s-1").await.unwrap().unwrap();
        assert!(!session.is_confirmed_scam);
    }

    #[tokio::test]
    async fn sqlite_harness_reports_once() {
        let harness = TestHarness::builder().with_sqlite().build().await.unwrap();
        for i in 0..7 {
            harness
                .send_message("s-1", &format!("pay to 98765432{i}0 now"))
                .await
                .unwrap();
        }

        assert_eq!(harness.reporter.count().await, 1);
        let session = harness.session("s-1").await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Reported);
        assert_eq!(harness.classifier.calls(), 1);
    }

    #[tokio::test]
    async fn harnesses_do_not_share_storage() {
        let h1 = TestHarness::builder().with_sqlite().build().await.unwrap();
        let h2 = TestHarness::builder().with_sqlite().build().await.unwrap();

        h1.send_message("s-1", "msg1").await.unwrap();
        assert!(h1.session("s-1").await.unwrap().is_some());
        assert!(h2.session("s-1").await.unwrap().is_none());
    }
}
