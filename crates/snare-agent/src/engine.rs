// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound text-message handling.
//!
//! Flow per message: load or create the session, persist the message,
//! classify until the scam is confirmed, let the conversational agent reply
//! once it is, then extract intelligence and run the lifecycle check in a
//! tracked background task. Everything up to the reply happens under the
//! session's lock.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use snare_core::session::{MESSAGES, SESSIONS};
use snare_core::{
    ChatMessage, ConversationAgent, DocumentStore, ExtractedEntity, ExtractedIntelligence, Filter,
    IntelligenceSink, ReportSink, ScamClassifier, SessionDocument, SessionId, SnareError, Speaker,
    StoredMessage, StructuredIntel, Tactic, Update,
};
use snare_intel::IntelligencePipeline;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::lifecycle::{LifecycleManager, now};

/// Messages of prior conversation handed to the classifier and agent.
pub const HISTORY_LIMIT: usize = 20;

/// One async mutex per session id. A lock is dropped from the map when its
/// last holder releases it and nobody is waiting.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the session.
    pub async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = Arc::clone(
            self.locks
                .entry(session_id.to_string())
                .or_default()
                .value(),
        );
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            locks: self,
            session_id: session_id.to_string(),
        }
    }

    /// Session ids currently holding or waiting on a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one session until dropped.
pub struct SessionGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a SessionLocks,
    session_id: String,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // New holders clone the Arc under the shard lock, so a count of one
        // here means no holder and no waiter.
        self.locks
            .locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Intelligence sink backed by the session document's
/// `extracted_intelligence`. The threat level is not stored here: for text
/// sessions `scam_score` belongs to the classifier.
pub struct DocumentIntelSink {
    store: Arc<dyn DocumentStore>,
    locks: Arc<SessionLocks>,
}

impl DocumentIntelSink {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<SessionLocks>) -> Self {
        Self { store, locks }
    }
}

#[async_trait]
impl IntelligenceSink for DocumentIntelSink {
    async fn merge_intelligence(
        &self,
        session_id: &SessionId,
        candidates: Vec<ExtractedEntity>,
        _threat_level: f64,
        _tactics: &[Tactic],
    ) -> Result<Vec<ExtractedEntity>, SnareError> {
        let _guard = self.locks.acquire(session_id.as_str()).await;
        let filter = Filter::session(session_id.as_str());
        let mut intel: ExtractedIntelligence = self
            .store
            .find_one(SESSIONS, &filter)
            .await?
            .and_then(|doc| doc.get("extracted_intelligence").cloned())
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let fresh: Vec<ExtractedEntity> = candidates
            .into_iter()
            .filter(|e| intel.insert(e.entity_type, &e.value))
            .collect();
        if fresh.is_empty() {
            return Ok(fresh);
        }

        let intel = serde_json::to_value(&intel)
            .map_err(|e| SnareError::Internal(format!("serialize intelligence: {e}")))?;
        let update = Update::new()
            .set("extracted_intelligence", intel)
            .set("last_updated", now());
        self.store.update_one(SESSIONS, &filter, &update, false).await?;
        Ok(fresh)
    }
}

/// Whether the session accepted the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Terminated,
}

/// Result handed back to the caller of [`MessageEngine::handle_message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    pub status: OutcomeStatus,
    pub reply: Option<String>,
}

impl MessageOutcome {
    fn terminated() -> Self {
        Self {
            status: OutcomeStatus::Terminated,
            reply: None,
        }
    }
}

/// Handles inbound text messages for any number of sessions.
pub struct MessageEngine {
    store: Arc<dyn DocumentStore>,
    classifier: Arc<dyn ScamClassifier>,
    agent: Arc<dyn ConversationAgent>,
    pipeline: IntelligencePipeline,
    lifecycle: Arc<LifecycleManager>,
    locks: Arc<SessionLocks>,
    sink: Arc<DocumentIntelSink>,
    tracker: TaskTracker,
    mission_context: String,
}

impl MessageEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        classifier: Arc<dyn ScamClassifier>,
        agent: Arc<dyn ConversationAgent>,
        reporter: Arc<dyn ReportSink>,
    ) -> Self {
        let locks = Arc::new(SessionLocks::new());
        Self {
            lifecycle: Arc::new(LifecycleManager::new(Arc::clone(&store), reporter)),
            sink: Arc::new(DocumentIntelSink::new(Arc::clone(&store), Arc::clone(&locks))),
            store,
            classifier,
            agent,
            pipeline: IntelligencePipeline::new(),
            locks,
            tracker: TaskTracker::new(),
            mission_context: String::new(),
        }
    }

    /// Replaces the rule-only pipeline, e.g. with one carrying an LLM extractor.
    pub fn with_pipeline(mut self, pipeline: IntelligencePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_mission_context(mut self, mission_context: impl Into<String>) -> Self {
        self.mission_context = mission_context.into();
        self
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Processes one inbound scammer message.
    ///
    /// Classifier and agent failures degrade to "no score" and "no reply".
    /// Only document store failures are returned as errors.
    pub async fn handle_message(
        &self,
        session_id: &str,
        text: &str,
        metadata: Option<Value>,
    ) -> Result<MessageOutcome, SnareError> {
        let _guard = self.locks.acquire(session_id).await;

        let session = self.load_or_create(session_id).await?;
        if session.is_terminated() {
            debug!(session_id, "message for terminated session ignored");
            return Ok(MessageOutcome::terminated());
        }

        let history = self.history(session_id).await?;
        let mut inbound = StoredMessage::new(session_id, Speaker::Scammer, text);
        inbound.metadata = metadata;
        self.store.insert_one(MESSAGES, to_json(&inbound)?).await?;

        let mut confirmed = session.is_confirmed_scam;
        let mut update = Update::new()
            .inc("message_count", 1)
            .set("last_updated", now());
        if !confirmed {
            match self.classifier.classify(text, &history).await {
                Ok(verdict) => {
                    update = update.set("scam_score", verdict.confidence);
                    if verdict.is_scam {
                        update = update.set("is_confirmed_scam", true);
                        confirmed = true;
                        info!(session_id, confidence = verdict.confidence, "scam confirmed");
                    }
                }
                Err(e) => warn!(session_id, error = %e, "classifier failed, score unchanged"),
            }
        }
        let filter = Filter::session(session_id);
        self.store.update_one(SESSIONS, &filter, &update, false).await?;

        let mut conversation = history;
        conversation.push(ChatMessage::new(Speaker::Scammer, text));

        let mut reply = None;
        let mut agent_intel = None;
        if confirmed {
            match self.agent.respond(&conversation, &self.mission_context).await {
                Ok(answer) if answer.reply.trim().is_empty() => {
                    warn!(session_id, "agent returned an empty reply");
                }
                Ok(answer) => {
                    let update = Update::new()
                        .inc("agent_state.turn_count", 1)
                        .set("agent_state.sentiment", answer.sentiment.as_str())
                        .set("agent_state.last_action", answer.strategy.as_str())
                        .set("agent_state.notes", answer.notes.as_str());
                    self.store.update_one(SESSIONS, &filter, &update, false).await?;
                    let outbound = StoredMessage::new(session_id, Speaker::Agent, &answer.reply);
                    self.store.insert_one(MESSAGES, to_json(&outbound)?).await?;
                    agent_intel = answer.extracted;
                    reply = Some(answer.reply);
                }
                Err(e) => warn!(session_id, error = %e, "agent failed, no reply this turn"),
            }
        }

        self.spawn_post_processing(session_id, text, conversation, agent_intel);
        Ok(MessageOutcome {
            status: OutcomeStatus::Success,
            reply,
        })
    }

    async fn load_or_create(&self, session_id: &str) -> Result<SessionDocument, SnareError> {
        match self
            .store
            .find_one(SESSIONS, &Filter::session(session_id))
            .await?
        {
            None => {
                let session = SessionDocument::new(session_id);
                self.store.insert_one(SESSIONS, to_json(&session)?).await?;
                info!(session_id, "session created");
                Ok(session)
            }
            Some(raw) => match serde_json::from_value(raw) {
                Ok(session) => Ok(session),
                Err(e) => {
                    warn!(session_id, error = %e, "stored session unreadable, resetting to fresh state");
                    self.reset_session(session_id).await
                }
            },
        }
    }

    /// Overwrites every field of the stored session with a fresh document,
    /// so later counter updates apply to well-typed values.
    async fn reset_session(&self, session_id: &str) -> Result<SessionDocument, SnareError> {
        let session = SessionDocument::new(session_id);
        let Value::Object(fields) = to_json(&session)? else {
            return Err(SnareError::Internal(
                "session document did not serialize to an object".into(),
            ));
        };
        let update = fields
            .into_iter()
            .fold(Update::new(), |update, (field, value)| update.set(&field, value));
        self.store
            .update_one(SESSIONS, &Filter::session(session_id), &update, true)
            .await?;
        Ok(session)
    }

    async fn history(&self, session_id: &str) -> Result<Vec<ChatMessage>, SnareError> {
        let docs = self
            .store
            .find_latest(MESSAGES, &Filter::session(session_id), HISTORY_LIMIT)
            .await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| serde_json::from_value::<StoredMessage>(doc).ok())
            .map(|m| ChatMessage {
                sender: m.sender,
                text: m.text,
                timestamp: m.timestamp,
            })
            .collect())
    }

    fn spawn_post_processing(
        &self,
        session_id: &str,
        text: &str,
        conversation: Vec<ChatMessage>,
        agent_intel: Option<StructuredIntel>,
    ) {
        let id = SessionId::from(session_id);
        let text = text.to_string();
        let pipeline = self.pipeline.clone();
        let sink = Arc::clone(&self.sink);
        let lifecycle = Arc::clone(&self.lifecycle);

        self.tracker.spawn(async move {
            match pipeline
                .process(sink.as_ref(), &id, &text, Speaker::Scammer, &conversation)
                .await
            {
                Ok(outcome) if !outcome.new_entities.is_empty() => {
                    info!(session_id = %id, new = outcome.new_entities.len(), "intelligence extracted");
                }
                Ok(_) => {}
                Err(e) => warn!(session_id = %id, error = %e, "extraction failed"),
            }
            if let Some(intel) = agent_intel
                && let Err(e) = pipeline
                    .process_agent_extracted(sink.as_ref(), &id, &intel)
                    .await
            {
                warn!(session_id = %id, error = %e, "agent intelligence not recorded");
            }
            if let Err(e) = lifecycle.check(id.as_str()).await {
                warn!(session_id = %id, error = %e, "lifecycle check failed");
            }
        });
    }

    /// Waits for every background task spawned so far.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stops accepting background work and waits for what is running.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("message engine drained");
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, SnareError> {
    serde_json::to_value(value).map_err(|e| SnareError::Internal(format!("serialize: {e}")))
}
