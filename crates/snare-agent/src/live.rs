// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One live call: per-speaker transcription, intelligence extraction, URL
//! scanning, and the AI takeover loop.
//!
//! Everything the call spawns goes onto its own [`TaskTracker`], and the AI
//! loop runs under a [`CancellationToken`] that is a child of the call's
//! token. [`LiveCall::end`] cancels the loop, drains both transcribers, and
//! waits for the tracked work before the session is closed, so no task
//! outlives the call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde::Serialize;
use snare_config::model::LiveConfig;
use snare_core::session::LIVE_CALLS;
use snare_core::{
    AgentReply, ChatMessage, ConversationAgent, DocumentStore, ExtractedEntity, Filter,
    SessionId, SnareError, Speaker, Tactic, TakeoverMode, Transcriber, TranscriptEntry, Update,
    UrlScanResult,
};
use snare_intel::IntelligencePipeline;
use snare_stt::{BufferSettings, BufferStats, StreamingTranscriber, TranscriptSegment};
use snare_urlscan::UrlRiskAggregator;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::lifecycle::now;
use crate::registry::{LiveSessionRegistry, NewLiveSession, SessionReport};

/// Brief appended to the mission context when asking for operator coaching.
const COACHING_BRIEF: &str = "You are coaching a human operator who is speaking to the caller. \
     Suggest the operator's next line and the tactic behind it.";

/// Something the operator console should see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CallEvent {
    Transcript {
        entry: TranscriptEntry,
        language: String,
    },
    Intelligence {
        entities: Vec<ExtractedEntity>,
        threat_level: f64,
        tactics: Vec<Tactic>,
    },
    UrlScan {
        result: UrlScanResult,
    },
    AiResponse {
        text: String,
    },
    Coaching {
        suggestion: String,
        strategy: String,
    },
    AiError {
        error: String,
    },
    ModeChanged {
        mode: TakeoverMode,
    },
}

/// Shared collaborators for every call in the process.
pub struct LiveServices {
    pub registry: Arc<LiveSessionRegistry>,
    pub store: Arc<dyn DocumentStore>,
    pub transcriber: Arc<dyn Transcriber>,
    pub agent: Arc<dyn ConversationAgent>,
    pub pipeline: IntelligencePipeline,
    pub scanner: Arc<UrlRiskAggregator>,
    pub buffer: BufferSettings,
    pub live: LiveConfig,
    pub mission_context: String,
}

/// Buffer counters for both sides of a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallStats {
    pub scammer: BufferStats,
    pub operator: BufferStats,
}

#[derive(Serialize)]
struct StoredLine<'a> {
    #[serde(flatten)]
    entry: &'a TranscriptEntry,
    language: &'a str,
}

pub struct LiveCall {
    id: SessionId,
    language: String,
    services: Arc<LiveServices>,
    scammer: Mutex<StreamingTranscriber>,
    operator: Mutex<StreamingTranscriber>,
    events: mpsc::UnboundedSender<CallEvent>,
    queue_tx: mpsc::UnboundedSender<String>,
    queue_rx: Mutex<mpsc::UnboundedReceiver<String>>,
    ai_loop: StdMutex<Option<CancellationToken>>,
    cancel: CancellationToken,
    ending: AtomicBool,
    tracker: TaskTracker,
}

impl LiveCall {
    /// Opens a live session and returns the call with its event stream.
    /// The AI loop starts immediately when `params.mode` is takeover.
    pub async fn start(
        services: Arc<LiveServices>,
        params: NewLiveSession,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<CallEvent>), SnareError> {
        let mode = params.mode;
        let language = params.language.clone();
        let id = services.registry.create_session(params).await?;

        let (events, events_rx) = mpsc::unbounded_channel();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let transcriber = || {
            Mutex::new(StreamingTranscriber::new(
                Arc::clone(&services.transcriber),
                services.buffer.clone(),
                None,
            ))
        };
        let call = Arc::new(Self {
            id,
            language,
            scammer: transcriber(),
            operator: transcriber(),
            services,
            events,
            queue_tx,
            queue_rx: Mutex::new(queue_rx),
            ai_loop: StdMutex::new(None),
            cancel: CancellationToken::new(),
            ending: AtomicBool::new(false),
            tracker: TaskTracker::new(),
        });
        if mode == TakeoverMode::AiTakeover {
            call.start_ai_loop();
        }
        Ok((call, events_rx))
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub async fn mode(&self) -> Option<TakeoverMode> {
        self.services.registry.mode(&self.id).await
    }

    fn buffer_for(&self, speaker: Speaker) -> Option<&Mutex<StreamingTranscriber>> {
        match speaker {
            Speaker::Scammer => Some(&self.scammer),
            Speaker::Operator => Some(&self.operator),
            Speaker::Agent => None,
        }
    }

    /// Feeds one audio chunk from `speaker`.
    ///
    /// Returns the transcript entry when the chunk completed a window that
    /// produced text. Empty and oversized chunks are ignored.
    pub async fn push_audio(
        self: &Arc<Self>,
        speaker: Speaker,
        audio: Vec<u8>,
        duration_ms: Option<f64>,
    ) -> Option<TranscriptEntry> {
        if audio.is_empty() {
            debug!(session_id = %self.id, %speaker, "empty audio chunk ignored");
            return None;
        }
        if audio.len() > self.services.buffer.max_chunk_bytes {
            warn!(session_id = %self.id, %speaker, bytes = audio.len(), "oversized audio chunk ignored");
            return None;
        }
        let Some(buffer) = self.buffer_for(speaker) else {
            warn!(session_id = %self.id, %speaker, "no audio buffer for speaker");
            return None;
        };
        let segment = buffer.lock().await.push(audio, duration_ms).await?;
        self.record_segment(speaker, segment).await
    }

    async fn record_segment(
        self: &Arc<Self>,
        speaker: Speaker,
        segment: TranscriptSegment,
    ) -> Option<TranscriptEntry> {
        let entry = match self
            .services
            .registry
            .add_transcript(&self.id, speaker, &segment.text, segment.confidence)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "transcript not recorded");
                return None;
            }
        };
        info!(
            session_id = %self.id,
            %speaker,
            language = %segment.language,
            confidence = segment.confidence,
            "transcribed"
        );
        self.persist_line(&entry, &segment.language).await;
        self.emit(CallEvent::Transcript {
            entry: entry.clone(),
            language: segment.language,
        });

        if speaker == Speaker::Scammer {
            self.spawn_extraction(entry.text.clone());
            if !self.ending.load(Ordering::SeqCst) {
                match self.mode().await {
                    Some(TakeoverMode::AiTakeover) => {
                        if self.queue_tx.send(entry.text.clone()).is_err() {
                            debug!(session_id = %self.id, "AI queue closed");
                        }
                    }
                    Some(TakeoverMode::AiCoached) => self.spawn_coaching(),
                    None => {}
                }
            }
        }
        Some(entry)
    }

    async fn persist_line(&self, entry: &TranscriptEntry, language: &str) {
        let line = match serde_json::to_value(StoredLine { entry, language }) {
            Ok(line) => line,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "transcript line not serializable");
                return;
            }
        };
        let update = Update::new()
            .push("transcript", line)
            .set("last_updated", now());
        if let Err(e) = self
            .services
            .store
            .update_one(LIVE_CALLS, &Filter::session(self.id.as_str()), &update, true)
            .await
        {
            warn!(session_id = %self.id, error = %e, "failed to persist transcript line");
        }
    }

    fn emit(&self, event: CallEvent) {
        if self.events.send(event).is_err() {
            debug!(session_id = %self.id, "event receiver dropped");
        }
    }

    /// Recent transcript as agent history. Operator lines are labelled so
    /// the agent does not mistake them for its own turns.
    async fn agent_history(&self) -> Vec<ChatMessage> {
        let window = self.services.live.transcript_window;
        let entries = self
            .services
            .registry
            .recent_transcript(&self.id, window)
            .await
            .unwrap_or_default();
        entries
            .into_iter()
            .map(|entry| match entry.speaker {
                Speaker::Operator => ChatMessage {
                    sender: Speaker::Scammer,
                    text: format!("[Operator said]: {}", entry.text),
                    timestamp: entry.timestamp,
                },
                sender => ChatMessage {
                    sender,
                    text: entry.text,
                    timestamp: entry.timestamp,
                },
            })
            .collect()
    }

    fn spawn_extraction(self: &Arc<Self>, text: String) {
        let call = Arc::clone(self);
        self.tracker.spawn(async move { call.extract(text).await });
    }

    async fn extract(self: Arc<Self>, text: String) {
        let history = self.agent_history().await;
        let registry = Arc::clone(&self.services.registry);
        let outcome = match self
            .services
            .pipeline
            .process(registry.as_ref(), &self.id, &text, Speaker::Scammer, &history)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "extraction failed");
                return;
            }
        };
        if outcome.new_entities.is_empty() {
            return;
        }
        info!(
            session_id = %self.id,
            new = outcome.new_entities.len(),
            threat_level = outcome.threat_level,
            "intelligence extracted"
        );
        if !outcome.urls_to_scan.is_empty() {
            let call = Arc::clone(&self);
            let urls = outcome.urls_to_scan.clone();
            self.tracker.spawn(async move { call.scan_urls(urls).await });
        }
        self.emit(CallEvent::Intelligence {
            entities: outcome.new_entities,
            threat_level: outcome.threat_level,
            tactics: outcome.tactics,
        });
    }

    async fn scan_urls(self: Arc<Self>, urls: Vec<String>) {
        debug!(session_id = %self.id, count = urls.len(), "scanning urls");
        let results = self.services.scanner.scan_many(&urls).await;
        if let Err(e) = self
            .services
            .registry
            .record_url_scans(&self.id, &results)
            .await
        {
            debug!(session_id = %self.id, error = %e, "url results arrived after session end");
        }
        for result in results {
            info!(
                session_id = %self.id,
                url = %result.url,
                risk_score = result.risk_score,
                is_safe = result.is_safe,
                "url scanned"
            );
            self.emit(CallEvent::UrlScan { result });
        }
    }

    fn spawn_coaching(self: &Arc<Self>) {
        let call = Arc::clone(self);
        self.tracker.spawn(async move { call.coach().await });
    }

    async fn coach(self: Arc<Self>) {
        let history = self.agent_history().await;
        let brief = format!("{}\n\n{COACHING_BRIEF}", self.services.mission_context);
        let answer = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            answer = self.services.agent.respond(&history, &brief) => answer,
        };
        match answer {
            Ok(answer) if !answer.reply.trim().is_empty() => self.emit(CallEvent::Coaching {
                suggestion: answer.reply,
                strategy: answer.strategy,
            }),
            Ok(_) => {}
            Err(e) => warn!(session_id = %self.id, error = %e, "coaching unavailable"),
        }
    }

    /// Switches between AI takeover and coached mode. Returns false when
    /// the call is already in `mode` or no longer active.
    pub async fn set_mode(self: &Arc<Self>, mode: TakeoverMode) -> Result<bool, SnareError> {
        if self.ending.load(Ordering::SeqCst) {
            return Ok(false);
        }
        if !self.services.registry.switch_mode(&self.id, mode).await? {
            return Ok(false);
        }
        self.stop_ai_loop();
        if mode == TakeoverMode::AiTakeover {
            self.start_ai_loop();
        }
        self.emit(CallEvent::ModeChanged { mode });
        Ok(true)
    }

    fn start_ai_loop(self: &Arc<Self>) {
        let token = self.cancel.child_token();
        let previous = self
            .ai_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        let call = Arc::clone(self);
        self.tracker.spawn(async move { call.run_ai_loop(token).await });
    }

    fn stop_ai_loop(&self) {
        let current = self
            .ai_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(token) = current {
            token.cancel();
        }
    }

    /// Answers queued scammer speech until cancelled.
    ///
    /// The queue wait is bounded so the loop re-checks cancellation while
    /// the caller is silent. Once the token fires, nothing is emitted or
    /// persisted.
    async fn run_ai_loop(self: Arc<Self>, token: CancellationToken) {
        let mut queue = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            queue = self.queue_rx.lock() => queue,
        };
        let wait = Duration::from_secs(self.services.live.queue_wait_secs);
        info!(session_id = %self.id, "AI response loop started");

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = tokio::time::timeout(wait, queue.recv()) => next,
            };
            let heard = match next {
                Ok(Some(text)) => text,
                Ok(None) => break,
                Err(_) => continue,
            };
            debug!(session_id = %self.id, chars = heard.len(), "answering scammer");

            let history = self.agent_history().await;
            let answer = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                answer = self.services.agent.respond(&history, &self.services.mission_context) => answer,
            };
            if token.is_cancelled() {
                break;
            }
            match answer {
                Ok(answer) if answer.reply.trim().is_empty() => {
                    warn!(session_id = %self.id, "agent returned an empty reply, skipping");
                }
                Ok(answer) => self.record_ai_reply(answer).await,
                Err(e) => {
                    self.fail_over(&e).await;
                    break;
                }
            }
        }
        info!(session_id = %self.id, "AI response loop stopped");
    }

    async fn record_ai_reply(&self, answer: AgentReply) {
        let text = answer.reply.trim().to_string();
        let entry = match self
            .services
            .registry
            .add_transcript(&self.id, Speaker::Agent, &text, 1.0)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                debug!(session_id = %self.id, error = %e, "AI reply after session end dropped");
                return;
            }
        };
        self.persist_line(&entry, &self.language).await;
        self.emit(CallEvent::Transcript {
            entry,
            language: self.language.clone(),
        });
        self.emit(CallEvent::AiResponse { text });

        if let Some(intel) = answer.extracted {
            let registry = Arc::clone(&self.services.registry);
            match self
                .services
                .pipeline
                .process_agent_extracted(registry.as_ref(), &self.id, &intel)
                .await
            {
                Ok(fresh) if !fresh.is_empty() => self.emit(CallEvent::Intelligence {
                    entities: fresh,
                    threat_level: 0.0,
                    tactics: Vec::new(),
                }),
                Ok(_) => {}
                Err(e) => warn!(session_id = %self.id, error = %e, "agent intelligence not recorded"),
            }
        }
    }

    /// Hands the call back to the operator after an agent failure.
    async fn fail_over(&self, error: &SnareError) {
        warn!(session_id = %self.id, error = %error, "AI response failed, reverting to coached mode");
        self.ai_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Err(e) = self
            .services
            .registry
            .switch_mode(&self.id, TakeoverMode::AiCoached)
            .await
        {
            debug!(session_id = %self.id, error = %e, "mode revert skipped");
        }
        self.emit(CallEvent::AiError {
            error: error.to_string(),
        });
        self.emit(CallEvent::ModeChanged {
            mode: TakeoverMode::AiCoached,
        });
    }

    pub async fn stats(&self) -> CallStats {
        CallStats {
            scammer: self.scammer.lock().await.stats(),
            operator: self.operator.lock().await.stats(),
        }
    }

    /// Ends the call: stops the AI loop, transcribes whatever audio is
    /// still buffered, waits for tracked work, and closes the session.
    pub async fn end(self: &Arc<Self>) -> Result<SessionReport, SnareError> {
        if self.ending.swap(true, Ordering::SeqCst) {
            return Err(SnareError::InvalidInput(format!(
                "call {} already ended",
                self.id
            )));
        }
        self.stop_ai_loop();

        for speaker in [Speaker::Scammer, Speaker::Operator] {
            let Some(buffer) = self.buffer_for(speaker) else {
                continue;
            };
            let segment = buffer.lock().await.flush().await;
            if let Some(segment) = segment {
                self.record_segment(speaker, segment).await;
            }
        }

        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        self.services.registry.end_session(&self.id).await
    }
}
