// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM collaborators for deterministic testing.
//!
//! `MockClassifier` and `MockAgent` stand in for the scam classifier and the
//! conversational agent, answering from pre-configured queues.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};

use snare_core::{
    AgentReply, ChatMessage, ConversationAgent, ScamClassifier, ScamVerdict, SnareError,
    StructuredIntel,
};

/// A classifier returning a fixed verdict, or failing when none is set.
pub struct MockClassifier {
    verdict: Option<ScamVerdict>,
    calls: AtomicUsize,
}

impl MockClassifier {
    /// Classifies every message as a scam with the given confidence.
    pub fn scam(confidence: f64) -> Self {
        Self::with_verdict(Some(ScamVerdict {
            is_scam: true,
            confidence,
        }))
    }

    /// Classifies every message as benign with the given confidence.
    pub fn benign(confidence: f64) -> Self {
        Self::with_verdict(Some(ScamVerdict {
            is_scam: false,
            confidence,
        }))
    }

    /// Fails every call with a provider error.
    pub fn unavailable() -> Self {
        Self::with_verdict(None)
    }

    fn with_verdict(verdict: Option<ScamVerdict>) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of classify calls seen so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScamClassifier for MockClassifier {
    async fn classify(
        &self,
        _text: &str,
        _history: &[ChatMessage],
    ) -> Result<ScamVerdict, SnareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
            .ok_or_else(|| SnareError::provider("mock classifier unavailable"))
    }
}

/// A conversational agent that pops replies from a FIFO queue.
///
/// When the queue is empty the fallback is returned ("mock reply" unless
/// set otherwise). Every history it was called with is recorded. A gated
/// agent records the call, then waits for a semaphore permit before
/// answering.
pub struct MockAgent {
    replies: Mutex<VecDeque<Result<AgentReply, String>>>,
    fallback: Result<AgentReply, String>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    histories: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockAgent {
    pub fn new() -> Self {
        Self::with_fallback(Ok(reply("mock reply")))
    }

    /// Create an agent pre-loaded with the given reply texts.
    pub fn with_replies(replies: Vec<String>) -> Self {
        let agent = Self::new();
        let queue = replies.into_iter().map(|r| Ok(reply(&r))).collect();
        Self {
            replies: Mutex::new(queue),
            ..agent
        }
    }

    /// Answers every call with `text`.
    pub fn replying(text: &str) -> Self {
        Self::with_fallback(Ok(reply(text)))
    }

    /// Fails every call once the queue is drained.
    pub fn failing(message: &str) -> Self {
        Self::with_fallback(Err(message.to_string()))
    }

    fn with_fallback(fallback: Result<AgentReply, String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            gate: None,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
        }
    }

    /// Each call waits for a permit on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Attaches agent-extracted intelligence to the fallback reply.
    pub fn extracting(mut self, intel: StructuredIntel) -> Self {
        if let Ok(answer) = &mut self.fallback {
            answer.extracted = Some(intel);
        }
        self
    }

    /// Queue a full reply.
    pub async fn push_reply(&self, answer: AgentReply) {
        self.replies.lock().await.push_back(Ok(answer));
    }

    /// Queue a failure for the next call.
    pub async fn push_failure(&self, message: &str) {
        self.replies.lock().await.push_back(Err(message.to_string()));
    }

    /// Number of respond calls seen so far, including gated ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Histories passed to `respond`, oldest call first.
    pub async fn histories(&self) -> Vec<Vec<ChatMessage>> {
        self.histories.lock().await.clone()
    }

    async fn next_reply(&self) -> Result<AgentReply, SnareError> {
        let next = self.replies.lock().await.pop_front();
        match next.unwrap_or_else(|| self.fallback.clone()) {
            Ok(answer) => Ok(answer),
            Err(message) => Err(SnareError::provider(message)),
        }
    }
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationAgent for MockAgent {
    async fn respond(
        &self,
        history: &[ChatMessage],
        _mission_context: &str,
    ) -> Result<AgentReply, SnareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().await.push(history.to_vec());
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await;
        }
        self.next_reply().await
    }
}

fn reply(text: &str) -> AgentReply {
    AgentReply {
        reply: text.to_string(),
        sentiment: "neutral".to_string(),
        strategy: "engage".to_string(),
        notes: String::new(),
        extracted: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_replies_returned_in_order() {
        let agent = MockAgent::with_replies(vec!["first".into(), "second".into()]);
        assert_eq!(agent.respond(&[], "").await.unwrap().reply, "first");
        assert_eq!(agent.respond(&[], "").await.unwrap().reply, "second");
        // Queue exhausted, falls back to default
        assert_eq!(agent.respond(&[], "").await.unwrap().reply, "mock reply");
        assert_eq!(agent.histories().await.len(), 3);
    }

    #[tokio::test]
    async fn queued_failure_surfaces_as_provider_error() {
        let agent = MockAgent::new();
        agent.push_failure("rate limited").await;
        let err = agent.respond(&[], "").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert!(agent.respond(&[], "").await.is_ok());
    }

    #[tokio::test]
    async fn failing_agent_keeps_failing_and_counts_calls() {
        let agent = MockAgent::failing("upstream 503");
        assert!(agent.respond(&[], "").await.is_err());
        assert!(agent.respond(&[], "").await.is_err());
        assert_eq!(agent.calls(), 2);
    }

    #[tokio::test]
    async fn extracting_agent_attaches_intel_to_every_reply() {
        let intel = StructuredIntel {
            names: vec!["Rahul Sharma".into()],
            ..Default::default()
        };
        let agent = MockAgent::replying("ok").extracting(intel);
        for _ in 0..2 {
            let answer = agent.respond(&[], "").await.unwrap();
            assert_eq!(answer.reply, "ok");
            assert_eq!(answer.extracted.unwrap().names, ["Rahul Sharma"]);
        }
    }

    #[tokio::test]
    async fn gated_agent_records_the_call_before_answering() {
        let gate = Arc::new(Semaphore::new(0));
        let agent = Arc::new(MockAgent::replying("late").gated(Arc::clone(&gate)));
        let pending = tokio::spawn({
            let agent = Arc::clone(&agent);
            async move { agent.respond(&[], "").await }
        });
        while agent.calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!pending.is_finished());
        gate.add_permits(1);
        assert_eq!(pending.await.unwrap().unwrap().reply, "late");
    }

    #[tokio::test]
    async fn classifier_counts_calls() {
        let classifier = MockClassifier::scam(0.9);
        let verdict = classifier.classify("pay now", &[]).await.unwrap();
        assert!(verdict.is_scam);
        assert!(MockClassifier::unavailable().classify("x", &[]).await.is_err());
        assert_eq!(classifier.calls(), 1);
    }
}
