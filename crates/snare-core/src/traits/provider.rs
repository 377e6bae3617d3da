// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for the LLM-backed collaborators: classifier, conversational
//! agent, and structured extractor.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::types::{AgentReply, ChatMessage, ScamVerdict, StructuredIntel};

/// Decides whether a message belongs to a scam conversation.
#[async_trait]
pub trait ScamClassifier: Send + Sync + 'static {
    async fn classify(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<ScamVerdict, SnareError>;
}

/// Produces the honeypot's next reply.
///
/// `history` ends with the message being answered. `mission_context`
/// carries free-form instructions for the current engagement.
#[async_trait]
pub trait ConversationAgent: Send + Sync + 'static {
    async fn respond(
        &self,
        history: &[ChatMessage],
        mission_context: &str,
    ) -> Result<AgentReply, SnareError>;
}

/// Optional second extraction source that runs alongside the regex rules.
#[async_trait]
pub trait IntelExtractor: Send + Sync + 'static {
    async fn extract(
        &self,
        text: &str,
        history: &[ChatMessage],
    ) -> Result<StructuredIntel, SnareError>;
}
