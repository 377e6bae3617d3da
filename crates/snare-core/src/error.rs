// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Snare honeypot.

use thiserror::Error;

/// The primary error type used across all Snare collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum SnareError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Document or object storage errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Classifier, conversational agent, or LLM extractor failures.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transcription worker failures (upload, decode, malformed response).
    #[error("transcription error: {message}")]
    Transcription {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A URL scanner failed to produce a verdict.
    #[error("scanner {scanner} failed: {message}")]
    Scanner { scanner: String, message: String },

    /// Report delivery failed.
    #[error("report delivery failed: {0}")]
    Report(String),

    /// The requested key or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller supplied unusable input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SnareError {
    /// Wraps any storage-layer error.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        SnareError::Storage { source: err.into() }
    }

    /// Builds a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        SnareError::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a transcription error without an underlying source.
    pub fn transcription(message: impl Into<String>) -> Self {
        SnareError::Transcription {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a scanner error.
    pub fn scanner(scanner: impl Into<String>, message: impl Into<String>) -> Self {
        SnareError::Scanner {
            scanner: scanner.into(),
            message: message.into(),
        }
    }
}
