// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcription worker trait.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AudioFormat, Transcription};

/// Speech-to-text backend.
///
/// Implementations perform network or CPU-heavy work and are always
/// awaited off the caller's critical path with a bounded timeout.
#[async_trait]
pub trait Transcriber: PluginAdapter {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        format: AudioFormat,
        language_hint: Option<String>,
    ) -> Result<Transcription, SnareError>;
}
