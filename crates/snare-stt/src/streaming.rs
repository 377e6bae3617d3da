// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-speaker streaming transcription buffer.
//!
//! Audio chunks accumulate until their estimated duration reaches the
//! threshold. The window is then merged, handed to the transcription worker
//! on a separate task with a bounded wait, and the buffer starts over.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use snare_config::model::TranscriptionConfig;
use snare_core::{SnareError, Transcriber, Transcription};
use tracing::{debug, info, warn};

use crate::wav::merge_chunks;

/// Bytes per second of 16 kHz mono 16-bit PCM.
const PCM_BYTES_PER_SECOND: f64 = 16_000.0 * 2.0;

/// Shortest transcription text kept, in characters.
const MIN_TEXT_CHARS: usize = 2;

/// Estimated duration of raw audio assuming 16 kHz mono 16-bit PCM.
pub fn estimate_duration_ms(len: usize) -> f64 {
    len as f64 / PCM_BYTES_PER_SECOND * 1000.0
}

/// Buffer tuning, usually derived from [`TranscriptionConfig`].
#[derive(Debug, Clone)]
pub struct BufferSettings {
    pub threshold_ms: f64,
    pub allowed_languages: Vec<String>,
    pub default_language: String,
    pub timeout: Duration,
    pub max_chunk_bytes: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self::from_config(&TranscriptionConfig::default())
    }
}

impl BufferSettings {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            threshold_ms: config.buffer_threshold_ms,
            allowed_languages: config.allowed_languages.clone(),
            default_language: config.default_language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_chunk_bytes: config.max_chunk_bytes,
        }
    }
}

/// One transcribed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub language: String,
    pub confidence: f64,
    /// Seconds of audio covered.
    pub duration: f64,
    pub segment_index: usize,
    pub is_partial: bool,
}

/// Counters exposed for monitoring a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStats {
    pub chunks_processed: u64,
    pub total_segments: usize,
    pub language: Option<String>,
    pub language_locked: bool,
    pub buffer_duration_ms: f64,
    pub pending_chunks: usize,
}

/// Stateful accumulator for one speaker's audio.
pub struct StreamingTranscriber {
    worker: Arc<dyn Transcriber>,
    settings: BufferSettings,
    chunks: Vec<Vec<u8>>,
    buffered_ms: f64,
    language: Option<String>,
    language_locked: bool,
    segments: Vec<TranscriptSegment>,
    chunks_processed: u64,
}

impl StreamingTranscriber {
    /// `language` seeds the hint sent before a language is locked; `None`
    /// lets the worker detect it.
    pub fn new(
        worker: Arc<dyn Transcriber>,
        settings: BufferSettings,
        language: Option<String>,
    ) -> Self {
        Self {
            worker,
            settings,
            chunks: Vec::new(),
            buffered_ms: 0.0,
            language,
            language_locked: false,
            segments: Vec::new(),
            chunks_processed: 0,
        }
    }

    /// Appends a chunk. Returns true once the buffered duration has reached
    /// the threshold.
    ///
    /// Empty and oversized chunks are ignored. A missing or non-positive
    /// `duration_ms` is estimated from the byte length.
    pub fn add_chunk(&mut self, audio: Vec<u8>, duration_ms: Option<f64>) -> bool {
        if audio.is_empty() {
            return false;
        }
        if audio.len() > self.settings.max_chunk_bytes {
            warn!(
                bytes = audio.len(),
                max = self.settings.max_chunk_bytes,
                "dropping oversized audio chunk"
            );
            return self.is_ready();
        }
        let duration = match duration_ms {
            Some(ms) if ms > 0.0 => ms,
            _ => estimate_duration_ms(audio.len()),
        };
        self.chunks.push(audio);
        self.buffered_ms += duration;
        self.chunks_processed += 1;
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.buffered_ms >= self.settings.threshold_ms
    }

    /// Adds a chunk and transcribes the window if it became ready.
    pub async fn push(
        &mut self,
        audio: Vec<u8>,
        duration_ms: Option<f64>,
    ) -> Option<TranscriptSegment> {
        if self.add_chunk(audio, duration_ms) {
            self.transcribe_buffer().await
        } else {
            None
        }
    }

    /// Transcribes and clears the buffered window.
    ///
    /// Returns `None` for an empty buffer, a worker failure or timeout, and
    /// text shorter than two characters. The buffer is cleared in every
    /// case where it was non-empty.
    pub async fn transcribe_buffer(&mut self) -> Option<TranscriptSegment> {
        if self.chunks.is_empty() {
            return None;
        }
        let chunks = std::mem::take(&mut self.chunks);
        let buffered_ms = std::mem::take(&mut self.buffered_ms);
        debug!(chunks = chunks.len(), buffered_ms, "transcribing buffer");

        let result = match self.run_worker(chunks).await {
            Ok(Some(result)) => result,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "transcription failed, window dropped");
                return None;
            }
        };

        let text = result.text.trim().to_string();
        if text.chars().count() < MIN_TEXT_CHARS {
            debug!("transcription empty or too short, ignoring");
            return None;
        }

        if !self.language_locked
            && let Some(detected) = result.language.as_deref()
        {
            self.lock_language(detected);
        }

        let segment = TranscriptSegment {
            text,
            language: self
                .language
                .clone()
                .unwrap_or_else(|| self.settings.default_language.clone()),
            confidence: result.confidence,
            duration: result.duration,
            segment_index: self.segments.len(),
            is_partial: false,
        };
        self.segments.push(segment.clone());
        Some(segment)
    }

    /// Transcribes whatever is buffered regardless of the threshold.
    pub async fn flush(&mut self) -> Option<TranscriptSegment> {
        if self.chunks.is_empty() {
            return None;
        }
        self.transcribe_buffer().await
    }

    async fn run_worker(&self, chunks: Vec<Vec<u8>>) -> Result<Option<Transcription>, SnareError> {
        let worker = Arc::clone(&self.worker);
        let hint = self.language.clone();
        let timeout = self.settings.timeout;

        let mut handle = tokio::spawn(merge_and_transcribe(worker, chunks, hint));

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SnareError::Internal(format!(
                "transcription task failed: {join}"
            ))),
            Err(_) => {
                handle.abort();
                Err(SnareError::Timeout { duration: timeout })
            }
        }
    }

    fn lock_language(&mut self, detected: &str) {
        let detected = detected.to_lowercase();
        if self.settings.allowed_languages.contains(&detected) {
            info!(language = %detected, "language locked");
            self.language = Some(detected);
        } else {
            warn!(
                detected = %detected,
                fallback = %self.settings.default_language,
                "detected language outside allow-list, locking default"
            );
            self.language = Some(self.settings.default_language.clone());
        }
        self.language_locked = true;
    }

    /// Locked (or seeded) language, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    /// All segment texts joined by single spaces.
    pub fn full_transcript(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn buffered_ms(&self) -> f64 {
        self.buffered_ms
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            chunks_processed: self.chunks_processed,
            total_segments: self.segments.len(),
            language: self.language.clone(),
            language_locked: self.language_locked,
            buffer_duration_ms: self.buffered_ms,
            pending_chunks: self.chunks.len(),
        }
    }

    /// Clears the buffer, segments, counters, and language lock.
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.buffered_ms = 0.0;
        self.segments.clear();
        self.chunks_processed = 0;
        self.language = None;
        self.language_locked = false;
    }
}

async fn merge_and_transcribe(
    worker: Arc<dyn Transcriber>,
    chunks: Vec<Vec<u8>>,
    hint: Option<String>,
) -> Result<Option<Transcription>, SnareError> {
    let merged = tokio::task::spawn_blocking(move || merge_chunks(&chunks))
        .await
        .map_err(|e| SnareError::Internal(format!("merge task failed: {e}")))?;
    let Some((audio, format)) = merged else {
        return Ok(None);
    };
    worker.transcribe(audio, format, hint).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm_estimate() {
        assert_eq!(estimate_duration_ms(32_000), 1000.0);
        assert_eq!(estimate_duration_ms(0), 0.0);
    }

    #[test]
    fn default_settings_follow_config_defaults() {
        let settings = BufferSettings::default();
        assert_eq!(settings.threshold_ms, 2500.0);
        assert_eq!(settings.default_language, "en");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }
}
