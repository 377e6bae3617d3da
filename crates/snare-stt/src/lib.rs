// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming speech-to-text for live calls.
//!
//! [`StreamingTranscriber`] buffers one speaker's audio chunks until enough
//! audio has accumulated, merges the window according to its container
//! format, and hands it to a [`snare_core::Transcriber`] worker.
//! [`WhisperTranscriber`] is the HTTP worker for Whisper-compatible APIs.

pub mod streaming;
pub mod wav;
pub mod whisper;

pub use streaming::{
    BufferSettings, BufferStats, StreamingTranscriber, TranscriptSegment, estimate_duration_ms,
};
pub use wav::{merge_chunks, merge_wav_chunks, pcm16_to_wav, wav_duration_ms};
pub use whisper::WhisperTranscriber;

