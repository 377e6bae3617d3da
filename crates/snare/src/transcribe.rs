// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `snare transcribe` command implementation.
//!
//! Each file is pushed through one [`StreamingTranscriber`] as if it were a
//! chunk of a live call, with the WAV header duration as the hint. Whatever
//! is still buffered at the end is flushed.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use snare_config::SnareConfig;
use snare_core::SnareError;
use snare_stt::{BufferSettings, StreamingTranscriber, WhisperTranscriber, wav_duration_ms};
use tracing::{info, warn};

pub async fn run_transcribe(config: &SnareConfig, files: &[PathBuf]) -> Result<(), SnareError> {
    let worker = Arc::new(WhisperTranscriber::from_config(&config.transcription)?);
    let settings = BufferSettings::from_config(&config.transcription);
    let mut buffer = StreamingTranscriber::new(worker, settings, None);

    for path in files {
        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| SnareError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
        let hint = wav_duration_ms(&audio);
        if hint.is_none() {
            warn!(file = %path.display(), "no WAV header, estimating duration from size");
        }
        if let Some(segment) = buffer.push(audio, hint).await {
            info!(file = %path.display(), language = %segment.language, "segment transcribed");
            println!("{}", segment.text);
        }
    }
    if let Some(segment) = buffer.flush().await {
        println!("{}", segment.text);
    }

    let summary = json!({
        "transcript": buffer.full_transcript(),
        "stats": buffer.stats(),
    });
    let rendered = serde_json::to_string_pretty(&summary)
        .map_err(|e| SnareError::Internal(format!("cannot render transcript: {e}")))?;
    println!("{rendered}");
    Ok(())
}
