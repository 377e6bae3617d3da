// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behavior of the per-speaker streaming buffer against a scripted worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use snare_core::{
    AdapterType, AudioFormat, PluginAdapter, SnareError, Transcriber, Transcription,
};
use snare_stt::{BufferSettings, StreamingTranscriber, pcm16_to_wav};

/// Worker returning a fixed result and counting invocations.
struct ScriptedWorker {
    text: String,
    language: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
    last_format: std::sync::Mutex<Option<AudioFormat>>,
}

impl ScriptedWorker {
    fn new(text: &str, language: Option<&str>) -> Self {
        Self {
            text: text.to_string(),
            language: language.map(str::to_string),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_format: std::sync::Mutex::new(None),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for ScriptedWorker {
    fn name(&self) -> &str {
        "scripted"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcriber
    }
}

#[async_trait]
impl Transcriber for ScriptedWorker {
    async fn transcribe(
        &self,
        _audio: Vec<u8>,
        format: AudioFormat,
        _language_hint: Option<String>,
    ) -> Result<Transcription, SnareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_format.lock().unwrap() = Some(format);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Transcription {
            text: self.text.clone(),
            language: self.language.clone(),
            confidence: 0.92,
            duration: 2.5,
        })
    }
}

fn settings() -> BufferSettings {
    BufferSettings {
        threshold_ms: 2500.0,
        allowed_languages: vec!["en".into(), "hi".into()],
        default_language: "en".into(),
        timeout: Duration::from_secs(30),
        max_chunk_bytes: 1024 * 1024,
    }
}

fn buffer(worker: &Arc<ScriptedWorker>) -> StreamingTranscriber {
    StreamingTranscriber::new(worker.clone(), settings(), None)
}

#[tokio::test]
async fn below_threshold_does_not_call_worker() {
    let worker = Arc::new(ScriptedWorker::new("hello there", Some("en")));
    let mut stt = buffer(&worker);

    assert!(stt.push(vec![0u8; 100], Some(1000.0)).await.is_none());
    assert!(stt.push(vec![0u8; 100], Some(1000.0)).await.is_none());

    assert_eq!(worker.calls(), 0);
    assert_eq!(stt.buffered_ms(), 2000.0);
    assert_eq!(stt.stats().pending_chunks, 2);
}

#[tokio::test]
async fn crossing_chunk_transcribes_and_resets() {
    let worker = Arc::new(ScriptedWorker::new("  your KYC is pending  ", Some("en")));
    let mut stt = buffer(&worker);

    stt.push(vec![0u8; 100], Some(1000.0)).await;
    stt.push(vec![0u8; 100], Some(1000.0)).await;
    let segment = stt
        .push(vec![0u8; 100], Some(1000.0))
        .await
        .expect("threshold crossed");

    assert_eq!(worker.calls(), 1);
    assert_eq!(segment.text, "your KYC is pending");
    assert_eq!(segment.segment_index, 0);
    assert!(!segment.is_partial);
    assert_eq!(stt.buffered_ms(), 0.0);
    assert_eq!(stt.stats().pending_chunks, 0);
    assert_eq!(stt.stats().chunks_processed, 3);
}

#[tokio::test]
async fn missing_duration_is_estimated_from_length() {
    let worker = Arc::new(ScriptedWorker::new("hello there", None));
    let mut stt = buffer(&worker);

    // 80_000 bytes of 16 kHz mono PCM16 is 2.5 s.
    assert!(stt.add_chunk(vec![0u8; 80_000], None));
    assert!(stt.transcribe_buffer().await.is_some());
}

#[tokio::test]
async fn first_detected_language_is_locked() {
    let worker = Arc::new(ScriptedWorker::new("namaste ji", Some("hi")));
    let mut stt = buffer(&worker);

    let first = stt.push(vec![0u8; 10], Some(3000.0)).await.expect("segment");
    assert_eq!(first.language, "hi");
    assert_eq!(stt.language(), Some("hi"));
    assert!(stt.stats().language_locked);
}

#[tokio::test]
async fn language_outside_allow_list_locks_default() {
    let worker = Arc::new(ScriptedWorker::new("bonjour monsieur", Some("fr")));
    let mut stt = buffer(&worker);

    let segment = stt.push(vec![0u8; 10], Some(3000.0)).await.expect("segment");
    assert_eq!(segment.language, "en");
    assert_eq!(stt.language(), Some("en"));
}

#[tokio::test]
async fn too_short_text_is_discarded() {
    let worker = Arc::new(ScriptedWorker::new(" a ", Some("en")));
    let mut stt = buffer(&worker);

    assert!(stt.push(vec![0u8; 10], Some(3000.0)).await.is_none());
    assert_eq!(worker.calls(), 1);
    assert!(stt.segments().is_empty());
    assert_eq!(stt.buffered_ms(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn slow_worker_times_out() {
    let worker =
        Arc::new(ScriptedWorker::new("too late", Some("en")).slow(Duration::from_secs(120)));
    let mut stt = buffer(&worker);

    assert!(stt.push(vec![0u8; 10], Some(3000.0)).await.is_none());
    assert!(stt.segments().is_empty());
    assert_eq!(stt.buffered_ms(), 0.0);
}

#[tokio::test]
async fn flush_transcribes_partial_window() {
    let worker = Arc::new(ScriptedWorker::new("last words", Some("en")));
    let mut stt = buffer(&worker);

    assert!(stt.flush().await.is_none());
    stt.push(vec![0u8; 10], Some(500.0)).await;
    let segment = stt.flush().await.expect("flushed");
    assert_eq!(segment.text, "last words");
    assert_eq!(worker.calls(), 1);
}

#[tokio::test]
async fn wav_chunks_are_merged_before_upload() {
    let worker = Arc::new(ScriptedWorker::new("merged audio", Some("en")));
    let mut stt = buffer(&worker);

    let chunk = pcm16_to_wav(&vec![0i16; 16_000]).unwrap();
    stt.push(chunk.clone(), Some(1500.0)).await;
    stt.push(chunk, Some(1500.0)).await.expect("segment");

    assert_eq!(*worker.last_format.lock().unwrap(), Some(AudioFormat::Wav));
}

#[tokio::test]
async fn transcript_joins_segments_and_reset_clears() {
    let worker = Arc::new(ScriptedWorker::new("one more", Some("en")));
    let mut stt = buffer(&worker);

    stt.push(vec![0u8; 10], Some(3000.0)).await;
    stt.push(vec![0u8; 10], Some(3000.0)).await;
    assert_eq!(stt.full_transcript(), "one more one more");
    assert_eq!(stt.segments()[1].segment_index, 1);

    stt.reset();
    assert!(stt.segments().is_empty());
    assert_eq!(stt.language(), None);
    assert!(!stt.stats().language_locked);
}
