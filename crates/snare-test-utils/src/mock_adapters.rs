// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted adapters for the transcription, URL-scanning, and reporting seams.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use snare_core::{
    AdapterType, AudioFormat, PluginAdapter, ReportSink, ScannerVerdict, SessionDocument,
    SnareError, Transcriber, Transcription, UrlScanner,
};

/// A transcriber answering from a queue of transcriptions.
///
/// Once the queue is drained every call returns the fallback text. The
/// language hints it was called with are recorded in order.
pub struct MockTranscriber {
    queue: Mutex<VecDeque<Result<Transcription, String>>>,
    fallback: String,
    fallback_language: Option<String>,
    hints: Mutex<Vec<Option<String>>>,
}

impl MockTranscriber {
    pub fn new(fallback: &str) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: fallback.to_string(),
            fallback_language: None,
            hints: Mutex::new(Vec::new()),
        }
    }

    /// Language detected for the fallback text.
    pub fn with_fallback_language(mut self, language: &str) -> Self {
        self.fallback_language = Some(language.to_string());
        self
    }

    /// Queue a transcription with a detected language.
    pub async fn push_text(&self, text: &str, language: &str) {
        self.queue.lock().await.push_back(Ok(Transcription {
            text: text.to_string(),
            language: Some(language.to_string()),
            confidence: 0.9,
            duration: 2.5,
        }));
    }

    /// Queue a failure for the next call.
    pub async fn push_failure(&self, message: &str) {
        self.queue.lock().await.push_back(Err(message.to_string()));
    }

    pub async fn hints(&self) -> Vec<Option<String>> {
        self.hints.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockTranscriber {
    fn name(&self) -> &str {
        "mock-transcriber"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcriber
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(
        &self,
        _audio: Vec<u8>,
        _format: AudioFormat,
        language_hint: Option<String>,
    ) -> Result<Transcription, SnareError> {
        self.hints.lock().await.push(language_hint);
        match self.queue.lock().await.pop_front() {
            Some(Ok(transcription)) => Ok(transcription),
            Some(Err(message)) => Err(SnareError::transcription(message)),
            None => Ok(Transcription {
                text: self.fallback.clone(),
                language: self.fallback_language.clone(),
                confidence: 0.9,
                duration: 2.5,
            }),
        }
    }
}

/// A URL scanner with per-URL canned verdicts.
///
/// URLs without a verdict are reported as unavailable. Marking the scanner
/// as failing makes every call return a scanner error.
pub struct FakeScanner {
    name: String,
    verdicts: HashMap<String, ScannerVerdict>,
    failing: bool,
    calls: AtomicUsize,
}

impl FakeScanner {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            verdicts: HashMap::new(),
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_verdict(mut self, url: &str, risk_score: f64, is_malicious: bool) -> Self {
        let findings = vec![format!("{} flagged {url}", self.name)];
        self.verdicts.insert(
            url.to_string(),
            ScannerVerdict::new(risk_score, is_malicious, findings),
        );
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlScanner for FakeScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SnareError::scanner(&self.name, "fake scanner down"));
        }
        Ok(self.verdicts.get(url).cloned())
    }
}

/// A report sink that keeps every delivered session document.
///
/// A failing sink still records the document, then returns an error.
#[derive(Default)]
pub struct RecordingReportSink {
    delivered: Arc<Mutex<Vec<SessionDocument>>>,
    failing: bool,
}

impl RecordingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn delivered(&self) -> Vec<SessionDocument> {
        self.delivered.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.delivered.lock().await.len()
    }
}

#[async_trait]
impl PluginAdapter for RecordingReportSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reporter
    }
}

#[async_trait]
impl ReportSink for RecordingReportSink {
    async fn send_report(&self, session: &SessionDocument) -> Result<(), SnareError> {
        // Let concurrent lifecycle checks interleave with delivery.
        tokio::task::yield_now().await;
        self.delivered.lock().await.push(session.clone());
        if self.failing {
            return Err(SnareError::Report("callback returned 500".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcriber_drains_queue_then_falls_back() {
        let transcriber = MockTranscriber::new("fallback line");
        transcriber.push_text("namaste ji", "hi").await;
        transcriber.push_failure("worker down").await;

        let first = transcriber
            .transcribe(vec![1], AudioFormat::Wav, None)
            .await
            .unwrap();
        assert_eq!(first.language.as_deref(), Some("hi"));
        assert!(
            transcriber
                .transcribe(vec![1], AudioFormat::Wav, Some("hi".into()))
                .await
                .is_err()
        );
        let last = transcriber
            .transcribe(vec![1], AudioFormat::Wav, None)
            .await
            .unwrap();
        assert_eq!(last.text, "fallback line");
        assert_eq!(transcriber.hints().await[1].as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn failing_sink_records_then_errors() {
        let sink = RecordingReportSink::failing();
        let session = SessionDocument::new("s-1");
        assert!(sink.send_report(&session).await.is_err());
        assert_eq!(sink.count().await, 1);
        assert!(RecordingReportSink::new().send_report(&session).await.is_ok());
    }

    #[tokio::test]
    async fn fake_scanner_answers_known_urls_only() {
        let scanner = FakeScanner::new("fake").with_verdict("http://bad.tk", 0.9, true);
        assert!(scanner.scan("http://bad.tk").await.unwrap().unwrap().is_malicious);
        assert!(scanner.scan("https://example.com").await.unwrap().is_none());
        assert!(FakeScanner::new("down").failing().scan("x").await.is_err());
        assert_eq!(scanner.calls(), 2);
    }
}
