// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for OpenAI-compatible `/audio/transcriptions` endpoints
//! (Groq, OpenAI, self-hosted whisper servers).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use snare_config::model::TranscriptionConfig;
use snare_core::{AdapterType, AudioFormat, PluginAdapter, SnareError, Transcriber, Transcription};
use tracing::debug;

/// Confidence reported when the response carries no segment log-probabilities.
const DEFAULT_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    #[serde(default)]
    avg_logprob: Option<f64>,
}

/// Whisper-compatible HTTP transcription worker.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl WhisperTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnareError::Transcription {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Builds a client from config, falling back to `GROQ_API_KEY`.
    pub fn from_config(config: &TranscriptionConfig) -> Result<Self, SnareError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl PluginAdapter for WhisperTranscriber {
    fn name(&self) -> &str {
        "whisper-http"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcriber
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        format: AudioFormat,
        language_hint: Option<String>,
    ) -> Result<Transcription, SnareError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let bytes = audio.len();

        let file = Part::bytes(audio)
            .file_name(format!("chunk.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| SnareError::Transcription {
                message: format!("failed to build multipart audio part: {e}"),
                source: Some(Box::new(e)),
            })?;
        let mut form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = language_hint.filter(|l| !l.is_empty()) {
            form = form.text("language", language);
        }

        let mut request = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        debug!(url = %url, bytes, %format, "sending transcription request");

        let response = request.send().await.map_err(|e| SnareError::Transcription {
            message: format!("transcription request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SnareError::transcription(format!(
                "transcription API returned {status}: {body}"
            )));
        }

        let body: VerboseTranscription =
            response.json().await.map_err(|e| SnareError::Transcription {
                message: format!("malformed transcription response: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Transcription {
            confidence: confidence(&body.segments),
            language: body.language.as_deref().and_then(language_code),
            duration: body.duration.unwrap_or(0.0),
            text: body.text,
        })
    }
}

fn confidence(segments: &[VerboseSegment]) -> f64 {
    let logprobs: Vec<f64> = segments.iter().filter_map(|s| s.avg_logprob).collect();
    if logprobs.is_empty() {
        return DEFAULT_CONFIDENCE;
    }
    let mean = logprobs.iter().sum::<f64>() / logprobs.len() as f64;
    mean.exp().clamp(0.0, 1.0)
}

/// Normalizes a reported language (name or code) to an ISO 639-1 code.
pub fn language_code(reported: &str) -> Option<String> {
    let lower = reported.trim().to_lowercase();
    let code = match lower.as_str() {
        "" => return None,
        "english" => "en",
        "hindi" => "hi",
        "tamil" => "ta",
        "telugu" => "te",
        "bengali" => "bn",
        "marathi" => "mr",
        "urdu" => "ur",
        "punjabi" => "pa",
        "gujarati" => "gu",
        "kannada" => "kn",
        "malayalam" => "ml",
        other => other,
    };
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WhisperTranscriber {
        WhisperTranscriber::new(
            server.uri(),
            Some("gsk-test".into()),
            "whisper-large-v3-turbo",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn language_names_become_codes() {
        assert_eq!(language_code("English").as_deref(), Some("en"));
        assert_eq!(language_code("hi").as_deref(), Some("hi"));
        assert_eq!(language_code("  "), None);
    }

    #[tokio::test]
    async fn parses_verbose_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer gsk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": " Your account will be blocked today. ",
                "language": "english",
                "duration": 2.6,
                "segments": [{ "avg_logprob": -0.1 }, { "avg_logprob": -0.3 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server)
            .transcribe(vec![1, 2, 3], AudioFormat::Wav, Some("en".into()))
            .await
            .unwrap();
        assert_eq!(result.language.as_deref(), Some("en"));
        assert_eq!(result.duration, 2.6);
        assert!((result.confidence - (-0.2f64).exp()).abs() < 1e-9);
        assert!(result.text.contains("blocked"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server)
            .transcribe(vec![1], AudioFormat::Webm, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SnareError::Transcription { .. }));
        assert!(err.to_string().contains("429"));
    }
}
