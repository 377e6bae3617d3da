// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! VirusTotal v3 reputation scanner.
//!
//! Submits the URL, waits briefly, then reads the analysis stats. The free
//! tier allows four requests a minute, so submissions are spaced by a
//! configurable minimum interval.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use snare_core::{ScannerVerdict, SnareError, UrlScanner};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/api/v3";
const NAME: &str = "virustotal";

/// The verdict is malicious once more than this many engines flag a URL.
const MALICIOUS_ENGINE_THRESHOLD: u64 = 2;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    data: SubmitData,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    data: AnalysisData,
}

#[derive(Debug, Deserialize)]
struct AnalysisData {
    attributes: AnalysisAttributes,
}

#[derive(Debug, Deserialize)]
struct AnalysisAttributes {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    stats: BTreeMap<String, u64>,
}

pub struct VirusTotalScanner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    min_interval: Duration,
    poll_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl VirusTotalScanner {
    pub fn new(
        api_key: Option<String>,
        min_interval: Duration,
        request_timeout: Duration,
    ) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SnareError::scanner(NAME, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            min_interval,
            poll_delay: Duration::from_secs(3),
            last_request: Mutex::new(None),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self.poll_delay = Duration::ZERO;
        self
    }

    /// Waits until `min_interval` has passed since the previous submission.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "virustotal rate limit, waiting");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl UrlScanner for VirusTotalScanner {
    fn name(&self) -> &str {
        NAME
    }

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError> {
        let Some(api_key) = &self.api_key else {
            debug!("virustotal API key not configured, skipping");
            return Ok(None);
        };
        self.throttle().await;

        let submit = self
            .client
            .post(format!("{}/urls", self.base_url))
            .header("x-apikey", api_key)
            .form(&[("url", url)])
            .send()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("submit failed: {e}")))?;
        if !submit.status().is_success() {
            return Err(SnareError::scanner(
                NAME,
                format!("submit returned {}", submit.status()),
            ));
        }
        let analysis_id = submit
            .json::<SubmitResponse>()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("malformed submit response: {e}")))?
            .data
            .id;

        tokio::time::sleep(self.poll_delay).await;

        let analysis = self
            .client
            .get(format!("{}/analyses/{analysis_id}", self.base_url))
            .header("x-apikey", api_key)
            .send()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("analysis fetch failed: {e}")))?;
        if !analysis.status().is_success() {
            return Err(SnareError::scanner(
                NAME,
                format!("analysis returned {}", analysis.status()),
            ));
        }
        let attributes = analysis
            .json::<AnalysisResponse>()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("malformed analysis: {e}")))?
            .data
            .attributes;

        let malicious = attributes.stats.get("malicious").copied().unwrap_or(0);
        let suspicious = attributes.stats.get("suspicious").copied().unwrap_or(0);
        let total = attributes.stats.values().sum::<u64>().max(1);
        let score = (malicious * 2 + suspicious) as f64 / (total * 2) as f64;

        let mut verdict = ScannerVerdict::new(
            score.min(1.0),
            malicious > MALICIOUS_ENGINE_THRESHOLD,
            vec![
                format!("{malicious} engines flagged as malicious"),
                format!("{suspicious} engines flagged as suspicious"),
                format!(
                    "Status: {}",
                    attributes.status.as_deref().unwrap_or("unknown")
                ),
            ],
        );
        verdict.details = json!({ "stats": attributes.stats, "analysis_id": analysis_id });
        Ok(Some(verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scanner(server: &MockServer, key: Option<&str>) -> VirusTotalScanner {
        VirusTotalScanner::new(
            key.map(str::to_string),
            Duration::ZERO,
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn unconfigured_scanner_is_unavailable() {
        let server = MockServer::start().await;
        let result = scanner(&server, None).scan("https://x.test").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn scores_engine_stats() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/urls"))
            .and(header("x-apikey", "vt-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "id": "u-abc-123" } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/analyses/u-abc-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": {
                    "status": "completed",
                    "stats": { "malicious": 4, "suspicious": 2, "harmless": 4 }
                } }
            })))
            .mount(&server)
            .await;

        let verdict = scanner(&server, Some("vt-key"))
            .scan("http://paytm-kyc.tk")
            .await
            .unwrap()
            .expect("verdict");
        // (2*4 + 2) / (2*10)
        assert!((verdict.risk_score - 0.5).abs() < 1e-9);
        assert!(verdict.is_malicious);
        assert!(verdict.findings.contains(&"Status: completed".to_string()));
    }

    async fn verdict_for_malicious_count(malicious: u64) -> ScannerVerdict {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": "u-1" } })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/analyses/u-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "attributes": {
                    "status": "completed",
                    "stats": { "malicious": malicious, "harmless": 60 }
                } }
            })))
            .mount(&server)
            .await;
        scanner(&server, Some("vt-key"))
            .scan("http://parcel-fee.xyz")
            .await
            .unwrap()
            .expect("verdict")
    }

    #[tokio::test]
    async fn malicious_needs_more_than_threshold_engines() {
        let at_threshold = verdict_for_malicious_count(MALICIOUS_ENGINE_THRESHOLD).await;
        assert!(!at_threshold.is_malicious);
        let above = verdict_for_malicious_count(MALICIOUS_ENGINE_THRESHOLD + 1).await;
        assert!(above.is_malicious);
    }

    #[tokio::test]
    async fn rejected_submission_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = scanner(&server, Some("vt-key"))
            .scan("https://x.test")
            .await
            .unwrap_err();
        assert!(matches!(err, SnareError::Scanner { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_requests() {
        let vt = VirusTotalScanner::new(
            Some("k".into()),
            Duration::from_secs(15),
            Duration::from_secs(5),
        )
        .unwrap();
        let start = Instant::now();
        vt.throttle().await;
        vt.throttle().await;
        assert!(start.elapsed() >= Duration::from_secs(15));
    }
}
