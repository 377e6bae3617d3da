// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! urlscan.io sandbox scanner: submit a public scan and poll for its result.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use snare_core::{ScannerVerdict, SnareError, UrlScanner};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://urlscan.io/api/v1";
const NAME: &str = "urlscan_io";
const POLL_ATTEMPTS: usize = 6;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    api: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScanResult {
    verdicts: Verdicts,
    page: Page,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Verdicts {
    overall: Overall,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Overall {
    malicious: bool,
    score: f64,
    categories: Vec<String>,
    brands: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Page {
    title: String,
    server: String,
    ip: String,
    country: String,
}

pub struct UrlscanIoScanner {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl UrlscanIoScanner {
    pub fn new(api_key: Option<String>, request_timeout: Duration) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SnareError::scanner(NAME, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            poll_interval: Duration::from_secs(5),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self.poll_interval = Duration::from_millis(10);
        self
    }

    fn verdict(result: ScanResult, result_url: &str) -> ScannerVerdict {
        let overall = result.verdicts.overall;
        let mut findings = Vec::new();
        if overall.malicious {
            findings.push("Flagged as malicious by urlscan.io".to_string());
        }
        if !overall.categories.is_empty() {
            findings.push(format!("Categories: {}", overall.categories.join(", ")));
        }
        if !overall.brands.is_empty() {
            findings.push(format!("Impersonated brands: {}", overall.brands.join(", ")));
        }

        let score = if overall.score > 0.0 {
            (overall.score / 100.0).min(1.0)
        } else if overall.malicious {
            0.9
        } else {
            0.1
        };

        let mut verdict = ScannerVerdict::new(score, overall.malicious, findings);
        verdict.details = json!({
            "page_title": result.page.title,
            "server": result.page.server,
            "ip": result.page.ip,
            "country": result.page.country,
            "result_url": result_url,
        });
        verdict
    }
}

#[async_trait]
impl UrlScanner for UrlscanIoScanner {
    fn name(&self) -> &str {
        NAME
    }

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError> {
        let mut request = self
            .client
            .post(format!("{}/scan/", self.base_url))
            .json(&json!({ "url": url, "visibility": "public" }));
        if let Some(key) = &self.api_key {
            request = request.header("API-Key", key);
        }
        let submit = request
            .send()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("submit failed: {e}")))?;
        if !submit.status().is_success() {
            return Err(SnareError::scanner(
                NAME,
                format!("submit returned {}", submit.status()),
            ));
        }
        let result_url = submit
            .json::<SubmitResponse>()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("malformed submit response: {e}")))?
            .api;
        if result_url.is_empty() {
            return Ok(None);
        }

        // The result is 404 until the sandbox finishes.
        for attempt in 1..=POLL_ATTEMPTS {
            tokio::time::sleep(self.poll_interval).await;
            let response = self
                .client
                .get(&result_url)
                .send()
                .await
                .map_err(|e| SnareError::scanner(NAME, format!("poll failed: {e}")))?;
            if response.status().is_success() {
                let result = response
                    .json::<ScanResult>()
                    .await
                    .map_err(|e| SnareError::scanner(NAME, format!("malformed result: {e}")))?;
                return Ok(Some(Self::verdict(result, &result_url)));
            }
            debug!(attempt, status = %response.status(), "urlscan.io result not ready");
        }

        warn!(url = %url, "urlscan.io scan timed out");
        Ok(None)
    }
}
