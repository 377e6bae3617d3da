// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mandatory-report delivery backends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use snare_config::model::ReportingConfig;
use snare_core::{AdapterType, PluginAdapter, ReportSink, SessionDocument, SnareError};
use tracing::{debug, info};

/// POSTs the session document as JSON to a callback URL.
pub struct WebhookReporter {
    client: reqwest::Client,
    url: String,
}

impl WebhookReporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnareError::Report(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for WebhookReporter {
    fn name(&self) -> &str {
        "webhook"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reporter
    }
}

#[async_trait]
impl ReportSink for WebhookReporter {
    async fn send_report(&self, session: &SessionDocument) -> Result<(), SnareError> {
        debug!(session_id = %session.session_id, url = %self.url, "posting report");
        let response = self
            .client
            .post(&self.url)
            .json(session)
            .send()
            .await
            .map_err(|e| SnareError::Report(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SnareError::Report(format!("callback returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Logs reports when no callback is configured.
#[derive(Debug, Default)]
pub struct LoggingReporter;

#[async_trait]
impl PluginAdapter for LoggingReporter {
    fn name(&self) -> &str {
        "log"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reporter
    }
}

#[async_trait]
impl ReportSink for LoggingReporter {
    async fn send_report(&self, session: &SessionDocument) -> Result<(), SnareError> {
        info!(
            session_id = %session.session_id,
            message_count = session.message_count,
            scam_score = session.scam_score,
            entities = session.extracted_intelligence.total(),
            "report (no callback configured)"
        );
        Ok(())
    }
}

/// Webhook reporter when a callback URL is set, logging reporter otherwise.
pub fn reporter_from_config(config: &ReportingConfig) -> Result<Arc<dyn ReportSink>, SnareError> {
    Ok(match config.callback_url.as_deref() {
        Some(url) => Arc::new(WebhookReporter::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )?),
        None => Arc::new(LoggingReporter),
    })
}
