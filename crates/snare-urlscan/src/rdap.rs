// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration-age scanner backed by RDAP.
//!
//! Freshly registered domains are a strong scam signal. The registration
//! date comes from the `registration` event of the RDAP domain record.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use snare_core::{ScannerVerdict, SnareError, UrlScanner};
use tracing::debug;
use url::{Host, Url};

const NAME: &str = "rdap";
const MALICIOUS_AT: f64 = 0.5;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DomainRecord {
    events: Vec<Event>,
    entities: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(rename = "eventAction")]
    action: String,
    #[serde(rename = "eventDate")]
    date: DateTime<Utc>,
}

pub struct RdapScanner {
    client: reqwest::Client,
    base_url: String,
}

impl RdapScanner {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SnareError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SnareError::scanner(NAME, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Registrable domain approximated as the last two labels of the host.
/// IP literals and unparsable URLs yield `None`.
pub fn registrable_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let Some(Host::Domain(host)) = parsed.host() else {
        return None;
    };
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}

/// Score contribution and finding for a domain of the given age.
fn age_points(age_days: i64) -> (f64, String) {
    match age_days {
        d if d < 30 => (0.6, format!("Very new domain: {d} days old")),
        d if d < 90 => (0.3, format!("Recent domain: {d} days old")),
        d if d < 365 => (0.1, format!("Domain age: {d} days")),
        d => (0.0, format!("Established domain: {} years old", d / 365)),
    }
}

fn registrar_name(entities: &[Value]) -> Option<String> {
    entities
        .iter()
        .find(|e| {
            e["roles"]
                .as_array()
                .is_some_and(|roles| roles.iter().any(|r| r == "registrar"))
        })
        .and_then(|e| e["vcardArray"][1].as_array())
        .and_then(|props| props.iter().find(|p| p[0] == "fn"))
        .and_then(|p| p[3].as_str())
        .map(str::to_string)
}

fn privacy_protected(entities: &[Value]) -> bool {
    entities.iter().any(|e| {
        let text = e.to_string().to_lowercase();
        text.contains("privacy") || text.contains("redacted")
    })
}

#[async_trait]
impl UrlScanner for RdapScanner {
    fn name(&self) -> &str {
        NAME
    }

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError> {
        let Some(domain) = registrable_domain(url) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/domain/{domain}", self.base_url))
            .header("accept", "application/rdap+json")
            .send()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("lookup failed: {e}")))?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(domain = %domain, "no RDAP record");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SnareError::scanner(
                NAME,
                format!("lookup returned {}", response.status()),
            ));
        }
        let record: DomainRecord = response
            .json()
            .await
            .map_err(|e| SnareError::scanner(NAME, format!("malformed RDAP record: {e}")))?;

        let mut score = 0.0;
        let mut findings = Vec::new();

        let registered = record
            .events
            .iter()
            .find(|e| e.action == "registration")
            .map(|e| e.date);
        if let Some(registered) = registered {
            let (points, finding) = age_points((Utc::now() - registered).num_days());
            score += points;
            findings.push(finding);
        }

        let registrar = registrar_name(&record.entities);
        if let Some(name) = &registrar {
            findings.push(format!("Registrar: {name}"));
        }
        if privacy_protected(&record.entities) {
            findings.push("Registrant privacy protection enabled".to_string());
            score += 0.1;
        }

        let mut verdict = ScannerVerdict::new(score.min(1.0), score >= MALICIOUS_AT, findings);
        verdict.details = json!({
            "domain": domain,
            "registrar": registrar,
            "registered_at": registered,
        });
        Ok(Some(verdict))
    }
}
