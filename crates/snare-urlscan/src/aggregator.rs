// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-scanner URL risk aggregation with a time-bounded result cache.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use sha2::{Digest, Sha256};
use snare_config::model::UrlScanConfig;
use snare_core::types::SAFE_THRESHOLD;
use snare_core::{SnareError, UrlScanResult, UrlScanner};
use tracing::{debug, info, warn};

use crate::heuristic::HeuristicScanner;
use crate::rdap::RdapScanner;
use crate::urlscan_io::UrlscanIoScanner;
use crate::virustotal::VirusTotalScanner;

/// Score reported when no scanner produced a verdict.
const UNKNOWN_SCORE: f64 = 0.5;
/// Floor applied when at least [`MALICIOUS_QUORUM`] scanners flag a URL.
const ESCALATED_SCORE: f64 = 0.8;
const MALICIOUS_QUORUM: usize = 2;

/// Source of the current time, injectable for cache tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs every registered scanner against a URL and fuses their verdicts.
pub struct UrlRiskAggregator {
    scanners: Vec<Arc<dyn UrlScanner>>,
    cache: DashMap<String, UrlScanResult>,
    ttl: chrono::Duration,
    clock: Clock,
}

impl UrlRiskAggregator {
    pub fn new(scanners: Vec<Arc<dyn UrlScanner>>, ttl: Duration) -> Self {
        Self {
            scanners,
            cache: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Heuristic scanner plus whichever external scanners are configured.
    pub fn from_config(config: &UrlScanConfig) -> Result<Self, SnareError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut scanners: Vec<Arc<dyn UrlScanner>> = vec![Arc::new(HeuristicScanner::new())];

        if config.virustotal_api_key.is_some() {
            scanners.push(Arc::new(VirusTotalScanner::new(
                config.virustotal_api_key.clone(),
                Duration::from_secs(config.virustotal_min_interval_secs),
                timeout,
            )?));
        }
        if config.urlscan_enabled {
            scanners.push(Arc::new(UrlscanIoScanner::new(
                config.urlscan_api_key.clone(),
                timeout,
            )?));
        }
        if config.rdap_enabled {
            scanners.push(Arc::new(RdapScanner::new(&config.rdap_endpoint, timeout)?));
        }

        info!(
            scanners = ?scanners.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            "url scanners configured"
        );
        Ok(Self::new(
            scanners,
            Duration::from_secs(config.cache_ttl_secs),
        ))
    }

    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// Scans one URL, serving a cached result younger than the TTL.
    /// Expired entries are pruned on every call, hit or miss.
    pub async fn scan(&self, url: &str) -> UrlScanResult {
        let key = cache_key(url);
        let now = (self.clock)();
        self.cache
            .retain(|_, cached| now - cached.scanned_at < self.ttl);

        if let Some(hit) = self.cache.get(&key) {
            debug!(url = %url, "url scan cache hit");
            metrics::counter!("snare_url_scan_cache_hits_total").increment(1);
            return hit.clone();
        }

        let votes = join_all(self.scanners.iter().map(|scanner| async move {
            let name = scanner.name().to_string();
            match scanner.scan(url).await {
                Ok(verdict) => (name, verdict),
                Err(e) => {
                    warn!(scanner = %name, url = %url, error = %e, "scanner failed, no vote");
                    (name, None)
                }
            }
        }))
        .await;

        let result = fuse(url, votes, now);
        metrics::counter!("snare_url_scans_total").increment(1);
        info!(
            url = %url,
            risk_score = result.risk_score,
            is_safe = result.is_safe,
            "url scanned"
        );

        self.cache.insert(key, result.clone());
        result
    }

    /// Scans URLs concurrently. Results follow input order.
    pub async fn scan_many(&self, urls: &[String]) -> Vec<UrlScanResult> {
        join_all(urls.iter().map(|url| self.scan(url))).await
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

fn cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn fuse(
    url: &str,
    votes: Vec<(String, Option<snare_core::ScannerVerdict>)>,
    now: DateTime<Utc>,
) -> UrlScanResult {
    let mut scanner_results = BTreeMap::new();
    let mut findings = BTreeSet::new();
    let mut scores = Vec::new();
    let mut malicious_votes = 0;

    for (name, verdict) in votes {
        let Some(verdict) = verdict else { continue };
        scores.push(verdict.risk_score);
        if verdict.is_malicious {
            malicious_votes += 1;
        }
        findings.extend(verdict.findings.iter().cloned());
        scanner_results.insert(name, verdict);
    }

    let mut risk_score = if scores.is_empty() {
        UNKNOWN_SCORE
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    if malicious_votes >= MALICIOUS_QUORUM {
        risk_score = risk_score.max(ESCALATED_SCORE);
    }

    UrlScanResult {
        url: url.to_string(),
        risk_score,
        is_safe: risk_score < SAFE_THRESHOLD,
        findings,
        scanner_results,
        scanned_at: now,
    }
}
