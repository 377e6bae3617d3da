// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline URL heuristics.
//!
//! Every rule adds a fixed amount to the score. The verdict is malicious when
//! the raw sum reaches 0.5; the reported score is clamped to [0, 1].

use async_trait::async_trait;
use serde_json::json;
use snare_core::{ScannerVerdict, SnareError, UrlScanner};
use url::Host;

const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "buzz", "club", "work", "click", "link", "fun",
];

const SHORTENERS: &[&str] = &[
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "is.gd",
    "buff.ly",
    "ow.ly",
    "short.io",
    "rb.gy",
    "cutt.ly",
    "tiny.cc",
    "s.id",
    "clck.ru",
];

const PHISHING_KEYWORDS: &[&str] = &[
    "login", "signin", "verify", "secure", "update", "confirm", "account", "banking", "paypal",
    "netflix", "amazon", "microsoft", "support", "helpdesk", "wallet",
];

/// Cyrillic letters that render like Latin ones, plus the modifier colon.
const HOMOGRAPHS: &[char] = &['а', 'е', 'о', 'р', 'с', 'у', 'х', 'ː'];

const SUSPICIOUS_TLD_POINTS: f64 = 0.3;
const SHORTENER_POINTS: f64 = 0.4;
const KEYWORD_POINTS: f64 = 0.15;
const SUBDOMAIN_POINTS: f64 = 0.2;
const IP_HOST_POINTS: f64 = 0.4;
const HOMOGRAPH_POINTS: f64 = 0.6;
const PLAIN_HTTP_POINTS: f64 = 0.1;
const LONG_URL_POINTS: f64 = 0.1;
const DANGEROUS_SCHEME_POINTS: f64 = 0.8;

const MAX_DOTS: usize = 3;
const MAX_URL_LEN: usize = 150;
const MALICIOUS_AT: f64 = 0.5;

/// Always-available pattern scanner. Performs no I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicScanner;

impl HeuristicScanner {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`UrlScanner::scan`].
    pub fn evaluate(&self, url: &str) -> ScannerVerdict {
        let scheme = scheme(url).unwrap_or_default();
        let host = raw_host(url).unwrap_or_default();
        let lower = url.to_lowercase();

        let mut score = 0.0;
        let mut findings = Vec::new();

        if let Some(tld) = SUSPICIOUS_TLDS
            .iter()
            .find(|tld| host.ends_with(&format!(".{tld}")))
        {
            findings.push(format!("Suspicious TLD: .{tld}"));
            score += SUSPICIOUS_TLD_POINTS;
        }

        if SHORTENERS.contains(&host.as_str()) {
            findings.push("URL shortener detected, may hide real destination".to_string());
            score += SHORTENER_POINTS;
        }

        for keyword in PHISHING_KEYWORDS.iter().filter(|k| lower.contains(*k)) {
            findings.push(format!("Phishing keyword in URL: '{keyword}'"));
            score += KEYWORD_POINTS;
        }

        let dots = host.matches('.').count();
        if dots > MAX_DOTS {
            findings.push(format!("Excessive subdomains ({dots})"));
            score += SUBDOMAIN_POINTS;
        }

        if is_ip_literal(&host) {
            findings.push("IP address used instead of domain name".to_string());
            score += IP_HOST_POINTS;
        }

        if host.chars().any(|c| HOMOGRAPHS.contains(&c)) {
            findings.push("Possible homograph attack, Cyrillic characters in domain".to_string());
            score += HOMOGRAPH_POINTS;
        }

        if scheme == "http" {
            findings.push("No HTTPS, unencrypted connection".to_string());
            score += PLAIN_HTTP_POINTS;
        }

        if url.chars().count() > MAX_URL_LEN {
            findings.push("Unusually long URL, possible obfuscation".to_string());
            score += LONG_URL_POINTS;
        }

        if scheme == "data" || scheme == "javascript" {
            findings.push(format!("Dangerous URI scheme: {scheme}"));
            score += DANGEROUS_SCHEME_POINTS;
        }

        let mut verdict = ScannerVerdict::new(score.clamp(0.0, 1.0), score >= MALICIOUS_AT, findings);
        verdict.details = json!({
            "domain": host,
            "tld": host.rsplit('.').next().unwrap_or_default(),
            "has_https": scheme == "https",
            "url_length": url.chars().count(),
            "subdomain_depth": dots.saturating_sub(1),
        });
        verdict
    }
}

#[async_trait]
impl UrlScanner for HeuristicScanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError> {
        Ok(Some(self.evaluate(url)))
    }
}

/// Lowercased scheme, if the input starts with one.
fn scheme(url: &str) -> Option<String> {
    let (scheme, _) = url.trim().split_once(':')?;
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Host exactly as written (no IDNA conversion), lowercased, without
/// userinfo or port. Homograph detection depends on seeing the raw
/// characters.
pub(crate) fn raw_host(url: &str) -> Option<String> {
    let (_, rest) = url.trim().split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;
    let host = if host_port.starts_with('[') {
        match host_port.find(']') {
            Some(end) => &host_port[..=end],
            None => host_port,
        }
    } else {
        host_port.split(':').next()?
    };
    (!host.is_empty()).then(|| host.to_lowercase())
}

fn is_ip_literal(host: &str) -> bool {
    matches!(Host::parse(host), Ok(Host::Ipv4(_)) | Ok(Host::Ipv6(_)))
}
