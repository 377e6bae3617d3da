// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scam keyword tiers.

use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Severity tier of a scam keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Score recorded as the keyword entity's confidence.
    pub fn score(self) -> f64 {
        match self {
            Severity::High => 0.9,
            Severity::Medium => 0.6,
            Severity::Low => 0.3,
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Severity::High => &[
                "blocked",
                "suspended",
                "seized",
                "arrested",
                "warrant",
                "money laundering",
                "narcotics",
                "cyber crime",
                "aadhaar linked",
                "transfer immediately",
                "send money",
                "pay now",
                "last chance",
            ],
            Severity::Medium => &[
                "verify",
                "kyc",
                "update",
                "expired",
                "pending",
                "refund",
                "cashback",
                "prize",
                "lottery",
                "selected",
                "offer",
                "limited time",
                "deadline",
                "urgent",
            ],
            Severity::Low => &[
                "bank",
                "account",
                "otp",
                "password",
                "pin",
                "debit card",
                "credit card",
                "net banking",
                "upi",
            ],
        }
    }
}

/// One keyword found in a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordHit {
    pub keyword: &'static str,
    pub severity: Severity,
}

/// Substring scan of already-lowercased text against every tier.
pub fn detect_keywords(text_lower: &str) -> Vec<KeywordHit> {
    Severity::iter()
        .flat_map(|severity| {
            severity
                .keywords()
                .iter()
                .filter(|kw| text_lower.contains(*kw))
                .map(move |keyword| KeywordHit {
                    keyword,
                    severity,
                })
        })
        .collect()
}
