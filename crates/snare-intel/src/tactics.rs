// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manipulation tactic classification by indicator phrases.

use snare_core::Tactic;
use strum::IntoEnumIterator;

/// Confidence assigned to every detected tactic.
pub const TACTIC_CONFIDENCE: f64 = 0.8;

fn indicators(tactic: Tactic) -> &'static [&'static str] {
    match tactic {
        Tactic::Fear => &[
            "blocked",
            "arrested",
            "warrant",
            "seized",
            "police",
            "legal action",
            "jail",
        ],
        Tactic::Authority => &[
            "rbi",
            "reserve bank",
            "police",
            "cyber cell",
            "government",
            "court order",
            "official",
        ],
        Tactic::Urgency => &[
            "immediately",
            "now",
            "hurry",
            "last chance",
            "within",
            "minutes",
            "deadline",
        ],
        Tactic::Sympathy => &["help", "please", "understand", "problem", "issue", "difficulty"],
        Tactic::Greed => &["prize", "lottery", "winner", "cashback", "reward", "bonus", "free"],
        Tactic::Impersonation => &[
            "officer",
            "executive",
            "manager",
            "department",
            "headquarters",
        ],
        Tactic::Isolation => &[
            "don't tell",
            "secret",
            "confidential",
            "between us",
            "no one should know",
        ],
    }
}

/// Number of a tactic's indicator phrases present in lowercased text.
pub fn indicator_hits(tactic: Tactic, text_lower: &str) -> usize {
    indicators(tactic)
        .iter()
        .filter(|ind| text_lower.contains(*ind))
        .count()
}

/// Tactics with at least one indicator hit, in declaration order.
pub fn classify_tactics(text_lower: &str) -> Vec<Tactic> {
    Tactic::iter()
        .filter(|t| indicator_hits(*t, text_lower) >= 1)
        .collect()
}
