// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threat-level scoring.

use snare_core::{EntityType, Tactic};

use crate::keywords::KeywordHit;

/// Additive weight of one structured entity.
pub fn entity_weight(entity_type: EntityType) -> f64 {
    match entity_type {
        EntityType::BankAccount | EntityType::UpiId | EntityType::Pan => 0.2,
        EntityType::Phone => 0.1,
        EntityType::Url | EntityType::Ifsc => 0.15,
        EntityType::Aadhaar => 0.25,
        _ => 0.05,
    }
}

/// Additive weight of one detected tactic.
pub fn tactic_weight(tactic: Tactic) -> f64 {
    if tactic.is_escalated() { 0.15 } else { 0.05 }
}

/// Combines structured entities, keyword hits, and tactics into a score
/// clamped to `[0, 1]`. Keyword and tactic annotations passed as
/// `structured` are ignored.
pub fn threat_score(structured: &[EntityType], keywords: &[KeywordHit], tactics: &[Tactic]) -> f64 {
    let entities: f64 = structured
        .iter()
        .filter(|t| t.is_structured())
        .map(|t| entity_weight(*t))
        .sum();
    let keywords: f64 = keywords.iter().map(|k| 0.1 * k.severity.score()).sum();
    let tactics: f64 = tactics.iter().map(|t| tactic_weight(*t)).sum();
    (entities + keywords + tactics).clamp(0.0, 1.0)
}
