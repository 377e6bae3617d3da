// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed patterns for structured identifiers.

use std::sync::LazyLock;

use regex::Regex;
use snare_core::{EntityType, ExtractedEntity};

/// Confidence assigned to every pattern match.
pub const PATTERN_CONFIDENCE: f64 = 0.9;

/// Characters of source text kept as context for a pattern match.
const PATTERN_CONTEXT_CHARS: usize = 80;

/// UPI handle suffixes of the major payment apps.
const UPI_HANDLES: &str =
    "oksbi|okaxis|okhdfc|okhdfcbank|okicici|ybl|paytm|ibl|upi|apl|axisb|sbi|icici|hdfcbank";

/// Identifier patterns, matched case-insensitively, in extraction order.
static ENTITY_PATTERNS: LazyLock<Vec<(EntityType, Regex)>> = LazyLock::new(|| {
    let table = [
        // Indian mobile numbers start with 6-9.
        (EntityType::Phone, r"\b[6-9]\d{9}\b".to_string()),
        (EntityType::BankAccount, r"\b\d{11,18}\b".to_string()),
        (
            EntityType::UpiId,
            format!(r"[\w.\-]+@(?:{UPI_HANDLES})\b"),
        ),
        (EntityType::Url, r#"https?://[^\s<>"']+"#.to_string()),
        (EntityType::Ifsc, r"\b[A-Z]{4}0[A-Z0-9]{6}\b".to_string()),
        (EntityType::Email, r"\b[\w.\-]+@[\w.\-]+\.\w{2,}\b".to_string()),
        (EntityType::Aadhaar, r"\b\d{4}\s?\d{4}\s?\d{4}\b".to_string()),
        (EntityType::Pan, r"\b[A-Z]{5}\d{4}[A-Z]\b".to_string()),
    ];
    table
        .into_iter()
        .map(|(ty, pattern)| (ty, Regex::new(&format!("(?i){pattern}")).unwrap()))
        .collect()
});

/// Returns every pattern match as a candidate entity, repeats included.
pub fn extract_structured(text: &str) -> Vec<ExtractedEntity> {
    let context = snippet(text, PATTERN_CONTEXT_CHARS);
    ENTITY_PATTERNS
        .iter()
        .flat_map(|(ty, re)| {
            re.find_iter(text)
                .map(|m| m.as_str().trim())
                .filter(|v| !v.is_empty())
                .map(|v| ExtractedEntity::new(*ty, v, PATTERN_CONFIDENCE, &context))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(text: &str, ty: EntityType) -> Vec<String> {
        extract_structured(text)
            .into_iter()
            .filter(|e| e.entity_type == ty)
            .map(|e| e.value)
            .collect()
    }

    #[test]
    fn payment_details_sentence() {
        let text = "send to 9876543210 or account 123456789012 via user@oksbi";
        assert_eq!(values(text, EntityType::Phone), vec!["9876543210"]);
        assert_eq!(values(text, EntityType::BankAccount), vec!["123456789012"]);
        assert_eq!(values(text, EntityType::UpiId), vec!["user@oksbi"]);
        assert!(values(text, EntityType::Email).is_empty());
    }

    #[test]
    fn phone_requires_leading_six_to_nine() {
        assert!(values("call 5876543210", EntityType::Phone).is_empty());
        assert_eq!(values("call 6000000001 now", EntityType::Phone), vec!["6000000001"]);
    }

    #[test]
    fn urls_stop_at_whitespace_and_quotes() {
        let text = r#"open "https://sbi-kyc.tk/login?id=7" or http://bit.ly/x1 today"#;
        assert_eq!(
            values(text, EntityType::Url),
            vec!["https://sbi-kyc.tk/login?id=7", "http://bit.ly/x1"]
        );
    }

    #[test]
    fn ifsc_pan_and_email_are_case_insensitive() {
        let text = "ifsc sbin0001234, pan abcde1234f, mail refunds@support-rbi.in";
        assert_eq!(values(text, EntityType::Ifsc), vec!["sbin0001234"]);
        assert_eq!(values(text, EntityType::Pan), vec!["abcde1234f"]);
        assert_eq!(values(text, EntityType::Email), vec!["refunds@support-rbi.in"]);
    }

    #[test]
    fn aadhaar_with_spaces() {
        assert_eq!(
            values("my aadhaar is 1234 5678 9012", EntityType::Aadhaar),
            vec!["1234 5678 9012"]
        );
    }

    #[test]
    fn upi_requires_known_handle() {
        assert!(values("pay me at someone@gmail", EntityType::UpiId).is_empty());
        assert_eq!(values("pay fraud.boss@ybl", EntityType::UpiId), vec!["fraud.boss@ybl"]);
    }

    #[test]
    fn pattern_matches_carry_fixed_confidence_and_short_context() {
        let text = format!("{} 9876543210", "a".repeat(200));
        let entity = extract_structured(&text)
            .into_iter()
            .find(|e| e.entity_type == EntityType::Phone)
            .expect("phone");
        assert_eq!(entity.confidence, PATTERN_CONFIDENCE);
        assert_eq!(entity.context.chars().count(), 80);
    }
}
