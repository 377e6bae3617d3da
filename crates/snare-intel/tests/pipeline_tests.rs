// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline behavior against an in-test session sink and stub extractors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use snare_core::{
    ChatMessage, EntityLedger, EntityType, ExtractedEntity, IntelExtractor, IntelligenceSink,
    SessionId, SnareError, Speaker, StructuredIntel, Tactic,
};
use snare_intel::IntelligencePipeline;

#[derive(Default)]
struct LedgerSink {
    sessions: Mutex<HashMap<SessionId, (EntityLedger, f64)>>,
}

impl LedgerSink {
    fn threat(&self, id: &SessionId) -> f64 {
        self.sessions.lock().unwrap().get(id).map(|s| s.1).unwrap_or(0.0)
    }
}

#[async_trait]
impl IntelligenceSink for LedgerSink {
    async fn merge_intelligence(
        &self,
        session_id: &SessionId,
        candidates: Vec<ExtractedEntity>,
        threat_level: f64,
        _tactics: &[Tactic],
    ) -> Result<Vec<ExtractedEntity>, SnareError> {
        let mut sessions = self.sessions.lock().unwrap();
        let (ledger, threat) = sessions.entry(session_id.clone()).or_default();
        *threat = threat.max(threat_level);
        Ok(candidates
            .into_iter()
            .filter(|e| ledger.admit(e.clone()))
            .collect())
    }
}

struct StubExtractor(Result<StructuredIntel, ()>);

#[async_trait]
impl IntelExtractor for StubExtractor {
    async fn extract(
        &self,
        _text: &str,
        _history: &[ChatMessage],
    ) -> Result<StructuredIntel, SnareError> {
        self.0.clone().map_err(|_| SnareError::provider("llm offline"))
    }
}

#[tokio::test]
async fn example_sentence_yields_payment_identifiers() {
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");
    let outcome = IntelligencePipeline::new()
        .process(
            &sink,
            &id,
            "send to 9876543210 or account 123456789012 via user@oksbi",
            Speaker::Scammer,
            &[],
        )
        .await
        .unwrap();

    let of = |ty: EntityType| -> Vec<&str> {
        outcome
            .new_entities
            .iter()
            .filter(|e| e.entity_type == ty)
            .map(|e| e.value.as_str())
            .collect()
    };
    assert_eq!(of(EntityType::Phone), vec!["9876543210"]);
    assert_eq!(of(EntityType::BankAccount), vec!["123456789012"]);
    assert_eq!(of(EntityType::UpiId), vec!["user@oksbi"]);
}

#[tokio::test]
async fn second_submission_is_not_new() {
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");
    let pipeline = IntelligencePipeline::new();

    let first = pipeline
        .process(&sink, &id, "visit http://sbi-kyc.tk now", Speaker::Scammer, &[])
        .await
        .unwrap();
    assert_eq!(first.urls_to_scan, vec!["http://sbi-kyc.tk"]);

    let second = pipeline
        .process(&sink, &id, "visit http://sbi-kyc.tk now", Speaker::Scammer, &[])
        .await
        .unwrap();
    assert!(second.new_entities.is_empty());
    assert!(second.urls_to_scan.is_empty());
    assert!(second.threat_level > 0.0);
}

#[tokio::test]
async fn whitespace_text_has_no_side_effects() {
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");
    let outcome = IntelligencePipeline::new()
        .process(&sink, &id, "  ", Speaker::Scammer, &[])
        .await
        .unwrap();
    assert_eq!(outcome, Default::default());
    assert!(sink.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn operator_speech_records_entities_without_threat() {
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");
    let outcome = IntelligencePipeline::new()
        .process(&sink, &id, "my number is 9876543210", Speaker::Operator, &[])
        .await
        .unwrap();
    assert_eq!(outcome.new_entities.len(), 1);
    assert_eq!(outcome.threat_level, 0.0);
    assert_eq!(sink.threat(&id), 0.0);
}

#[tokio::test]
async fn llm_candidates_share_dedup_with_rules() {
    let intel = StructuredIntel {
        phone_numbers: vec!["9876543210".into()],
        names: vec!["Rahul Sharma".into()],
        behavioral_tactics: vec!["isolation".into()],
        ..Default::default()
    };
    let pipeline =
        IntelligencePipeline::new().with_llm_extractor(Arc::new(StubExtractor(Ok(intel))));
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");

    let outcome = pipeline
        .process(&sink, &id, "call 9876543210", Speaker::Scammer, &[])
        .await
        .unwrap();

    let phones: Vec<_> = outcome
        .new_entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Phone)
        .collect();
    assert_eq!(phones.len(), 1);
    assert_eq!(phones[0].confidence, 0.9, "rule-based match comes first and wins");
    assert!(
        outcome
            .new_entities
            .iter()
            .any(|e| e.entity_type == EntityType::Name && e.value == "Rahul Sharma")
    );
    assert!(outcome.tactics.contains(&Tactic::Isolation));
}

#[tokio::test]
async fn llm_repeat_of_a_rule_match_adds_no_threat() {
    let intel = StructuredIntel {
        phone_numbers: vec!["9876543210".into()],
        ..Default::default()
    };
    let pipeline =
        IntelligencePipeline::new().with_llm_extractor(Arc::new(StubExtractor(Ok(intel))));

    let merged = pipeline.analyze_with_llm("9876543210", &[]).await;
    assert_eq!(merged.threat_level, pipeline.analyze("9876543210").threat_level);
    assert_eq!(merged.candidates.len(), 1);
}

#[tokio::test]
async fn llm_failure_degrades_to_rules() {
    let pipeline =
        IntelligencePipeline::new().with_llm_extractor(Arc::new(StubExtractor(Err(()))));
    let sink = LedgerSink::default();
    let outcome = pipeline
        .process(&sink, &SessionId::from("s-1"), "call 9876543210", Speaker::Scammer, &[])
        .await
        .unwrap();
    assert_eq!(outcome.new_entities.len(), 1);
}

#[tokio::test]
async fn agent_extracted_intel_uses_agent_confidence() {
    let sink = LedgerSink::default();
    let id = SessionId::from("s-1");
    let pipeline = IntelligencePipeline::new();
    pipeline
        .process(&sink, &id, "pay to fraud@ybl", Speaker::Scammer, &[])
        .await
        .unwrap();

    let intel = StructuredIntel {
        upi_ids: vec!["fraud@ybl".into()],
        amounts: vec!["Rs 49,999".into()],
        ..Default::default()
    };
    let new = pipeline
        .process_agent_extracted(&sink, &id, &intel)
        .await
        .unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].entity_type, EntityType::Amount);
    assert_eq!(new[0].confidence, 0.85);
    assert_eq!(new[0].context, "Extracted by AI agent");
}
