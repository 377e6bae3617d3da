// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The extraction pipeline: patterns, keywords, tactics, threat scoring,
//! optional LLM merge, then per-session dedup through an
//! [`IntelligenceSink`].

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use snare_core::{
    ChatMessage, EntityType, ExtractedEntity, IntelExtractor, IntelligenceSink, SessionId,
    SnareError, Speaker, StructuredIntel, Tactic,
};
use tracing::{debug, warn};

use crate::keywords::{KeywordHit, detect_keywords};
use crate::patterns::{extract_structured, snippet};
use crate::tactics::{TACTIC_CONFIDENCE, classify_tactics};
use crate::threat::threat_score;

/// Confidence of entities reported by the conversational agent.
pub const AGENT_CONFIDENCE: f64 = 0.85;
/// Confidence of entities reported by the LLM extractor.
pub const LLM_CONFIDENCE: f64 = 0.85;

const AGENT_CONTEXT: &str = "Extracted by AI agent";
const KEYWORD_CONTEXT_CHARS: usize = 100;

/// Everything found in one piece of text, before dedup.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub candidates: Vec<ExtractedEntity>,
    pub keywords: Vec<KeywordHit>,
    pub tactics: Vec<Tactic>,
    pub threat_level: f64,
}

/// Result of processing one utterance for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Entities the session had not seen before.
    pub new_entities: Vec<ExtractedEntity>,
    pub threat_level: f64,
    pub tactics: Vec<Tactic>,
    /// New URL entities, for the URL risk aggregator.
    pub urls_to_scan: Vec<String>,
}

/// Rule-based extraction with an optional LLM second source.
#[derive(Clone, Default)]
pub struct IntelligencePipeline {
    llm: Option<Arc<dyn IntelExtractor>>,
}

impl IntelligencePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an LLM extractor whose output is unioned with the rule-based
    /// candidates before dedup.
    pub fn with_llm_extractor(mut self, extractor: Arc<dyn IntelExtractor>) -> Self {
        self.llm = Some(extractor);
        self
    }

    /// Rule-based analysis of `text`. Pure and synchronous.
    pub fn analyze(&self, text: &str) -> Analysis {
        if text.trim().is_empty() {
            return Analysis::default();
        }
        let text_lower = text.to_lowercase();
        let context = snippet(text, KEYWORD_CONTEXT_CHARS);

        let mut candidates = extract_structured(text);
        let keywords = detect_keywords(&text_lower);
        candidates.extend(keywords.iter().map(|hit| {
            ExtractedEntity::new(
                EntityType::Keyword,
                hit.keyword,
                hit.severity.score(),
                &context,
            )
        }));
        let tactics = classify_tactics(&text_lower);
        candidates.extend(tactics.iter().map(|t| {
            ExtractedEntity::new(EntityType::Tactic, t.to_string(), TACTIC_CONFIDENCE, &context)
        }));

        let threat_level = score(&candidates, &keywords, &tactics);
        Analysis {
            candidates,
            keywords,
            tactics,
            threat_level,
        }
    }

    /// Rule-based analysis plus the LLM extractor when configured. An
    /// extractor failure is logged and contributes nothing.
    pub async fn analyze_with_llm(&self, text: &str, history: &[ChatMessage]) -> Analysis {
        let mut analysis = self.analyze(text);
        if text.trim().is_empty() {
            return analysis;
        }
        let Some(llm) = &self.llm else {
            return analysis;
        };

        match llm.extract(text, history).await {
            Ok(intel) => {
                let context = snippet(text, KEYWORD_CONTEXT_CHARS);
                let mut known: HashSet<(EntityType, String)> = analysis
                    .candidates
                    .iter()
                    .map(|e| (e.entity_type, e.value.clone()))
                    .collect();
                // Repeats of what the rules already found add no weight.
                let extra: Vec<ExtractedEntity> =
                    structured_to_entities(&intel, LLM_CONFIDENCE, &context)
                        .into_iter()
                        .filter(|e| known.insert((e.entity_type, e.value.clone())))
                        .collect();
                debug!(count = extra.len(), "llm extractor returned new candidates");
                for entity in &extra {
                    if entity.entity_type == EntityType::Tactic
                        && let Ok(tactic) = entity.value.to_lowercase().parse::<Tactic>()
                        && !analysis.tactics.contains(&tactic)
                    {
                        analysis.tactics.push(tactic);
                    }
                }
                analysis.candidates.extend(extra);
                analysis.threat_level =
                    score(&analysis.candidates, &analysis.keywords, &analysis.tactics);
            }
            Err(e) => warn!(error = %e, "llm extraction failed, using rule-based result only"),
        }
        analysis
    }

    /// Processes one utterance for a session.
    ///
    /// Only scammer speech raises the threat level; entities are recorded
    /// from every speaker.
    pub async fn process(
        &self,
        sink: &dyn IntelligenceSink,
        session_id: &SessionId,
        text: &str,
        speaker: Speaker,
        history: &[ChatMessage],
    ) -> Result<PipelineOutcome, SnareError> {
        if text.trim().is_empty() {
            return Ok(PipelineOutcome::default());
        }
        let analysis = self.analyze_with_llm(text, history).await;
        let threat_level = if speaker == Speaker::Scammer {
            analysis.threat_level
        } else {
            0.0
        };

        let new_entities = sink
            .merge_intelligence(session_id, analysis.candidates, threat_level, &analysis.tactics)
            .await?;
        record_metrics(&new_entities);

        let urls_to_scan = new_entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Url)
            .map(|e| e.value.clone())
            .collect();
        debug!(
            session_id = %session_id,
            %speaker,
            new = new_entities.len(),
            threat_level,
            "processed utterance"
        );

        Ok(PipelineOutcome {
            new_entities,
            threat_level,
            tactics: analysis.tactics,
            urls_to_scan,
        })
    }

    /// Feeds intelligence reported by the conversational agent through the
    /// same dedup. The threat level is left unchanged.
    pub async fn process_agent_extracted(
        &self,
        sink: &dyn IntelligenceSink,
        session_id: &SessionId,
        intel: &StructuredIntel,
    ) -> Result<Vec<ExtractedEntity>, SnareError> {
        let candidates = structured_to_entities(intel, AGENT_CONFIDENCE, AGENT_CONTEXT);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let new_entities = sink
            .merge_intelligence(session_id, candidates, 0.0, &[])
            .await?;
        record_metrics(&new_entities);
        Ok(new_entities)
    }
}

/// Converts extractor lists into candidate entities.
pub fn structured_to_entities(
    intel: &StructuredIntel,
    confidence: f64,
    context: &str,
) -> Vec<ExtractedEntity> {
    intel
        .pairs()
        .into_iter()
        .map(|(ty, value)| ExtractedEntity::new(ty, value.trim(), confidence, context))
        .collect()
}

/// Threat over every structured candidate, repeats included.
fn score(candidates: &[ExtractedEntity], keywords: &[KeywordHit], tactics: &[Tactic]) -> f64 {
    let structured: Vec<EntityType> = candidates
        .iter()
        .filter(|e| e.entity_type.is_structured())
        .map(|e| e.entity_type)
        .collect();
    threat_score(&structured, keywords, tactics)
}

fn record_metrics(new_entities: &[ExtractedEntity]) {
    for entity in new_entities {
        metrics::counter!(
            "snare_entities_extracted_total",
            "entity_type" => entity.entity_type.to_string()
        )
        .increment(1);
    }
}
