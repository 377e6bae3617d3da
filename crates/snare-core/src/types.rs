// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the extraction pipeline, transcription buffer,
//! URL aggregator, and session lifecycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Unique identifier for an engagement session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of I/O adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    DocumentStore,
    ObjectStore,
    Transcriber,
    Reporter,
}

/// Kind of fact isolated from conversation text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Phone,
    BankAccount,
    UpiId,
    Url,
    Ifsc,
    Email,
    Aadhaar,
    Pan,
    Keyword,
    Tactic,
    Name,
    Organization,
    Amount,
}

impl EntityType {
    /// Key under which values of this kind are grouped in a session's
    /// persisted intelligence.
    pub fn intelligence_key(self) -> &'static str {
        match self {
            EntityType::Phone => "phone_numbers",
            EntityType::BankAccount => "bank_accounts",
            EntityType::UpiId => "upi_ids",
            EntityType::Url => "urls",
            EntityType::Ifsc => "ifsc_codes",
            EntityType::Email => "emails",
            EntityType::Aadhaar => "aadhaar_numbers",
            EntityType::Pan => "pan_numbers",
            EntityType::Keyword => "scam_keywords",
            EntityType::Tactic => "behavioral_tactics",
            EntityType::Name => "names",
            EntityType::Organization => "organizations",
            EntityType::Amount => "amounts",
        }
    }

    /// True for identifiers matched by a fixed pattern or reported by an
    /// extractor, as opposed to keyword and tactic annotations.
    pub fn is_structured(self) -> bool {
        !matches!(self, EntityType::Keyword | EntityType::Tactic)
    }
}

/// One fact isolated from conversation text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub entity_type: EntityType,
    /// Raw matched value. Not normalized; dedup is case-sensitive.
    pub value: String,
    pub confidence: f64,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

/// Longest context snippet stored with an entity.
pub const MAX_CONTEXT_CHARS: usize = 100;

impl ExtractedEntity {
    pub fn new(
        entity_type: EntityType,
        value: impl Into<String>,
        confidence: f64,
        context: &str,
    ) -> Self {
        Self {
            entity_type,
            value: value.into(),
            confidence,
            context: context.chars().take(MAX_CONTEXT_CHARS).collect(),
            timestamp: Utc::now(),
        }
    }

    /// Composite key deciding novelty within a session.
    pub fn dedup_key(&self) -> (EntityType, &str) {
        (self.entity_type, self.value.as_str())
    }
}

/// Per-session set of extracted entities with O(1) novelty checks.
///
/// A second `(entity_type, value)` is discarded outright: the first
/// occurrence's confidence and context are kept.
#[derive(Debug, Clone, Default)]
pub struct EntityLedger {
    seen: HashSet<(EntityType, String)>,
    entities: Vec<ExtractedEntity>,
}

impl EntityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the entity if its key is unseen. Returns whether it was new.
    pub fn admit(&mut self, entity: ExtractedEntity) -> bool {
        if !self.seen.insert((entity.entity_type, entity.value.clone())) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    pub fn contains(&self, entity_type: EntityType, value: &str) -> bool {
        self.seen.contains(&(entity_type, value.to_string()))
    }

    pub fn entities(&self) -> &[ExtractedEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Groups stored values by intelligence key.
    pub fn to_intelligence(&self) -> ExtractedIntelligence {
        let mut intel = ExtractedIntelligence::default();
        for entity in &self.entities {
            intel.insert(entity.entity_type, &entity.value);
        }
        intel
    }
}

/// Persisted intelligence: entity kind to set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedIntelligence(pub BTreeMap<String, BTreeSet<String>>);

impl ExtractedIntelligence {
    /// Adds a value under its kind's key. Returns whether it was new.
    pub fn insert(&mut self, entity_type: EntityType, value: &str) -> bool {
        self.0
            .entry(entity_type.intelligence_key().to_string())
            .or_default()
            .insert(value.to_string())
    }

    pub fn values(&self, entity_type: EntityType) -> Option<&BTreeSet<String>> {
        self.0.get(entity_type.intelligence_key())
    }

    /// Set-union of `other` into `self`.
    pub fn merge(&mut self, other: &ExtractedIntelligence) {
        for (key, values) in &other.0 {
            self.0
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn total(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

/// Manipulation technique category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Tactic {
    Fear,
    Authority,
    Urgency,
    Sympathy,
    Greed,
    Impersonation,
    Isolation,
}

impl Tactic {
    /// Tactics that weigh more heavily in the threat score.
    pub fn is_escalated(self) -> bool {
        matches!(self, Tactic::Fear | Tactic::Authority | Tactic::Isolation)
    }
}

/// Who produced a piece of conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Scammer,
    Operator,
    Agent,
}

/// Status of a session. `Terminated` is final; `Reported` may still
/// progress to `Terminated` on the message limit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Reported,
    Terminated,
}

/// Whether the automated agent speaks directly or only coaches a human.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TakeoverMode {
    AiTakeover,
    AiCoached,
}

/// One recorded takeover-mode transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSwitch {
    pub from: TakeoverMode,
    pub to: TakeoverMode,
    pub at: DateTime<Utc>,
    pub turn: u32,
}

/// One line of a live-call transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub turn: u32,
}

/// A conversation message as seen by the classifier and agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Speaker, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Classifier verdict for a message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScamVerdict {
    pub is_scam: bool,
    pub confidence: f64,
}

/// Structured intelligence lists reported by an LLM extractor or the
/// conversational agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredIntel {
    pub phone_numbers: Vec<String>,
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub urls: Vec<String>,
    pub scam_keywords: Vec<String>,
    pub behavioral_tactics: Vec<String>,
    pub names: Vec<String>,
    pub organizations: Vec<String>,
    pub amounts: Vec<String>,
}

impl StructuredIntel {
    /// Flattens the lists into `(type, value)` pairs. Tactic labels that
    /// do not name a known tactic are kept as keywords.
    pub fn pairs(&self) -> Vec<(EntityType, &str)> {
        let lists: [(EntityType, &Vec<String>); 8] = [
            (EntityType::Phone, &self.phone_numbers),
            (EntityType::BankAccount, &self.bank_accounts),
            (EntityType::UpiId, &self.upi_ids),
            (EntityType::Url, &self.urls),
            (EntityType::Keyword, &self.scam_keywords),
            (EntityType::Name, &self.names),
            (EntityType::Organization, &self.organizations),
            (EntityType::Amount, &self.amounts),
        ];
        let mut out: Vec<(EntityType, &str)> = lists
            .into_iter()
            .flat_map(|(ty, values)| values.iter().map(move |v| (ty, v.as_str())))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        for tactic in &self.behavioral_tactics {
            let label = tactic.trim();
            if label.is_empty() {
                continue;
            }
            if label.to_lowercase().parse::<Tactic>().is_ok() {
                out.push((EntityType::Tactic, label));
            } else {
                out.push((EntityType::Keyword, label));
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }
}

/// Conversational agent output for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub reply: String,
    pub sentiment: String,
    pub strategy: String,
    pub notes: String,
    /// Intelligence the agent isolated while composing the reply.
    #[serde(default)]
    pub extracted: Option<StructuredIntel>,
}

/// Audio container of a chunk.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Webm,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Sniffs the container from the leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            AudioFormat::Wav
        } else if bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            AudioFormat::Webm
        } else if bytes.starts_with(b"OggS") {
            AudioFormat::Ogg
        } else {
            AudioFormat::Unknown
        }
    }

    /// File extension used when uploading to a transcription worker.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Webm | AudioFormat::Unknown => "webm",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Webm | AudioFormat::Unknown => "audio/webm",
            AudioFormat::Ogg => "audio/ogg",
        }
    }
}

/// Raw output of a transcription worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// ISO 639-1 code when the worker reported one.
    pub language: Option<String>,
    pub confidence: f64,
    /// Seconds of audio covered.
    pub duration: f64,
}

/// One scanner's verdict on a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerVerdict {
    pub risk_score: f64,
    pub is_malicious: bool,
    pub findings: Vec<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl ScannerVerdict {
    pub fn new(risk_score: f64, is_malicious: bool, findings: Vec<String>) -> Self {
        Self {
            risk_score,
            is_malicious,
            findings,
            details: serde_json::Value::Null,
        }
    }
}

/// Aggregated risk assessment for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlScanResult {
    pub url: String,
    pub risk_score: f64,
    pub is_safe: bool,
    pub findings: BTreeSet<String>,
    pub scanner_results: BTreeMap<String, ScannerVerdict>,
    pub scanned_at: DateTime<Utc>,
}

/// Score below which a URL is considered safe.
pub const SAFE_THRESHOLD: f64 = 0.4;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn entity_type_round_trips_through_snake_case() {
        for ty in EntityType::iter() {
            let s = ty.to_string();
            assert_eq!(EntityType::from_str(&s).unwrap(), ty);
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
        assert_eq!(EntityType::BankAccount.to_string(), "bank_account");
    }

    #[test]
    fn ledger_discards_repeat_keys() {
        let mut ledger = EntityLedger::new();
        let first = ExtractedEntity::new(EntityType::Phone, "9876543210", 0.9, "call me");
        let mut second = first.clone();
        second.confidence = 0.2;
        second.context = "another".into();

        assert!(ledger.admit(first));
        assert!(!ledger.admit(second));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entities()[0].confidence, 0.9);
        assert_eq!(ledger.entities()[0].context, "call me");
    }

    #[test]
    fn ledger_key_is_case_sensitive_and_typed() {
        let mut ledger = EntityLedger::new();
        assert!(ledger.admit(ExtractedEntity::new(EntityType::UpiId, "User@oksbi", 0.9, "")));
        assert!(ledger.admit(ExtractedEntity::new(EntityType::UpiId, "user@oksbi", 0.9, "")));
        assert!(ledger.admit(ExtractedEntity::new(EntityType::Email, "user@oksbi", 0.9, "")));
        assert_eq!(ledger.len(), 3);
        assert!(ledger.contains(EntityType::UpiId, "User@oksbi"));
        assert!(!ledger.contains(EntityType::Phone, "User@oksbi"));
    }

    #[test]
    fn context_is_bounded() {
        let long = "x".repeat(500);
        let entity = ExtractedEntity::new(EntityType::Keyword, "otp", 0.3, &long);
        assert_eq!(entity.context.chars().count(), MAX_CONTEXT_CHARS);
    }

    #[test]
    fn intelligence_groups_by_kind() {
        let mut ledger = EntityLedger::new();
        ledger.admit(ExtractedEntity::new(EntityType::Phone, "9876543210", 0.9, ""));
        ledger.admit(ExtractedEntity::new(EntityType::Tactic, "fear", 0.8, ""));
        let intel = ledger.to_intelligence();
        assert!(intel.values(EntityType::Phone).unwrap().contains("9876543210"));
        assert!(intel.0.contains_key("behavioral_tactics"));
        assert_eq!(intel.total(), 2);
    }

    #[test]
    fn intelligence_merge_is_union() {
        let mut a = ExtractedIntelligence::default();
        a.insert(EntityType::Url, "http://a.tk");
        let mut b = ExtractedIntelligence::default();
        b.insert(EntityType::Url, "http://a.tk");
        b.insert(EntityType::Url, "http://b.tk");
        a.merge(&b);
        assert_eq!(a.values(EntityType::Url).unwrap().len(), 2);
    }

    #[test]
    fn structured_intel_routes_unknown_tactics_to_keywords() {
        let intel = StructuredIntel {
            behavioral_tactics: vec!["Fear".into(), "love bombing".into(), " ".into()],
            ..Default::default()
        };
        let pairs = intel.pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains(&(EntityType::Tactic, "Fear")));
        assert!(pairs.contains(&(EntityType::Keyword, "love bombing")));
    }

    #[test]
    fn audio_format_sniffing() {
        let mut wav = b"RIFF\0\0\0\0WAVEfmt ".to_vec();
        wav.extend_from_slice(&[0; 8]);
        assert_eq!(AudioFormat::detect(&wav), AudioFormat::Wav);
        assert_eq!(AudioFormat::detect(&[0x1A, 0x45, 0xDF, 0xA3, 1]), AudioFormat::Webm);
        assert_eq!(AudioFormat::detect(b"OggS...."), AudioFormat::Ogg);
        assert_eq!(AudioFormat::detect(b"xx"), AudioFormat::Unknown);
    }

    #[test]
    fn escalated_tactics() {
        let escalated: Vec<Tactic> = Tactic::iter().filter(|t| t.is_escalated()).collect();
        assert_eq!(escalated, vec![Tactic::Fear, Tactic::Authority, Tactic::Isolation]);
    }

    proptest! {
        #[test]
        fn ledger_stores_each_key_once(values in proptest::collection::vec("[a-c]{1,2}", 0..40)) {
            let mut ledger = EntityLedger::new();
            let mut admitted = 0usize;
            for v in &values {
                if ledger.admit(ExtractedEntity::new(EntityType::Keyword, v.clone(), 0.3, "")) {
                    admitted += 1;
                }
            }
            let unique: HashSet<&String> = values.iter().collect();
            prop_assert_eq!(admitted, unique.len());
            prop_assert_eq!(ledger.len(), unique.len());
        }
    }
}
