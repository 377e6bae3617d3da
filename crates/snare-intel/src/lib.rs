// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intelligence extraction for the Snare honeypot.
//!
//! Text from the scammer (typed, or transcribed from a call) is run through
//! fixed identifier patterns, tiered scam keywords, and tactic indicator
//! phrases. The combined evidence yields a threat level, and candidates are
//! deduplicated against the owning session before being reported as new.

pub mod keywords;
pub mod patterns;
pub mod pipeline;
pub mod tactics;
pub mod threat;

pub use keywords::{KeywordHit, Severity, detect_keywords};
pub use patterns::extract_structured;
pub use pipeline::{Analysis, IntelligencePipeline, PipelineOutcome, structured_to_entities};
pub use tactics::classify_tactics;
pub use threat::threat_score;
