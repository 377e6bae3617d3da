// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the Snare core.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility so
//! they can be held as `Arc<dyn Trait>`.

pub mod adapter;
pub mod intel;
pub mod object;
pub mod provider;
pub mod report;
pub mod scanner;
pub mod store;
pub mod transcriber;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use intel::IntelligenceSink;
pub use object::ObjectStore;
pub use provider::{ConversationAgent, IntelExtractor, ScamClassifier};
pub use report::ReportSink;
pub use scanner::UrlScanner;
pub use store::{Condition, DocumentStore, Filter, Update, UpdateOutcome};
pub use transcriber::Transcriber;
