// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Snare integration tests.
//!
//! Provides mock collaborators and a test harness for fast, deterministic,
//! CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockClassifier`] and [`MockAgent`] - scripted LLM collaborators
//! - [`MockTranscriber`], [`FakeScanner`], [`RecordingReportSink`] - scripted
//!   adapters for the audio, URL, and reporting seams
//! - [`TestHarness`] - a [`snare_agent::MessageEngine`] wired over mocks

pub mod harness;
pub mod mock_adapters;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_adapters::{FakeScanner, MockTranscriber, RecordingReportSink};
pub use mock_provider::{MockAgent, MockClassifier};
