// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Snare honeypot.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Snare configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SnareConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Streaming transcription settings.
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// URL scanner settings.
    #[serde(default)]
    pub url_scan: UrlScanConfig,

    /// Document store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Blob storage for recorded audio.
    #[serde(default)]
    pub object_storage: ObjectStorageConfig,

    /// Mandatory-report delivery.
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Live-call behavior.
    #[serde(default)]
    pub live: LiveConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs and report payloads.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Free-form mission briefing handed to the conversational agent.
    #[serde(default = "default_mission_context")]
    pub mission_context: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            mission_context: default_mission_context(),
        }
    }
}

fn default_agent_name() -> String {
    "snare".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mission_context() -> String {
    "Keep the caller engaged, sound cooperative but slow, and steer them into \
     revealing payment details, phone numbers, and links."
        .to_string()
}

/// Streaming transcription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptionConfig {
    /// Buffered audio (milliseconds) that triggers a transcription.
    #[serde(default = "default_buffer_threshold_ms")]
    pub buffer_threshold_ms: f64,

    /// Languages a call may be locked to.
    #[serde(default = "default_allowed_languages")]
    pub allowed_languages: Vec<String>,

    /// Language used before detection and for out-of-list detections.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Base URL of an OpenAI-compatible transcription API.
    #[serde(default = "default_transcription_endpoint")]
    pub endpoint: String,

    /// API key for the transcription endpoint. `None` falls back to `GROQ_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with each request.
    #[serde(default = "default_transcription_model")]
    pub model: String,

    /// Upper bound on a single transcription call.
    #[serde(default = "default_transcription_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest accepted audio chunk.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_threshold_ms: default_buffer_threshold_ms(),
            allowed_languages: default_allowed_languages(),
            default_language: default_language(),
            endpoint: default_transcription_endpoint(),
            api_key: None,
            model: default_transcription_model(),
            timeout_secs: default_transcription_timeout_secs(),
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }
}

fn default_buffer_threshold_ms() -> f64 {
    2500.0
}

fn default_allowed_languages() -> Vec<String> {
    vec!["en".to_string(), "hi".to_string()]
}

fn default_language() -> String {
    "en".to_string()
}

fn default_transcription_endpoint() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_transcription_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

fn default_transcription_timeout_secs() -> u64 {
    30
}

fn default_max_chunk_bytes() -> usize {
    5 * 1024 * 1024
}

/// URL scanner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UrlScanConfig {
    /// How long an aggregated result is reused.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// VirusTotal API key. `None` disables the reputation scanner.
    #[serde(default)]
    pub virustotal_api_key: Option<String>,

    /// Minimum spacing between VirusTotal submissions (free tier: 4/min).
    #[serde(default = "default_virustotal_min_interval_secs")]
    pub virustotal_min_interval_secs: u64,

    /// Enable the urlscan.io sandbox scanner.
    #[serde(default)]
    pub urlscan_enabled: bool,

    /// urlscan.io API key.
    #[serde(default)]
    pub urlscan_api_key: Option<String>,

    /// Enable the RDAP registration-age scanner.
    #[serde(default = "default_true")]
    pub rdap_enabled: bool,

    /// RDAP bootstrap endpoint.
    #[serde(default = "default_rdap_endpoint")]
    pub rdap_endpoint: String,

    /// Per-request timeout for external scanners.
    #[serde(default = "default_scan_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for UrlScanConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            virustotal_api_key: None,
            virustotal_min_interval_secs: default_virustotal_min_interval_secs(),
            urlscan_enabled: false,
            urlscan_api_key: None,
            rdap_enabled: true,
            rdap_endpoint: default_rdap_endpoint(),
            request_timeout_secs: default_scan_request_timeout_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_virustotal_min_interval_secs() -> u64 {
    15
}

fn default_rdap_endpoint() -> String {
    "https://rdap.org".to_string()
}

fn default_scan_request_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

/// Which document store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("snare").join("snare.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("snare.db"))
        .display()
        .to_string()
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStorageConfig {
    /// Base URL of an S3-compatible endpoint. `None` stores locally only.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Bucket name on the remote endpoint.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Local directory used directly or as fallback.
    #[serde(default = "default_object_local_path")]
    pub local_path: String,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: default_bucket(),
            local_path: default_object_local_path(),
        }
    }
}

fn default_bucket() -> String {
    "snare".to_string()
}

fn default_object_local_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("snare").join("objects"))
        .unwrap_or_else(|| std::path::PathBuf::from("storage/audio"))
        .display()
        .to_string()
}

/// Mandatory-report delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReportingConfig {
    /// Webhook receiving report payloads. `None` only logs reports.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// Per-request timeout for the webhook.
    #[serde(default = "default_report_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            callback_url: None,
            timeout_secs: default_report_timeout_secs(),
        }
    }
}

fn default_report_timeout_secs() -> u64 {
    10
}

/// Live-call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfig {
    /// Bounded wait of the AI response loop before it re-checks cancellation.
    #[serde(default = "default_queue_wait_secs")]
    pub queue_wait_secs: u64,

    /// Transcript entries handed to the agent as history.
    #[serde(default = "default_transcript_window")]
    pub transcript_window: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            queue_wait_secs: default_queue_wait_secs(),
            transcript_window: default_transcript_window(),
        }
    }
}

fn default_queue_wait_secs() -> u64 {
    30
}

fn default_transcript_window() -> usize {
    10
}
