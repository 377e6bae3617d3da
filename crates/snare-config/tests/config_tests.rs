// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Snare configuration system.

use snare_config::diagnostic::ConfigError;
use snare_config::model::{SnareConfig, StorageBackend};
use snare_config::{load_and_validate_str, load_config, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_snare_config() {
    let toml = r#"
[agent]
name = "honeypot-1"
log_level = "debug"

[transcription]
buffer_threshold_ms = 3000.0
allowed_languages = ["en", "hi"]
default_language = "hi"
api_key = "gsk-test"
timeout_secs = 20

[url_scan]
cache_ttl_secs = 600
virustotal_api_key = "vt-key"
urlscan_enabled = true
rdap_enabled = false

[storage]
backend = "memory"
database_path = "/tmp/snare-test.db"
wal_mode = false

[object_storage]
endpoint = "http://minio.local:9000"
bucket = "calls"
local_path = "/tmp/snare-objects"

[reporting]
callback_url = "https://hackathon.example.com/api/updateHoneyPotFinalResult"

[live]
queue_wait_secs = 10
transcript_window = 6
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "honeypot-1");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.transcription.buffer_threshold_ms, 3000.0);
    assert_eq!(config.transcription.default_language, "hi");
    assert_eq!(config.transcription.api_key.as_deref(), Some("gsk-test"));
    assert_eq!(config.url_scan.cache_ttl_secs, 600);
    assert_eq!(config.url_scan.virustotal_api_key.as_deref(), Some("vt-key"));
    assert!(config.url_scan.urlscan_enabled);
    assert!(!config.url_scan.rdap_enabled);
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.object_storage.bucket, "calls");
    assert!(config.reporting.callback_url.is_some());
    assert_eq!(config.live.transcript_window, 6);
}

/// Missing sections fall back to compiled defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("[agent]\nname = \"x\"\n").expect("should parse");
    let defaults = SnareConfig::default();
    assert_eq!(
        config.transcription.buffer_threshold_ms,
        defaults.transcription.buffer_threshold_ms
    );
    assert_eq!(config.url_scan.cache_ttl_secs, 3600);
    assert_eq!(config.live.queue_wait_secs, 30);
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let err = load_config_from_str("[telemetry]\nenabled = true\n").expect_err("should reject");
    assert!(err.to_string().contains("telemetry"), "got: {err}");
}

/// A typo in a section key surfaces as UnknownKey with a suggestion.
#[test]
fn typo_produces_unknown_key_with_suggestion() {
    let toml = r#"
[transcription]
buffer_treshold_ms = 2000.0
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "buffer_treshold_ms"
                && suggestion.as_deref() == Some("buffer_threshold_ms")
                && valid_keys.contains("allowed_languages")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[url_scan]
cache_ttl_secs = "one hour"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("cache_ttl_secs"))),
        "got: {errors:?}"
    );
}

/// Semantically invalid values pass deserialization but fail validation.
#[test]
fn validation_rejects_default_language_outside_allow_list() {
    let toml = r#"
[transcription]
allowed_languages = ["en", "hi"]
default_language = "ta"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(matches!(&errors[0], ConfigError::Validation { message } if message.contains("ta")));
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "naem".to_string(),
        suggestion: Some("name".to_string()),
        valid_keys: "name, log_level, mission_context".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `name`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("naem"));
}

/// Local file and `SNARE_*` variables layer over the defaults, with
/// underscore-containing section names mapped correctly.
#[test]
fn env_vars_override_local_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "snare.toml",
            r#"
[agent]
name = "from-file"

[url_scan]
cache_ttl_secs = 120
"#,
        )?;
        jail.set_env("SNARE_URL_SCAN_CACHE_TTL_SECS", "60");
        jail.set_env("SNARE_OBJECT_STORAGE_BUCKET", "from-env");
        jail.set_env("SNARE_REPORTING_TIMEOUT_SECS", "3");

        let config = load_config().expect("should load");
        assert_eq!(config.agent.name, "from-file");
        assert_eq!(config.url_scan.cache_ttl_secs, 60);
        assert_eq!(config.object_storage.bucket, "from-env");
        assert_eq!(config.reporting.timeout_secs, 3);
        Ok(())
    });
}
