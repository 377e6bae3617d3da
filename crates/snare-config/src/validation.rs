// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: positive thresholds and
//! timeouts, a coherent language allow-list, and parseable endpoint URLs.

use crate::diagnostic::ConfigError;
use crate::model::{SnareConfig, StorageBackend};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SnareConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let stt = &config.transcription;
    if stt.buffer_threshold_ms.is_nan() || stt.buffer_threshold_ms <= 0.0 {
        errors.push(ConfigError::invalid(format!(
            "transcription.buffer_threshold_ms must be positive, got {}",
            stt.buffer_threshold_ms
        )));
    }
    if stt.allowed_languages.is_empty() {
        errors.push(ConfigError::invalid(
            "transcription.allowed_languages must not be empty",
        ));
    } else if !stt.allowed_languages.contains(&stt.default_language) {
        errors.push(ConfigError::invalid(format!(
            "transcription.default_language `{}` is not in allowed_languages {:?}",
            stt.default_language, stt.allowed_languages
        )));
    }
    if stt.timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "transcription.timeout_secs must be at least 1",
        ));
    }
    if stt.max_chunk_bytes == 0 {
        errors.push(ConfigError::invalid(
            "transcription.max_chunk_bytes must be at least 1",
        ));
    }
    check_http_url(&mut errors, "transcription.endpoint", Some(&stt.endpoint));

    let scan = &config.url_scan;
    if scan.cache_ttl_secs == 0 {
        errors.push(ConfigError::invalid("url_scan.cache_ttl_secs must be at least 1"));
    }
    if scan.request_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "url_scan.request_timeout_secs must be at least 1",
        ));
    }
    if scan.rdap_enabled {
        check_http_url(&mut errors, "url_scan.rdap_endpoint", Some(&scan.rdap_endpoint));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::invalid(
            "storage.database_path must not be empty",
        ));
    }

    check_http_url(
        &mut errors,
        "object_storage.endpoint",
        config.object_storage.endpoint.as_deref(),
    );
    if config.object_storage.local_path.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "object_storage.local_path must not be empty",
        ));
    }

    check_http_url(
        &mut errors,
        "reporting.callback_url",
        config.reporting.callback_url.as_deref(),
    );

    if config.live.queue_wait_secs == 0 {
        errors.push(ConfigError::invalid("live.queue_wait_secs must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(errors: &mut Vec<ConfigError>, key: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ConfigError::invalid(format!(
            "{key} must use http or https, got `{}`",
            parsed.scheme()
        ))),
        Err(e) => errors.push(ConfigError::invalid(format!(
            "{key} `{value}` is not a valid URL: {e}"
        ))),
    }
}
