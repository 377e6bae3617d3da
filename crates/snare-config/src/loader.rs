// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./snare.toml` > `~/.config/snare/snare.toml` > `/etc/snare/snare.toml`
//! with environment variable overrides via `SNARE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SnareConfig;

/// Top-level sections, longest first so `object_storage_` wins over `storage_`.
const SECTIONS: &[&str] = &[
    "object_storage",
    "transcription",
    "reporting",
    "url_scan",
    "storage",
    "agent",
    "live",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/snare/snare.toml` (system-wide)
/// 3. `~/.config/snare/snare.toml` (user XDG config)
/// 4. `./snare.toml` (local directory)
/// 5. `SNARE_*` environment variables
pub fn load_config() -> Result<SnareConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SnareConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SnareConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SnareConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SnareConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SnareConfig::default()))
        .merge(Toml::file("/etc/snare/snare.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("snare/snare.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("snare.toml"))
        .merge(env_provider())
}

/// Maps a prefix-stripped, lowercased env key to a dotted config path.
///
/// Uses an explicit section table instead of `split("_")` because both
/// section and key names contain underscores:
/// `SNARE_URL_SCAN_CACHE_TTL_SECS` must become `url_scan.cache_ttl_secs`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("SNARE_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("agent_log_level"), "agent.log_level");
        assert_eq!(
            map_env_key("url_scan_virustotal_api_key"),
            "url_scan.virustotal_api_key"
        );
        assert_eq!(
            map_env_key("object_storage_endpoint"),
            "object_storage.endpoint"
        );
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
