// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging and metric registration for the binary.

use metrics::describe_counter;

/// Installs the fmt subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("snare={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Register all Snare metric descriptions.
///
/// Uses the metrics-rs facade, so whichever recorder is installed picks
/// these up.
pub fn register_metrics() {
    describe_counter!(
        "snare_entities_extracted_total",
        "Entities recorded after dedup, by type"
    );
    describe_counter!("snare_url_scans_total", "URLs scored by the aggregator");
    describe_counter!(
        "snare_url_scan_cache_hits_total",
        "URL scores served from the cache"
    );
    describe_counter!("snare_reports_sent_total", "Mandatory reports delivered");
    describe_counter!(
        "snare_sessions_terminated_total",
        "Sessions closed by the message limit"
    );
}
