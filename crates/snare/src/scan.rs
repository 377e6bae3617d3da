// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `snare scan` command implementation.

use snare_config::SnareConfig;
use snare_core::SnareError;
use snare_urlscan::UrlRiskAggregator;
use tracing::info;

/// Scores every URL with the heuristic scanner plus whichever external
/// scanners are configured, and prints the results as JSON.
pub async fn run_scan(config: &SnareConfig, urls: &[String]) -> Result<(), SnareError> {
    let aggregator = UrlRiskAggregator::from_config(&config.url_scan)?;
    info!(count = urls.len(), scanners = ?aggregator.scanner_names(), "scanning");

    let results = aggregator.scan_many(urls).await;
    let rendered = serde_json::to_string_pretty(&results)
        .map_err(|e| SnareError::Internal(format!("cannot render scan results: {e}")))?;
    println!("{rendered}");
    Ok(())
}
