// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL risk scanning.
//!
//! [`UrlRiskAggregator`] fans a URL out to every registered [`UrlScanner`]
//! and fuses the verdicts: the mean of the scores that came back, floored
//! at 0.8 when two or more scanners call the URL malicious. Scanners that
//! are unconfigured or fail simply do not vote.
//!
//! [`UrlScanner`]: snare_core::UrlScanner

pub mod aggregator;
pub mod heuristic;
pub mod rdap;
pub mod urlscan_io;
pub mod virustotal;

pub use aggregator::{Clock, UrlRiskAggregator};
pub use heuristic::HeuristicScanner;
pub use rdap::RdapScanner;
pub use urlscan_io::UrlscanIoScanner;
pub use virustotal::VirusTotalScanner;
