// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL scanner trait.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::types::ScannerVerdict;

/// One independent source of URL risk.
///
/// `Ok(None)` means the scanner is unavailable (not configured, rate
/// limited, no verdict yet). Both `Ok(None)` and `Err` count as "no vote"
/// for the aggregate.
#[async_trait]
pub trait UrlScanner: Send + Sync + 'static {
    /// Key under which this scanner's verdict is recorded.
    fn name(&self) -> &str;

    async fn scan(&self, url: &str) -> Result<Option<ScannerVerdict>, SnareError>;
}
