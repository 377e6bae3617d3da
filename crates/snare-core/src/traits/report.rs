// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting collaborator trait.

use async_trait::async_trait;

use crate::error::SnareError;
use crate::session::SessionDocument;
use crate::traits::adapter::PluginAdapter;

/// Delivers the mandatory report for a session.
///
/// Invoked at most once per session; retries and delivery guarantees are
/// the implementation's concern.
#[async_trait]
pub trait ReportSink: PluginAdapter {
    async fn send_report(&self, session: &SessionDocument) -> Result<(), SnareError>;
}
