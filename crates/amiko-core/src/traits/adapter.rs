// SPDX-FileCopyrightText: 2026 Amiko Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle surface shared by every adapter.

use async_trait::async_trait;

use crate::error::AmikoError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health, and teardown for a companion adapter.
///
/// The companion talks to the world through three adapters: a channel it
/// chats over, a provider it thinks with, and a storage backend it remembers
/// into. Each one implements this trait so the binary can report on and
/// shut down all of them uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short identifier for logs and health reports, e.g. `"telegram"`.
    fn name(&self) -> &str;

    /// Version of the adapter implementation.
    fn version(&self) -> semver::Version;

    /// Which of the three adapter roles this instance fills.
    fn adapter_type(&self) -> AdapterType;

    /// Probes the adapter's backing service and reports its status.
    ///
    /// A failed probe should come back as [`HealthStatus::Unhealthy`] with a
    /// reason rather than an `Err`; the error path is for probes that could
    /// not run at all.
    async fn health_check(&self) -> Result<HealthStatus, AmikoError>;

    /// Releases held resources. Called once during shutdown; adapters must
    /// tolerate in-flight work being abandoned.
    async fn shutdown(&self) -> Result<(), AmikoError>;
}
