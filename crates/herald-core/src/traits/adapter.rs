// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every backend.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{AdapterType, HealthStatus};

/// Implemented by the delivery ledger and by each channel transport, so the
/// service can report their health and stop them uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short backend name, e.g. `sqlite` or `relay`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, HeraldError>;

    /// Releases connections and background tasks. Called once at shutdown.
    async fn shutdown(&self) -> Result<(), HeraldError>;
}
