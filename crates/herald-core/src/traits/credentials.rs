// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-tenant credential storage.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{Credentials, TenantId};

/// Stores the credential material of each tenant's session so it survives restarts.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Makes sure the tenant's credential location exists.
    async fn prepare(&self, tenant: &TenantId) -> Result<(), HeraldError>;

    async fn load(&self, tenant: &TenantId) -> Result<Option<Credentials>, HeraldError>;

    async fn save(&self, tenant: &TenantId, credentials: &Credentials) -> Result<(), HeraldError>;

    /// Removes all stored credentials for the tenant. Succeeds when nothing is stored.
    async fn purge(&self, tenant: &TenantId) -> Result<(), HeraldError>;
}
