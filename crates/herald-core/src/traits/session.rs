// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between broadcast dispatch and the connection pool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::channel::DeliveryChannel;
use crate::types::TenantId;

/// Hands out ready-to-use sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    /// Returns a connected session for the tenant, or
    /// [`HeraldError::SessionUnavailable`] when none can be produced without operator action.
    async fn acquire_session(&self, tenant: &TenantId)
    -> Result<Arc<dyn DeliveryChannel>, HeraldError>;
}
