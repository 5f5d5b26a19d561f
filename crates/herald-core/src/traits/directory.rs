// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to the externally owned customer directory.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{Customer, RecipientSelector, TenantId};

#[async_trait]
pub trait CustomerDirectory: Send + Sync + 'static {
    /// Resolves a selector to the tenant's matching customers, in ascending id order.
    ///
    /// Ids that are unknown or belong to another tenant are left out.
    async fn customers_for(
        &self,
        tenant: &TenantId,
        selector: &RecipientSelector,
    ) -> Result<Vec<Customer>, HeraldError>;
}
