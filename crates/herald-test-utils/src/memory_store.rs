// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::{Credentials, HeraldError, SessionStore, TenantId};

/// A [`SessionStore`] that keeps credentials in a map.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<TenantId, Option<Credentials>>>,
    purges: Mutex<HashMap<TenantId, usize>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds credentials, as if the tenant had paired in an earlier run.
    pub async fn seed(&self, tenant: &TenantId, credentials: Credentials) {
        self.entries
            .lock()
            .await
            .insert(tenant.clone(), Some(credentials));
    }

    /// Whether the tenant has credentials saved.
    pub async fn has_credentials(&self, tenant: &TenantId) -> bool {
        matches!(self.entries.lock().await.get(tenant), Some(Some(_)))
    }

    /// How many times the tenant's credentials were purged.
    pub async fn purge_count(&self, tenant: &TenantId) -> usize {
        self.purges.lock().await.get(tenant).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn prepare(&self, tenant: &TenantId) -> Result<(), HeraldError> {
        self.entries
            .lock()
            .await
            .entry(tenant.clone())
            .or_insert(None);
        Ok(())
    }

    async fn load(&self, tenant: &TenantId) -> Result<Option<Credentials>, HeraldError> {
        Ok(self.entries.lock().await.get(tenant).cloned().flatten())
    }

    async fn save(&self, tenant: &TenantId, credentials: &Credentials) -> Result<(), HeraldError> {
        self.entries
            .lock()
            .await
            .insert(tenant.clone(), Some(credentials.clone()));
        Ok(())
    }

    async fn purge(&self, tenant: &TenantId) -> Result<(), HeraldError> {
        self.entries.lock().await.remove(tenant);
        *self.purges.lock().await.entry(tenant.clone()).or_insert(0) += 1;
        Ok(())
    }
}
