// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter and CustomerDirectory traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use herald_config::model::StorageConfig;
use herald_core::{
    AdapterType, Broadcast, BroadcastId, BroadcastStatistics, BroadcastStatus, BroadcastSummary,
    Customer, CustomerDirectory, DateRange, DeliveryOutcome, HealthStatus, HeraldError,
    NewRecipient, PluginAdapter, RecipientRecord, RecipientSelector, StatusCounts,
    StorageAdapter, TenantId,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed delivery ledger.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, HeraldError> {
        self.db.get().ok_or_else(|| HeraldError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Adds a customer to the directory table.
    ///
    /// The directory is owned by the surrounding application; this exists for
    /// seeding and tests.
    pub async fn insert_customer(
        &self,
        tenant: &TenantId,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Customer, HeraldError> {
        queries::customers::insert_customer(self.db()?, tenant, name, phone, email).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), HeraldError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HeraldError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn create_broadcast(
        &self,
        broadcast: &Broadcast,
        recipients: &[NewRecipient],
    ) -> Result<(), HeraldError> {
        queries::broadcasts::insert_broadcast(self.db()?, broadcast, recipients).await
    }

    async fn get_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<Option<Broadcast>, HeraldError> {
        queries::broadcasts::get_broadcast(self.db()?, tenant, id).await
    }

    async fn list_broadcasts(
        &self,
        tenant: &TenantId,
        status: Option<BroadcastStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<BroadcastSummary>, u64), HeraldError> {
        queries::broadcasts::list_broadcasts(self.db()?, tenant, status, limit, offset).await
    }

    async fn mark_sending(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<bool, HeraldError> {
        queries::broadcasts::mark_sending(self.db()?, tenant, id).await
    }

    async fn set_broadcast_status(
        &self,
        id: &BroadcastId,
        status: BroadcastStatus,
    ) -> Result<(), HeraldError> {
        queries::broadcasts::set_status(self.db()?, id, status).await
    }

    async fn pending_recipients(
        &self,
        id: &BroadcastId,
    ) -> Result<Vec<RecipientRecord>, HeraldError> {
        queries::recipients::pending_recipients(self.db()?, id).await
    }

    async fn list_recipients(
        &self,
        id: &BroadcastId,
    ) -> Result<Vec<RecipientRecord>, HeraldError> {
        queries::recipients::list_recipients(self.db()?, id).await
    }

    async fn record_outcome(
        &self,
        record_id: i64,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, HeraldError> {
        queries::recipients::record_outcome(self.db()?, record_id, outcome).await
    }

    async fn status_counts(&self, id: &BroadcastId) -> Result<StatusCounts, HeraldError> {
        queries::recipients::status_counts(self.db()?, id).await
    }

    async fn delete_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<(), HeraldError> {
        queries::broadcasts::delete_broadcast(self.db()?, tenant, id).await
    }

    async fn statistics(
        &self,
        tenant: &TenantId,
        range: &DateRange,
    ) -> Result<BroadcastStatistics, HeraldError> {
        queries::statistics::statistics(self.db()?, tenant, range).await
    }

    async fn prune_terminal_before(&self, cutoff: &str) -> Result<u64, HeraldError> {
        queries::broadcasts::prune_terminal_before(self.db()?, cutoff).await
    }
}

#[async_trait]
impl CustomerDirectory for SqliteStorage {
    async fn customers_for(
        &self,
        tenant: &TenantId,
        selector: &RecipientSelector,
    ) -> Result<Vec<Customer>, HeraldError> {
        let customers = queries::customers::customers_for(self.db()?, tenant, selector).await?;
        if let RecipientSelector::Customers(ids) = selector {
            let unresolved: Vec<i64> = ids
                .iter()
                .copied()
                .filter(|id| !customers.iter().any(|c| c.id == *id))
                .collect();
            if !unresolved.is_empty() {
                warn!(
                    tenant = %tenant,
                    ?unresolved,
                    "selected customers are unknown to this tenant and were left out"
                );
            }
        }
        Ok(customers)
    }
}
