// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the delivery ledger on a temp SQLite database,
//! a scripted connector, an in-memory session store, the connection pool
//! and the broadcast engine, wired exactly as the service wires them.

use std::sync::Arc;

use herald_config::model::{DispatchConfig, HeraldConfig, SessionsConfig, StorageConfig};
use herald_core::{
    CustomerDirectory, HeraldError, MessageTemplate, RecipientSelector, SessionProvider,
    StorageAdapter, TenantId,
};
use herald_dispatch::{BroadcastEngine, CreateBroadcast, CreatedBroadcast};
use herald_pool::ConnectionPool;
use herald_storage::SqliteStorage;

use crate::memory_store::MemorySessionStore;
use crate::scripted::{PairingScript, ScriptedConnector};

/// Dispatch settings without pauses, so dispatch tests run instantly.
pub fn fast_dispatch_config() -> DispatchConfig {
    DispatchConfig {
        retry_delay_ms: 0,
        throttle_base_ms: 0,
        throttle_jitter_ms: 0,
        attempt_timeout_secs: 5,
        ..DispatchConfig::default()
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    sessions: SessionsConfig,
    dispatch: DispatchConfig,
    default_script: PairingScript,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            sessions: SessionsConfig::default(),
            dispatch: fast_dispatch_config(),
            default_script: PairingScript::Connect,
        }
    }

    pub fn with_sessions(mut self, sessions: SessionsConfig) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Pairing behaviour for tenants without an explicit script.
    pub fn with_default_script(mut self, script: PairingScript) -> Self {
        self.default_script = script;
        self
    }

    pub async fn build(self) -> Result<TestHarness, HeraldError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| HeraldError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = Arc::new(SqliteStorage::new(storage_config.clone()));
        storage.initialize().await?;

        let connector = Arc::new(ScriptedConnector::with_default(self.default_script));
        let store = Arc::new(MemorySessionStore::new());
        let pool = ConnectionPool::new(self.sessions.clone(), connector.clone(), store.clone());

        let engine = Arc::new(BroadcastEngine::new(
            self.dispatch.clone(),
            storage.clone() as Arc<dyn StorageAdapter>,
            storage.clone() as Arc<dyn CustomerDirectory>,
            Arc::new(pool.clone()) as Arc<dyn SessionProvider>,
        ));

        let config = HeraldConfig {
            storage: storage_config,
            sessions: self.sessions,
            dispatch: self.dispatch,
            ..HeraldConfig::default()
        };

        Ok(TestHarness {
            storage,
            connector,
            store,
            pool,
            engine,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a scripted network and temp storage.
pub struct TestHarness {
    /// SQLite ledger and customer directory (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub connector: Arc<ScriptedConnector>,
    pub store: Arc<MemorySessionStore>,
    pub pool: ConnectionPool,
    pub engine: Arc<BroadcastEngine>,
    pub config: HeraldConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Seeds one customer and returns its id.
    pub async fn add_customer(
        &self,
        tenant: &TenantId,
        name: &str,
        phone: Option<&str>,
    ) -> Result<i64, HeraldError> {
        let customer = self
            .storage
            .insert_customer(tenant, name, phone, None)
            .await?;
        Ok(customer.id)
    }

    /// Seeds `(name, phone)` pairs and returns their ids in order.
    pub async fn add_customers(
        &self,
        tenant: &TenantId,
        customers: &[(&str, &str)],
    ) -> Result<Vec<i64>, HeraldError> {
        let mut ids = Vec::with_capacity(customers.len());
        for (name, phone) in customers {
            ids.push(self.add_customer(tenant, name, Some(phone)).await?);
        }
        Ok(ids)
    }

    /// Creates a draft broadcast of `body` to all of the tenant's customers.
    pub async fn create_broadcast(
        &self,
        tenant: &TenantId,
        body: &str,
    ) -> Result<CreatedBroadcast, HeraldError> {
        self.engine
            .create_broadcast(
                tenant,
                CreateBroadcast {
                    title: None,
                    template: MessageTemplate {
                        body: body.to_string(),
                        media: None,
                    },
                    recipients: RecipientSelector::All,
                },
            )
            .await
    }
}
