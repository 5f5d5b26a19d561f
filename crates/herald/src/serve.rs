// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` command implementation.
//!
//! Opens the delivery ledger, builds the connection pool over the relay
//! transport, starts the broadcast engine, the retention sweeper and the HTTP
//! gateway, and tears everything down in order on SIGINT/SIGTERM.

use std::sync::Arc;

use herald_config::model::HeraldConfig;
use herald_core::{
    CustomerDirectory, HeraldError, PluginAdapter, SessionProvider, StorageAdapter,
};
use herald_cron::RetentionSweeper;
use herald_dispatch::BroadcastEngine;
use herald_gateway::{GatewayState, MediaStore, TenantTokens};
use herald_pool::{ConnectionPool, FileSessionStore};
use herald_relay::HttpRelayConnector;
use herald_storage::SqliteStorage;
use tracing::{error, info, warn};

use crate::shutdown;

pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    crate::init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting herald serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let connector = Arc::new(HttpRelayConnector::new(&config.relay)?);
    let store = Arc::new(FileSessionStore::new(&config.sessions.credentials_dir));
    let pool = ConnectionPool::new(config.sessions.clone(), connector.clone(), store);

    let engine = Arc::new(BroadcastEngine::new(
        config.dispatch.clone(),
        storage.clone() as Arc<dyn StorageAdapter>,
        storage.clone() as Arc<dyn CustomerDirectory>,
        Arc::new(pool.clone()) as Arc<dyn SessionProvider>,
    ));

    let cancel = shutdown::install_signal_handler();

    let sweeper_task = if config.retention.enabled {
        let sweeper = RetentionSweeper::new(&config.retention, storage.clone())?;
        let sweeper_cancel = cancel.child_token();
        info!(schedule = %config.retention.schedule, "retention sweeper started");
        Some(tokio::spawn(async move {
            sweeper.run(sweeper_cancel).await;
        }))
    } else {
        info!("retention sweeper disabled by configuration");
        None
    };

    if config.gateway.tokens.is_empty() {
        warn!("gateway.tokens is empty -- every API request will be rejected");
    }
    let tokens = TenantTokens::new(config.gateway.tokens.clone());
    let mut state = GatewayState::new(engine.clone(), pool.clone(), tokens);
    match (&config.retention.media_dir, &config.gateway.public_url) {
        (Some(dir), Some(url)) => {
            info!(dir = %dir, public_url = %url, "media uploads enabled");
            state = state.with_media(MediaStore::new(
                dir,
                url,
                config.gateway.max_upload_bytes,
            ));
        }
        (Some(_), None) => {
            warn!("retention.media_dir is set without gateway.public_url; uploads stay disabled");
        }
        _ => {}
    }

    let served = herald_gateway::start_server(&config.gateway, state, cancel.clone()).await;
    if let Err(ref e) = served {
        error!(error = %e, "gateway stopped unexpectedly");
    }

    info!("shutting down");
    cancel.cancel();
    engine.shutdown();
    pool.shutdown().await;
    if let Err(e) = connector.shutdown().await {
        warn!(error = %e, "relay connector shutdown failed");
    }
    if let Some(task) = sweeper_task {
        let _ = task.await;
    }
    storage.close().await?;
    info!("herald stopped");

    served
}
