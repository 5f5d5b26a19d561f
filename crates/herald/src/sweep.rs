// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald sweep` command implementation.

use std::sync::Arc;

use herald_config::model::HeraldConfig;
use herald_core::{HeraldError, StorageAdapter};
use herald_cron::RetentionSweeper;
use herald_storage::SqliteStorage;

/// Runs one retention sweep and prints what it removed as JSON.
pub async fn run_sweep(config: HeraldConfig) -> Result<(), HeraldError> {
    crate::init_tracing(&config.service.log_level);

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;

    let sweeper = RetentionSweeper::new(&config.retention, storage.clone())?;
    let report = sweeper.sweep_once().await;
    storage.close().await?;
    let report = report?;

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| HeraldError::Internal(format!("failed to render sweep report: {e}")))?;
    println!("{json}");
    Ok(())
}
