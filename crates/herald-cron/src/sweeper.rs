// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven retention sweeps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, TimeDelta, Utc};
use croner::Cron;
use herald_config::model::RetentionConfig;
use herald_core::{HeraldError, StorageAdapter};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::media::prune_media_dir;

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub broadcasts_removed: u64,
    pub media_removed: u64,
}

/// Prunes expired ledger rows and media files.
pub struct RetentionSweeper {
    storage: Arc<dyn StorageAdapter>,
    schedule: Cron,
    retention: TimeDelta,
    media_dir: Option<PathBuf>,
}

impl RetentionSweeper {
    pub fn new(
        config: &RetentionConfig,
        storage: Arc<dyn StorageAdapter>,
    ) -> Result<Self, HeraldError> {
        let schedule = config.schedule.parse::<Cron>().map_err(|e| {
            HeraldError::Config(format!(
                "invalid retention schedule '{}': {e}",
                config.schedule
            ))
        })?;
        if config.retention_days == 0 {
            return Err(HeraldError::Config(
                "retention.retention_days must be at least 1".into(),
            ));
        }

        Ok(Self {
            storage,
            schedule,
            retention: TimeDelta::days(i64::from(config.retention_days)),
            media_dir: config.media_dir.as_ref().map(PathBuf::from),
        })
    }

    /// Everything last touched before this instant is expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }

    /// Next scheduled sweep strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, HeraldError> {
        self.schedule
            .find_next_occurrence(&now, false)
            .map_err(|e| HeraldError::Internal(format!("no upcoming retention sweep: {e}")))
    }

    pub async fn sweep_once(&self) -> Result<SweepReport, HeraldError> {
        self.sweep_at(Utc::now()).await
    }

    /// Runs one sweep as if the clock read `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, HeraldError> {
        let cutoff = self.cutoff(now);
        let cutoff_ts = cutoff.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();

        let broadcasts_removed = self.storage.prune_terminal_before(&cutoff_ts).await?;

        let media_removed = match &self.media_dir {
            Some(dir) => prune_media_dir(dir, SystemTime::from(cutoff)).await?,
            None => 0,
        };

        let report = SweepReport {
            broadcasts_removed,
            media_removed,
        };
        info!(
            cutoff = %cutoff_ts,
            broadcasts_removed,
            media_removed,
            "retention sweep finished"
        );
        Ok(report)
    }

    /// Sweeps on schedule until `cancel` fires. A failed sweep is logged and
    /// retried at the next scheduled time.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            let now = Utc::now();
            let next = match self.next_run_after(now) {
                Ok(next) => next,
                Err(e) => {
                    warn!(error = %e, "retention sweeper stopping");
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, "next retention sweep scheduled");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("retention sweeper cancelled");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.sweep_once().await {
                warn!(error = %e, "retention sweep failed");
            }
        }
    }
}
