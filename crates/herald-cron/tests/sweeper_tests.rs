// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention sweeps against a real ledger.

use std::fs::{self, File};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{TimeZone, Utc};
use herald_config::model::{RetentionConfig, StorageConfig};
use herald_core::{
    Broadcast, BroadcastId, BroadcastStatus, MessageTemplate, NewRecipient, StorageAdapter,
    TenantId,
};
use herald_cron::{RetentionSweeper, SweepReport};
use herald_storage::SqliteStorage;
use tempfile::TempDir;

async fn storage(dir: &TempDir) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("ledger.db").display().to_string(),
        wal_mode: true,
    });
    storage.initialize().await.unwrap();
    Arc::new(storage)
}

async fn seed(storage: &SqliteStorage, id: &str, status: BroadcastStatus, updated_at: &str) {
    let broadcast = Broadcast {
        id: BroadcastId::from(id),
        tenant_id: TenantId::from("t1"),
        title: id.into(),
        template: MessageTemplate {
            body: "Hello {name}".into(),
            media: None,
        },
        status,
        created_at: updated_at.into(),
        updated_at: updated_at.into(),
    };
    let recipients = vec![NewRecipient {
        customer_id: None,
        name: "Ani".into(),
        address: "6281234567890".into(),
        email: None,
    }];
    storage.create_broadcast(&broadcast, &recipients).await.unwrap();
}

fn retention(media_dir: Option<String>) -> RetentionConfig {
    RetentionConfig {
        enabled: true,
        schedule: "0 3 * * *".into(),
        retention_days: 30,
        media_dir,
    }
}

#[tokio::test]
async fn sweep_removes_expired_terminal_broadcasts_only() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;
    let tenant = TenantId::from("t1");

    seed(&storage, "old-completed", BroadcastStatus::Completed, "2026-01-05T10:00:00.000Z").await;
    seed(&storage, "old-partial", BroadcastStatus::Partial, "2026-01-20T10:00:00.000Z").await;
    seed(&storage, "old-draft", BroadcastStatus::Draft, "2026-01-05T10:00:00.000Z").await;
    seed(&storage, "old-sending", BroadcastStatus::Sending, "2026-01-05T10:00:00.000Z").await;
    seed(&storage, "recent-failed", BroadcastStatus::Failed, "2026-03-01T10:00:00.000Z").await;

    let sweeper = RetentionSweeper::new(&retention(None), storage.clone()).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 3, 0, 0).unwrap();
    let report = sweeper.sweep_at(now).await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            broadcasts_removed: 2,
            media_removed: 0
        }
    );
    for gone in ["old-completed", "old-partial"] {
        let id = BroadcastId::from(gone);
        assert!(storage.get_broadcast(&tenant, &id).await.unwrap().is_none());
        assert!(storage.list_recipients(&id).await.unwrap().is_empty());
    }
    for kept in ["old-draft", "old-sending", "recent-failed"] {
        let id = BroadcastId::from(kept);
        assert!(storage.get_broadcast(&tenant, &id).await.unwrap().is_some());
        assert_eq!(storage.list_recipients(&id).await.unwrap().len(), 1);
    }

    // A second sweep at the same instant finds nothing new.
    assert_eq!(sweeper.sweep_at(now).await.unwrap(), SweepReport::default());
}

#[tokio::test]
async fn sweep_prunes_media_directory() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage(&dir).await;
    let media = dir.path().join("media");
    fs::create_dir_all(&media).unwrap();

    let old = media.join("expired.jpg");
    let fresh = media.join("today.jpg");
    fs::write(&old, b"jpeg").unwrap();
    fs::write(&fresh, b"jpeg").unwrap();
    let sixty_days = Duration::from_secs(60 * 24 * 3600);
    File::options()
        .write(true)
        .open(&old)
        .unwrap()
        .set_modified(SystemTime::now() - sixty_days)
        .unwrap();

    let config = retention(Some(media.display().to_string()));
    let sweeper = RetentionSweeper::new(&config, storage).unwrap();
    let report = sweeper.sweep_once().await.unwrap();

    assert_eq!(report.media_removed, 1);
    assert!(!old.exists());
    assert!(fresh.exists());
}
