// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast operations.

use herald_core::{
    Broadcast, BroadcastId, BroadcastStatus, BroadcastSummary, HeraldError, NewRecipient,
    TenantId, now_timestamp,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{BROADCAST_COLUMNS, broadcast_from_row, counts_from_row};
use crate::queries::TERMINAL_STATUSES;

/// Insert a broadcast and all of its pending recipient records in one transaction.
pub async fn insert_broadcast(
    db: &Database,
    broadcast: &Broadcast,
    recipients: &[NewRecipient],
) -> Result<(), HeraldError> {
    let broadcast = broadcast.clone();
    let recipients = recipients.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO broadcasts (id, tenant_id, title, body, media_ref, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    broadcast.id.0,
                    broadcast.tenant_id.0,
                    broadcast.title,
                    broadcast.template.body,
                    broadcast.template.media.as_ref().map(|m| m.0.as_str()),
                    broadcast.status.to_string(),
                    broadcast.created_at,
                    broadcast.updated_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO recipients (broadcast_id, customer_id, name, address, email, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
                )?;
                for r in &recipients {
                    stmt.execute(params![
                        broadcast.id.0,
                        r.customer_id,
                        r.name,
                        r.address,
                        r.email,
                        broadcast.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a broadcast by id, scoped to its tenant.
pub async fn get_broadcast(
    db: &Database,
    tenant: &TenantId,
    id: &BroadcastId,
) -> Result<Option<Broadcast>, HeraldError> {
    let tenant = tenant.0.clone();
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {BROADCAST_COLUMNS} FROM broadcasts b WHERE b.id = ?1 AND b.tenant_id = ?2"
            );
            conn.query_row(&sql, params![id, tenant], broadcast_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List a tenant's broadcasts newest first, with recipient counts, plus the total match count.
pub async fn list_broadcasts(
    db: &Database,
    tenant: &TenantId,
    status: Option<BroadcastStatus>,
    limit: u32,
    offset: u32,
) -> Result<(Vec<BroadcastSummary>, u64), HeraldError> {
    let tenant = tenant.0.clone();
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {BROADCAST_COLUMNS},
                        COALESCE(SUM(r.status = 'pending'), 0),
                        COALESCE(SUM(r.status = 'sent'), 0),
                        COALESCE(SUM(r.status = 'failed'), 0)
                 FROM broadcasts b
                 LEFT JOIN recipients r ON r.broadcast_id = b.id
                 WHERE b.tenant_id = ?1 AND (?2 IS NULL OR b.status = ?2)
                 GROUP BY b.id
                 ORDER BY b.created_at DESC, b.rowid DESC
                 LIMIT ?3 OFFSET ?4"
            );
            let mut stmt = conn.prepare(&sql)?;
            let items = stmt
                .query_map(params![tenant, status, limit, offset], |row| {
                    Ok(BroadcastSummary {
                        broadcast: broadcast_from_row(row)?,
                        counts: counts_from_row(row, 8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM broadcasts WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)",
                params![tenant, status],
                |row| row.get(0),
            )?;
            Ok((items, total.max(0) as u64))
        })
        .await
        .map_err(map_tr_err)
}

/// Move a draft (or interrupted sending) broadcast to `sending`.
///
/// Returns false when the broadcast is missing, foreign, or terminal.
pub async fn mark_sending(
    db: &Database,
    tenant: &TenantId,
    id: &BroadcastId,
) -> Result<bool, HeraldError> {
    let tenant = tenant.0.clone();
    let id = id.0.clone();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE broadcasts SET status = 'sending', updated_at = ?3
                 WHERE id = ?1 AND tenant_id = ?2 AND status IN ('draft', 'sending')",
                params![id, tenant, now],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the status of a non-terminal broadcast. Terminal broadcasts are never modified.
pub async fn set_status(
    db: &Database,
    id: &BroadcastId,
    status: BroadcastStatus,
) -> Result<(), HeraldError> {
    let id_owned = id.0.clone();
    let status_str = status.to_string();
    let now = now_timestamp();
    let changed = db
        .connection()
        .call(move |conn| {
            let sql = format!(
                "UPDATE broadcasts SET status = ?2, updated_at = ?3
                 WHERE id = ?1 AND status NOT IN {TERMINAL_STATUSES}"
            );
            Ok(conn.execute(&sql, params![id_owned, status_str, now])?)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(HeraldError::Conflict(format!(
            "broadcast {id} is terminal or missing; cannot set status {status}"
        )));
    }
    Ok(())
}

enum DeleteOutcome {
    Deleted,
    Missing,
    Sending,
}

/// Delete a broadcast with all of its recipient records.
pub async fn delete_broadcast(
    db: &Database,
    tenant: &TenantId,
    id: &BroadcastId,
) -> Result<(), HeraldError> {
    let tenant_owned = tenant.0.clone();
    let id_owned = id.0.clone();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM broadcasts WHERE id = ?1 AND tenant_id = ?2",
                    params![id_owned, tenant_owned],
                    |row| row.get(0),
                )
                .optional()?;
            let outcome = match status.as_deref() {
                None => DeleteOutcome::Missing,
                Some("sending") => DeleteOutcome::Sending,
                Some(_) => {
                    tx.execute(
                        "DELETE FROM recipients WHERE broadcast_id = ?1",
                        params![id_owned],
                    )?;
                    tx.execute("DELETE FROM broadcasts WHERE id = ?1", params![id_owned])?;
                    DeleteOutcome::Deleted
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        DeleteOutcome::Deleted => Ok(()),
        DeleteOutcome::Missing => Err(HeraldError::NotFound {
            kind: "broadcast",
            id: id.to_string(),
        }),
        DeleteOutcome::Sending => Err(HeraldError::Conflict(format!(
            "broadcast {id} is sending and cannot be deleted"
        ))),
    }
}

/// Delete terminal broadcasts (and their records) last updated before `cutoff`.
pub async fn prune_terminal_before(db: &Database, cutoff: &str) -> Result<u64, HeraldError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "DELETE FROM recipients WHERE broadcast_id IN (
                         SELECT id FROM broadcasts
                         WHERE status IN {TERMINAL_STATUSES} AND updated_at < ?1)"
                ),
                params![cutoff],
            )?;
            let removed = tx.execute(
                &format!(
                    "DELETE FROM broadcasts WHERE status IN {TERMINAL_STATUSES} AND updated_at < ?1"
                ),
                params![cutoff],
            )?;
            tx.commit()?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{make_broadcast, make_recipients, setup_db};
    use crate::queries::recipients::list_recipients;

    fn tenant(s: &str) -> TenantId {
        TenantId::from(s)
    }

    #[tokio::test]
    async fn insert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let b = make_broadcast("b1", "t1", "2026-01-01T00:00:00.000Z");
        insert_broadcast(&db, &b, &make_recipients(3)).await.unwrap();

        let got = get_broadcast(&db, &tenant("t1"), &b.id).await.unwrap().unwrap();
        assert_eq!(got, b);
        let records = list_recipients(&db, &b.id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].id < w[1].id));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_is_tenant_scoped() {
        let (db, _dir) = setup_db().await;
        let b = make_broadcast("b1", "t1", "2026-01-01T00:00:00.000Z");
        insert_broadcast(&db, &b, &[]).await.unwrap();
        assert!(get_broadcast(&db, &tenant("t2"), &b.id).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_paginates_newest_first_with_counts() {
        let (db, _dir) = setup_db().await;
        for (i, day) in ["01", "02", "03"].iter().enumerate() {
            let b = make_broadcast(&format!("b{i}"), "t1", &format!("2026-01-{day}T00:00:00.000Z"));
            insert_broadcast(&db, &b, &make_recipients(i + 1)).await.unwrap();
        }
        insert_broadcast(&db, &make_broadcast("other", "t2", "2026-01-04T00:00:00.000Z"), &[])
            .await
            .unwrap();

        let (page, total) = list_broadcasts(&db, &tenant("t1"), None, 2, 0).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].broadcast.id.0, "b2");
        assert_eq!(page[0].counts.pending, 3);
        assert_eq!(page[1].broadcast.id.0, "b1");

        let (page, _) = list_broadcasts(&db, &tenant("t1"), None, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].broadcast.id.0, "b0");

        let (drafts, total) =
            list_broadcasts(&db, &tenant("t1"), Some(BroadcastStatus::Sending), 10, 0)
                .await
                .unwrap();
        assert!(drafts.is_empty());
        assert_eq!(total, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_sending_refuses_terminal() {
        let (db, _dir) = setup_db().await;
        let b = make_broadcast("b1", "t1", "2026-01-01T00:00:00.000Z");
        insert_broadcast(&db, &b, &make_recipients(1)).await.unwrap();

        assert!(mark_sending(&db, &tenant("t1"), &b.id).await.unwrap());
        assert!(!mark_sending(&db, &tenant("t2"), &b.id).await.unwrap());
        set_status(&db, &b.id, BroadcastStatus::Completed).await.unwrap();
        assert!(!mark_sending(&db, &tenant("t1"), &b.id).await.unwrap());

        // Terminal is final.
        let err = set_status(&db, &b.id, BroadcastStatus::Sending).await.unwrap_err();
        assert!(matches!(err, HeraldError::Conflict(_)));
        let got = get_broadcast(&db, &tenant("t1"), &b.id).await.unwrap().unwrap();
        assert_eq!(got.status, BroadcastStatus::Completed);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_refuses_sending_and_removes_records() {
        let (db, _dir) = setup_db().await;
        let b = make_broadcast("b1", "t1", "2026-01-01T00:00:00.000Z");
        insert_broadcast(&db, &b, &make_recipients(2)).await.unwrap();

        mark_sending(&db, &tenant("t1"), &b.id).await.unwrap();
        let err = delete_broadcast(&db, &tenant("t1"), &b.id).await.unwrap_err();
        assert!(matches!(err, HeraldError::Conflict(_)));

        set_status(&db, &b.id, BroadcastStatus::Partial).await.unwrap();
        let err = delete_broadcast(&db, &tenant("t2"), &b.id).await.unwrap_err();
        assert!(matches!(err, HeraldError::NotFound { .. }));

        delete_broadcast(&db, &tenant("t1"), &b.id).await.unwrap();
        assert!(get_broadcast(&db, &tenant("t1"), &b.id).await.unwrap().is_none());
        assert!(list_recipients(&db, &b.id).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn prune_only_touches_old_terminal_broadcasts() {
        let (db, _dir) = setup_db().await;
        for id in ["old-done", "old-draft", "new-done"] {
            insert_broadcast(&db, &make_broadcast(id, "t1", "2026-01-01T00:00:00.000Z"), &make_recipients(1))
                .await
                .unwrap();
        }
        set_status(&db, &BroadcastId::from("old-done"), BroadcastStatus::Completed)
            .await
            .unwrap();
        set_status(&db, &BroadcastId::from("new-done"), BroadcastStatus::Failed)
            .await
            .unwrap();
        // Backdate one terminal and the draft.
        db.connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE broadcasts SET updated_at = '2025-01-01T00:00:00.000Z'
                     WHERE id IN ('old-done', 'old-draft')",
                    [],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
            .unwrap();

        let removed = prune_terminal_before(&db, "2025-06-01T00:00:00.000Z").await.unwrap();
        assert_eq!(removed, 1);
        let t1 = tenant("t1");
        assert!(get_broadcast(&db, &t1, &BroadcastId::from("old-done")).await.unwrap().is_none());
        assert!(get_broadcast(&db, &t1, &BroadcastId::from("old-draft")).await.unwrap().is_some());
        assert!(get_broadcast(&db, &t1, &BroadcastId::from("new-done")).await.unwrap().is_some());
        assert!(list_recipients(&db, &BroadcastId::from("old-done")).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
