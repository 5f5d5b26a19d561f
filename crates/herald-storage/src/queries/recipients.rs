// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient record operations.

use herald_core::{BroadcastId, DeliveryOutcome, HeraldError, RecipientRecord, StatusCounts};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{RECIPIENT_COLUMNS, counts_from_row, recipient_from_row};

async fn select_records(
    db: &Database,
    id: &BroadcastId,
    pending_only: bool,
) -> Result<Vec<RecipientRecord>, HeraldError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let filter = if pending_only {
                " AND status = 'pending'"
            } else {
                ""
            };
            let sql = format!(
                "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE broadcast_id = ?1{filter} ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![id], recipient_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Records still pending, in creation order.
pub async fn pending_recipients(
    db: &Database,
    id: &BroadcastId,
) -> Result<Vec<RecipientRecord>, HeraldError> {
    select_records(db, id, true).await
}

/// All records of a broadcast, in creation order.
pub async fn list_recipients(
    db: &Database,
    id: &BroadcastId,
) -> Result<Vec<RecipientRecord>, HeraldError> {
    select_records(db, id, false).await
}

/// Store the outcome of a record's attempt sequence.
///
/// Only a pending record is updated, so a sent record keeps its status and
/// timestamp no matter how often dispatch is re-invoked.
pub async fn record_outcome(
    db: &Database,
    record_id: i64,
    outcome: &DeliveryOutcome,
) -> Result<bool, HeraldError> {
    let outcome = outcome.clone();
    db.connection()
        .call(move |conn| {
            let changed = match outcome {
                DeliveryOutcome::Sent { message, sent_at } => conn.execute(
                    "UPDATE recipients SET status = 'sent', message = ?2, sent_at = ?3, error = NULL
                     WHERE id = ?1 AND status = 'pending'",
                    params![record_id, message, sent_at],
                )?,
                DeliveryOutcome::Failed { message, error } => conn.execute(
                    "UPDATE recipients SET status = 'failed', message = ?2, error = ?3
                     WHERE id = ?1 AND status = 'pending'",
                    params![record_id, message, error],
                )?,
            };
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn status_counts(db: &Database, id: &BroadcastId) -> Result<StatusCounts, HeraldError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'sent'), 0),
                        COALESCE(SUM(status = 'failed'), 0)
                 FROM recipients WHERE broadcast_id = ?1",
                params![id],
                |row| counts_from_row(row, 0),
            )
        })
        .await
        .map_err(map_tr_err)
}
