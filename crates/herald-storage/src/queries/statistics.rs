// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant-scoped reporting aggregates.

use herald_core::{BroadcastStatistics, DateRange, HeraldError, TenantId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Aggregate counts over a tenant's broadcasts created within `range` (inclusive days, UTC).
pub async fn statistics(
    db: &Database,
    tenant: &TenantId,
    range: &DateRange,
) -> Result<BroadcastStatistics, HeraldError> {
    let tenant = tenant.0.clone();
    let start = range.start.map(|d| d.format("%Y-%m-%d").to_string());
    let end = range.end.map(|d| d.format("%Y-%m-%d").to_string());
    let (broadcasts, recipients, sent, failed, pending) = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(DISTINCT b.id),
                        COUNT(r.id),
                        COALESCE(SUM(r.status = 'sent'), 0),
                        COALESCE(SUM(r.status = 'failed'), 0),
                        COALESCE(SUM(r.status = 'pending'), 0)
                 FROM broadcasts b
                 LEFT JOIN recipients r ON r.broadcast_id = b.id
                 WHERE b.tenant_id = ?1
                   AND (?2 IS NULL OR substr(b.created_at, 1, 10) >= ?2)
                   AND (?3 IS NULL OR substr(b.created_at, 1, 10) <= ?3)",
                params![tenant, start, end],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
        })
        .await
        .map_err(map_tr_err)?;

    let sent = sent.max(0) as u64;
    let failed = failed.max(0) as u64;
    Ok(BroadcastStatistics {
        total_broadcasts: broadcasts.max(0) as u64,
        total_recipients: recipients.max(0) as u64,
        sent,
        failed,
        pending: pending.max(0) as u64,
        success_rate: BroadcastStatistics::success_rate(sent, failed),
    })
}
