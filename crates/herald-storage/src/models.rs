// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite rows and the domain types in `herald-core`.

use std::str::FromStr;

use herald_core::{
    Broadcast, BroadcastId, Customer, MediaRef, MessageTemplate, RecipientRecord, StatusCounts,
    TenantId,
};
use rusqlite::Row;
use rusqlite::types::Type;

/// Column list matching [`broadcast_from_row`].
pub(crate) const BROADCAST_COLUMNS: &str =
    "b.id, b.tenant_id, b.title, b.body, b.media_ref, b.status, b.created_at, b.updated_at";

/// Column list matching [`recipient_from_row`].
pub(crate) const RECIPIENT_COLUMNS: &str = "id, broadcast_id, customer_id, name, address, email, \
     message, status, error, sent_at, created_at";

/// Parse a TEXT column through `FromStr`, reporting failures as conversion errors.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn broadcast_from_row(row: &Row<'_>) -> rusqlite::Result<Broadcast> {
    Ok(Broadcast {
        id: BroadcastId(row.get(0)?),
        tenant_id: TenantId(row.get(1)?),
        title: row.get(2)?,
        template: MessageTemplate {
            body: row.get(3)?,
            media: row.get::<_, Option<String>>(4)?.map(MediaRef),
        },
        status: parse_column(row, 5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub(crate) fn recipient_from_row(row: &Row<'_>) -> rusqlite::Result<RecipientRecord> {
    Ok(RecipientRecord {
        id: row.get(0)?,
        broadcast_id: BroadcastId(row.get(1)?),
        customer_id: row.get(2)?,
        name: row.get(3)?,
        address: row.get(4)?,
        email: row.get(5)?,
        message: row.get(6)?,
        status: parse_column(row, 7)?,
        error: row.get(8)?,
        sent_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Reads three consecutive `pending, sent, failed` aggregate columns starting at `first`.
pub(crate) fn counts_from_row(row: &Row<'_>, first: usize) -> rusqlite::Result<StatusCounts> {
    Ok(StatusCounts {
        pending: row.get::<_, i64>(first)?.max(0) as u64,
        sent: row.get::<_, i64>(first + 1)?.max(0) as u64,
        failed: row.get::<_, i64>(first + 2)?.max(0) as u64,
    })
}

pub(crate) fn customer_from_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        tenant_id: TenantId(row.get(1)?),
        name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
    })
}
