// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger schema.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Brings the ledger schema up to date and returns how many migrations ran.
///
/// Safe to call on every open; an up-to-date database applies nothing.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<usize, refinery::Error> {
    let applied = embedded::migrations::runner()
        .run(conn)?
        .applied_migrations()
        .len();
    if applied > 0 {
        tracing::info!(applied, "ledger schema migrated");
    }
    Ok(applied)
}
