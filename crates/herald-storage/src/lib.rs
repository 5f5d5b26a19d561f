// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery ledger.
//!
//! Broadcasts, one record per recipient, and the tenant customer directory,
//! kept in a single SQLite file. All writes go through one background
//! connection thread owned by [`Database`].

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
