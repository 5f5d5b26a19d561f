// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection pool for per-tenant messaging sessions.
//!
//! The pool keeps at most one live channel per tenant, pairs new tenants,
//! reconnects after transient disconnects, purges credentials after terminal
//! ones, and closes sessions nobody has used within the idle window.
//!
//! Each tenant's state lives behind its own async mutex, so concurrent
//! `acquire` calls for one tenant join a single connection attempt while
//! different tenants never contend.

pub mod credentials;
pub mod pool;
pub mod session;
mod supervisor;

pub use credentials::FileSessionStore;
pub use pool::{Acquired, ConnectionPool, PoolState};
pub use session::Session;
