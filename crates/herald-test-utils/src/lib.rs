// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! Provides scripted adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a real messaging network.
//!
//! # Components
//!
//! - [`ScriptedConnector`] - per-tenant pairing scripts and per-address delivery faults
//! - [`MemorySessionStore`] - credential store kept in memory
//! - [`TestHarness`] - ledger, pool and engine assembled on a temp database

pub mod harness;
pub mod memory_store;
pub mod scripted;

pub use harness::{TestHarness, fast_dispatch_config};
pub use memory_store::MemorySessionStore;
pub use scripted::{Fault, PairingScript, ScriptedChannel, ScriptedConnector};
