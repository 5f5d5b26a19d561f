// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention sweeper for the Herald messaging service.
//!
//! On a cron schedule, removes terminal broadcasts (with their recipient
//! records) and uploaded media files older than the configured retention
//! window.

pub mod media;
pub mod sweeper;

pub use sweeper::{RetentionSweeper, SweepReport};
