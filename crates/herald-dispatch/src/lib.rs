// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast dispatch engine.
//!
//! Creates draft broadcasts from a tenant's customer directory and delivers
//! them one recipient at a time through the tenant's pooled session, with
//! bounded retries and a randomised pause between recipients. Only pending
//! records are ever attempted, so re-sending an interrupted broadcast resumes it.

pub mod address;
pub mod engine;
pub mod personalize;
pub mod report;
pub mod throttle;

pub use address::AddressRules;
pub use engine::BroadcastEngine;
pub use report::{
    BroadcastDetail, CreateBroadcast, CreatedBroadcast, DispatchProgress, DispatchReport,
    ProgressFn, RecipientDetail,
};
pub use throttle::Throttle;
