// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and result shapes of the dispatch engine.

use herald_core::{
    Broadcast, BroadcastId, BroadcastStatus, DeliveryStatus, MessageTemplate, RecipientRecord,
    RecipientSelector, StatusCounts,
};
use serde::{Deserialize, Serialize};

/// Input for creating a draft broadcast.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBroadcast {
    /// Defaults to the first line of the template body.
    #[serde(default)]
    pub title: Option<String>,
    pub template: MessageTemplate,
    pub recipients: RecipientSelector,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedBroadcast {
    pub broadcast_id: BroadcastId,
    pub status: BroadcastStatus,
    pub recipient_count: usize,
    /// Customers left out for lacking a usable address.
    pub skipped: usize,
}

/// A broadcast with every recipient record and the derived tallies.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastDetail {
    #[serde(flatten)]
    pub broadcast: Broadcast,
    pub counts: StatusCounts,
    pub recipients: Vec<RecipientRecord>,
}

/// Advisory progress of a running dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchProgress {
    pub current: u64,
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Callback invoked after each recipient is settled.
pub type ProgressFn = Box<dyn Fn(DispatchProgress) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct RecipientDetail {
    pub record_id: i64,
    pub name: String,
    pub address: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

impl From<RecipientRecord> for RecipientDetail {
    fn from(record: RecipientRecord) -> Self {
        Self {
            record_id: record.id,
            name: record.name,
            address: record.address,
            status: record.status,
            error: record.error,
            sent_at: record.sent_at,
        }
    }
}

/// Outcome of a completed dispatch run, computed over all of the broadcast's records.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub broadcast_id: BroadcastId,
    pub status: BroadcastStatus,
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    /// Records delivered or failed during this run.
    pub processed: u64,
    pub details: Vec<RecipientDetail>,
}
