// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the delivery ledger.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Broadcast, BroadcastId, BroadcastStatistics, BroadcastStatus, BroadcastSummary, DateRange,
    DeliveryOutcome, NewRecipient, RecipientRecord, StatusCounts, TenantId,
};

/// Durable store of broadcasts and their recipient records.
///
/// Every lookup is tenant-scoped: a broadcast owned by another tenant
/// behaves exactly like a missing one.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), HeraldError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), HeraldError>;

    /// Writes a broadcast and all of its recipient records atomically.
    async fn create_broadcast(
        &self,
        broadcast: &Broadcast,
        recipients: &[NewRecipient],
    ) -> Result<(), HeraldError>;

    async fn get_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<Option<Broadcast>, HeraldError>;

    /// Newest first, with per-broadcast counts, and the total number of matches.
    async fn list_broadcasts(
        &self,
        tenant: &TenantId,
        status: Option<BroadcastStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<BroadcastSummary>, u64), HeraldError>;

    /// Moves a non-terminal broadcast to `sending`. Returns false if it was terminal or missing.
    async fn mark_sending(&self, tenant: &TenantId, id: &BroadcastId)
    -> Result<bool, HeraldError>;

    async fn set_broadcast_status(
        &self,
        id: &BroadcastId,
        status: BroadcastStatus,
    ) -> Result<(), HeraldError>;

    /// Pending records in creation order.
    async fn pending_recipients(
        &self,
        id: &BroadcastId,
    ) -> Result<Vec<RecipientRecord>, HeraldError>;

    async fn list_recipients(&self, id: &BroadcastId)
    -> Result<Vec<RecipientRecord>, HeraldError>;

    /// Stores a record's final outcome. Only pending records change; returns whether one did.
    async fn record_outcome(
        &self,
        record_id: i64,
        outcome: &DeliveryOutcome,
    ) -> Result<bool, HeraldError>;

    async fn status_counts(&self, id: &BroadcastId) -> Result<StatusCounts, HeraldError>;

    /// Removes a broadcast and its records. Refused while the broadcast is sending.
    async fn delete_broadcast(&self, tenant: &TenantId, id: &BroadcastId)
    -> Result<(), HeraldError>;

    async fn statistics(
        &self,
        tenant: &TenantId,
        range: &DateRange,
    ) -> Result<BroadcastStatistics, HeraldError>;

    /// Deletes terminal broadcasts last updated before `cutoff`. Returns how many went.
    async fn prune_terminal_before(&self, cutoff: &str) -> Result<u64, HeraldError>;
}
