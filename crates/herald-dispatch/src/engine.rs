// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The broadcast engine: draft creation, sequential dispatch, bookkeeping.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use herald_config::model::DispatchConfig;
use herald_core::{
    Broadcast, BroadcastId, BroadcastStatistics, BroadcastStatus, BroadcastSummary,
    CustomerDirectory, DateRange, DeliveryChannel, DeliveryOutcome, HeraldError, MessageTemplate,
    NewRecipient, OutboundMessage, RecipientRecord, RecipientSelector, SessionProvider,
    StorageAdapter, TenantId, now_timestamp,
};

use crate::address::AddressRules;
use crate::personalize::{RecipientFields, render};
use crate::report::{
    BroadcastDetail, CreateBroadcast, CreatedBroadcast, DispatchProgress, DispatchReport,
    ProgressFn,
};
use crate::throttle::Throttle;

const TITLE_MAX_CHARS: usize = 80;

fn not_found(id: &BroadcastId) -> HeraldError {
    HeraldError::NotFound {
        kind: "broadcast",
        id: id.to_string(),
    }
}

fn default_title(body: &str) -> String {
    let first = body.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("Broadcast");
    first.chars().take(TITLE_MAX_CHARS).collect()
}

/// Removes a dispatch from the active set when the run ends, however it ends.
struct ActiveDispatch<'a> {
    active: &'a DashMap<BroadcastId, CancellationToken>,
    id: BroadcastId,
}

impl Drop for ActiveDispatch<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

/// Creates, dispatches and reports on broadcasts.
pub struct BroadcastEngine {
    config: DispatchConfig,
    rules: AddressRules,
    throttle: Throttle,
    storage: Arc<dyn StorageAdapter>,
    directory: Arc<dyn CustomerDirectory>,
    sessions: Arc<dyn SessionProvider>,
    active: DashMap<BroadcastId, CancellationToken>,
    shutdown: CancellationToken,
}

impl BroadcastEngine {
    pub fn new(
        config: DispatchConfig,
        storage: Arc<dyn StorageAdapter>,
        directory: Arc<dyn CustomerDirectory>,
        sessions: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            rules: AddressRules::from_config(&config),
            throttle: Throttle::from_config(&config),
            config,
            storage,
            directory,
            sessions,
            active: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn address_rules(&self) -> &AddressRules {
        &self.rules
    }

    /// Resolves the selector and writes a draft broadcast with one pending
    /// record per customer that has a valid address.
    pub async fn create_broadcast(
        &self,
        tenant: &TenantId,
        request: CreateBroadcast,
    ) -> Result<CreatedBroadcast, HeraldError> {
        if request.template.body.trim().is_empty() {
            return Err(HeraldError::Validation("message template is empty".into()));
        }
        if let Some(media) = &request.template.media
            && !media.is_public_url()
        {
            return Err(HeraldError::Validation(format!(
                "media reference `{}` is not an http(s) URL; upload the file first",
                media.0
            )));
        }
        if matches!(&request.recipients, RecipientSelector::Customers(ids) if ids.is_empty()) {
            return Err(HeraldError::Validation("no recipients selected".into()));
        }

        let customers = self
            .directory
            .customers_for(tenant, &request.recipients)
            .await?;
        let found = customers.len();

        let mut seen = HashSet::new();
        let mut recipients = Vec::with_capacity(found);
        for customer in customers {
            let Some(address) = customer.phone.as_deref().and_then(|p| self.rules.parse(p)) else {
                debug!(
                    tenant = %tenant,
                    customer_id = customer.id,
                    phone = customer.phone.as_deref().unwrap_or(""),
                    "skipping customer without a valid address"
                );
                continue;
            };
            if !seen.insert(address.clone()) {
                debug!(tenant = %tenant, customer_id = customer.id, "skipping duplicate address");
                continue;
            }
            recipients.push(NewRecipient {
                customer_id: Some(customer.id),
                name: customer.name,
                address,
                email: customer.email,
            });
        }

        let skipped = found - recipients.len();
        if skipped > 0 {
            warn!(tenant = %tenant, skipped, "customers left out of broadcast");
        }
        if recipients.is_empty() {
            return Err(HeraldError::Validation(
                "no recipients with a valid address".into(),
            ));
        }

        let now = now_timestamp();
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| default_title(&request.template.body));
        let broadcast = Broadcast {
            id: BroadcastId::generate(),
            tenant_id: tenant.clone(),
            title,
            template: request.template,
            status: BroadcastStatus::Draft,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_broadcast(&broadcast, &recipients).await?;
        info!(
            tenant = %tenant,
            broadcast_id = %broadcast.id,
            recipients = recipients.len(),
            skipped,
            "broadcast created"
        );

        Ok(CreatedBroadcast {
            broadcast_id: broadcast.id,
            status: broadcast.status,
            recipient_count: recipients.len(),
            skipped,
        })
    }

    /// Delivers every pending record of the broadcast, then settles its status.
    ///
    /// Fails before touching any record if the broadcast is missing, terminal,
    /// already being sent, or the tenant has no usable session. A cancelled
    /// run returns [`HeraldError::Cancelled`] and leaves the broadcast
    /// `sending` with its unattempted records pending.
    pub async fn send_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
        on_progress: Option<ProgressFn>,
    ) -> Result<DispatchReport, HeraldError> {
        let broadcast = self
            .storage
            .get_broadcast(tenant, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        if broadcast.status.is_terminal() {
            return Err(HeraldError::Conflict(format!(
                "broadcast {id} is already {}",
                broadcast.status
            )));
        }

        let cancel = self.shutdown.child_token();
        match self.active.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(HeraldError::Conflict(format!(
                    "broadcast {id} is already being sent"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(cancel.clone());
            }
        }
        let _active = ActiveDispatch {
            active: &self.active,
            id: id.clone(),
        };

        if !self.storage.mark_sending(tenant, id).await? {
            return Err(HeraldError::Conflict(format!(
                "broadcast {id} can no longer be sent"
            )));
        }

        let session = match self.sessions.acquire_session(tenant).await {
            Ok(session) => session,
            Err(e) => {
                warn!(tenant = %tenant, broadcast_id = %id, error = %e, "no session for dispatch");
                return Err(e);
            }
        };

        let pending = self.storage.pending_recipients(id).await?;
        let before = self.storage.status_counts(id).await?;
        let mut progress = DispatchProgress {
            current: before.sent + before.failed,
            total: before.total(),
            success_count: before.sent,
            failure_count: before.failed,
        };
        info!(
            tenant = %tenant,
            broadcast_id = %id,
            pending = pending.len(),
            total = progress.total,
            "dispatch started"
        );

        let mut processed = 0u64;
        let mut cancelled = false;
        let last = pending.len().saturating_sub(1);
        for (index, record) in pending.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(outcome) = self
                .deliver(session.as_ref(), record, &broadcast.template, &cancel)
                .await
            else {
                cancelled = true;
                break;
            };

            let recorded = self.storage.record_outcome(record.id, &outcome).await?;
            if !recorded {
                debug!(record_id = record.id, "record already settled elsewhere");
            }
            processed += 1;
            progress.current += 1;
            match &outcome {
                DeliveryOutcome::Sent { .. } => progress.success_count += 1,
                DeliveryOutcome::Failed { .. } => progress.failure_count += 1,
            }
            if let Some(callback) = &on_progress {
                callback(progress);
            }

            if index < last && !self.throttle.pause(&cancel).await {
                cancelled = true;
                break;
            }
        }

        if cancelled {
            info!(
                tenant = %tenant,
                broadcast_id = %id,
                processed,
                "dispatch cancelled; remaining records stay pending"
            );
            return Err(HeraldError::Cancelled);
        }

        let counts = self.storage.status_counts(id).await?;
        let status = BroadcastStatus::from_counts(&counts);
        self.storage.set_broadcast_status(id, status).await?;
        info!(
            tenant = %tenant,
            broadcast_id = %id,
            %status,
            sent = counts.sent,
            failed = counts.failed,
            "dispatch finished"
        );

        let details = self
            .storage
            .list_recipients(id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(DispatchReport {
            broadcast_id: id.clone(),
            status,
            total: counts.total(),
            sent: counts.sent,
            failed: counts.failed,
            processed,
            details,
        })
    }

    /// Runs the attempt sequence for one record. `None` means the run was
    /// cancelled between attempts and the record must stay pending.
    async fn deliver(
        &self,
        session: &dyn DeliveryChannel,
        record: &RecipientRecord,
        template: &MessageTemplate,
        cancel: &CancellationToken,
    ) -> Option<DeliveryOutcome> {
        let fields = RecipientFields {
            name: &record.name,
            address: &record.address,
            email: record.email.as_deref(),
        };
        let text = render(&template.body, &fields, &self.rules);
        let message = OutboundMessage {
            to: record.address.clone(),
            text: text.clone(),
            media: template.media.clone(),
        };

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                warn!(
                    record_id = record.id,
                    attempt,
                    error = %last_error,
                    "retrying delivery"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return None,
                    _ = tokio::time::sleep(self.config.retry_delay()) => {}
                }
            }

            match tokio::time::timeout(self.config.attempt_timeout(), session.send(&message)).await {
                Ok(Ok(message_id)) => {
                    debug!(record_id = record.id, attempt, message_id = %message_id.0, "delivered");
                    return Some(DeliveryOutcome::Sent {
                        message: text,
                        sent_at: now_timestamp(),
                    });
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!(
                        "delivery timed out after {}s",
                        self.config.attempt_timeout_secs
                    );
                }
            }
        }

        debug!(record_id = record.id, error = %last_error, "delivery failed");
        Some(DeliveryOutcome::Failed {
            message: text,
            error: last_error,
        })
    }

    /// Requests cancellation of a running dispatch. Returns whether one was running.
    pub async fn cancel(&self, tenant: &TenantId, id: &BroadcastId) -> Result<bool, HeraldError> {
        self.storage
            .get_broadcast(tenant, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        match self.active.get(id) {
            Some(token) => {
                token.cancel();
                info!(tenant = %tenant, broadcast_id = %id, "dispatch cancellation requested");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether the broadcast is being dispatched by this engine right now.
    pub fn is_dispatching(&self, id: &BroadcastId) -> bool {
        self.active.contains_key(id)
    }

    pub async fn get_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<BroadcastDetail, HeraldError> {
        let broadcast = self
            .storage
            .get_broadcast(tenant, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let recipients = self.storage.list_recipients(id).await?;
        let counts = self.storage.status_counts(id).await?;
        Ok(BroadcastDetail {
            broadcast,
            counts,
            recipients,
        })
    }

    pub async fn list_broadcasts(
        &self,
        tenant: &TenantId,
        status: Option<BroadcastStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<BroadcastSummary>, u64), HeraldError> {
        self.storage
            .list_broadcasts(tenant, status, limit, offset)
            .await
    }

    /// Deletes a broadcast and its records. Refused while it is being sent.
    pub async fn delete_broadcast(
        &self,
        tenant: &TenantId,
        id: &BroadcastId,
    ) -> Result<(), HeraldError> {
        if self.is_dispatching(id) {
            return Err(HeraldError::Conflict(format!(
                "broadcast {id} is being sent and cannot be deleted"
            )));
        }
        self.storage.delete_broadcast(tenant, id).await?;
        info!(tenant = %tenant, broadcast_id = %id, "broadcast deleted");
        Ok(())
    }

    pub async fn statistics(
        &self,
        tenant: &TenantId,
        range: &DateRange,
    ) -> Result<BroadcastStatistics, HeraldError> {
        if let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(HeraldError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        self.storage.statistics(tenant, range).await
    }

    /// Cancels every running dispatch.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_title_uses_first_non_empty_line() {
        assert_eq!(default_title("\n  Promo week!  \nDetails"), "Promo week!");
        assert_eq!(default_title("   "), "Broadcast");
        assert_eq!(default_title(&"x".repeat(200)).len(), TITLE_MAX_CHARS);
    }
}
