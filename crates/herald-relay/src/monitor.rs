// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device status polling that turns relay state into channel events.

use std::sync::Arc;
use std::time::Duration;

use herald_core::{ChannelEvent, DisconnectReason, SessionStore, TenantId};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::RelayClient;
use crate::credentials_for;
use crate::types::DeviceState;

/// Consecutive failed polls after which the session is reported lost.
const MAX_POLL_FAILURES: u32 = 3;

pub(crate) struct DeviceMonitor {
    pub(crate) client: RelayClient,
    pub(crate) tenant: TenantId,
    pub(crate) number_key: String,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) events: mpsc::UnboundedSender<ChannelEvent>,
    pub(crate) interval: Duration,
    /// Whether the number key is already in the session store.
    pub(crate) persisted: bool,
    pub(crate) connected: bool,
}

impl DeviceMonitor {
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let state = tokio::select! {
                _ = cancel.cancelled() => break,
                state = self.client.device_status(&self.number_key) => state,
            };

            match state {
                Ok(DeviceState::Connected) => {
                    failures = 0;
                    if !self.connected {
                        self.mark_linked().await;
                    }
                }
                Ok(DeviceState::Pending) => {
                    failures = 0;
                    if self.connected {
                        self.emit(ChannelEvent::Closed(DisconnectReason::network(
                            "device went offline",
                        )));
                        break;
                    }
                }
                Ok(DeviceState::LoggedOut) => {
                    info!(tenant = %self.tenant, "relay reports the device logged out");
                    self.emit(ChannelEvent::Closed(DisconnectReason::logged_out()));
                    break;
                }
                Err(e) => {
                    failures += 1;
                    warn!(tenant = %self.tenant, failures, error = %e, "device status poll failed");
                    if failures >= MAX_POLL_FAILURES {
                        self.emit(ChannelEvent::Closed(DisconnectReason::network(e.to_string())));
                        break;
                    }
                }
            }
        }
        debug!(tenant = %self.tenant, "device monitor stopped");
    }

    async fn mark_linked(&mut self) {
        if !self.persisted {
            match self
                .store
                .save(&self.tenant, &credentials_for(&self.number_key))
                .await
            {
                Ok(()) => self.persisted = true,
                Err(e) => warn!(tenant = %self.tenant, error = %e, "failed to persist relay credentials"),
            }
        }
        self.connected = true;
        info!(tenant = %self.tenant, "relay device linked");
        self.emit(ChannelEvent::Connected);
    }

    fn emit(&self, event: ChannelEvent) {
        crate::emit(&self.events, &self.tenant, event);
    }
}
