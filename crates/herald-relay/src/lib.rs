// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP relay delivery channel.
//!
//! Talks to a hosted messaging relay that links one device per tenant. A
//! tenant's relay `number_key` is the credential material the pool persists:
//! with it a session reopens without scanning a new pairing code.

pub mod client;
mod monitor;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use herald_config::model::RelayConfig;
use herald_core::{
    AdapterType, ChannelConnector, ChannelEvent, ConnectRequest, Credentials, DeliveryChannel,
    HealthStatus, HeraldError, MediaKind, MediaRef, MessageId, OutboundMessage, PairingChallenge,
    PluginAdapter, TenantId,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use client::RelayClient;

use crate::monitor::DeviceMonitor;
use crate::types::{DeviceState, PairResponse};

const NUMBER_KEY: &str = "number_key";

fn number_key_of(credentials: &Credentials) -> Option<String> {
    credentials
        .data
        .get(NUMBER_KEY)
        .and_then(serde_json::Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

pub(crate) fn credentials_for(number_key: &str) -> Credentials {
    Credentials::new(serde_json::json!({ NUMBER_KEY: number_key }))
}

/// Opens relay-backed sessions.
pub struct HttpRelayConnector {
    client: RelayClient,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl HttpRelayConnector {
    pub fn new(config: &RelayConfig) -> Result<Self, HeraldError> {
        Ok(Self {
            client: RelayClient::new(config)?,
            poll_interval: Duration::from_secs(config.status_poll_secs),
            shutdown: CancellationToken::new(),
        })
    }

    /// Overrides the device status polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl PluginAdapter for HttpRelayConnector {
    fn name(&self) -> &str {
        "relay"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        if self.shutdown.is_cancelled() {
            return Ok(HealthStatus::Unhealthy("connector shut down".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        self.shutdown.cancel();
        Ok(())
    }
}

/// Forwards a channel event to the pool, noting when nobody is listening.
pub(crate) fn emit(
    events: &mpsc::UnboundedSender<ChannelEvent>,
    tenant: &TenantId,
    event: ChannelEvent,
) {
    if events.send(event).is_err() {
        debug!(tenant = %tenant, "nobody is listening for relay events");
    }
}

impl HttpRelayConnector {
    /// Requests a fresh link for the tenant. Returns the number key and
    /// whether the account is already linked.
    async fn pair(&self, req: &ConnectRequest) -> Result<(String, bool), HeraldError> {
        match self.client.pair(&req.tenant.0).await? {
            PairResponse::Qr { qr, number_key } => {
                debug!(tenant = %req.tenant, "relay issued a pairing code");
                emit(
                    &req.events,
                    &req.tenant,
                    ChannelEvent::PairingChallenge(PairingChallenge { code: qr }),
                );
                Ok((number_key, false))
            }
            PairResponse::Connected { number_key } => {
                req.store
                    .save(&req.tenant, &credentials_for(&number_key))
                    .await?;
                Ok((number_key, true))
            }
        }
    }
}

#[async_trait]
impl ChannelConnector for HttpRelayConnector {
    async fn open(&self, req: ConnectRequest) -> Result<Arc<dyn DeliveryChannel>, HeraldError> {
        let stored = req.credentials.as_ref().and_then(number_key_of);

        // A stored key is only worth resuming while the relay still has the
        // device linked. A device back in `pending` needs a new pairing code.
        let (number_key, linked, resumed) = match stored {
            Some(key) => match self.client.device_status(&key).await {
                Ok(DeviceState::Pending) => {
                    info!(tenant = %req.tenant, "stored relay key is no longer linked; pairing again");
                    let (key, linked) = self.pair(&req).await?;
                    (key, linked, false)
                }
                Ok(DeviceState::Connected) => (key, true, true),
                Ok(DeviceState::LoggedOut) => (key, false, true),
                Err(e) => {
                    debug!(tenant = %req.tenant, error = %e, "device status unavailable; resuming stored key");
                    (key, false, true)
                }
            },
            None => {
                let (key, linked) = self.pair(&req).await?;
                (key, linked, false)
            }
        };

        let cancel = self.shutdown.child_token();
        let monitor = DeviceMonitor {
            client: self.client.clone(),
            tenant: req.tenant.clone(),
            number_key: number_key.clone(),
            store: Arc::clone(&req.store),
            events: req.events.clone(),
            interval: self.poll_interval,
            persisted: resumed || linked,
            connected: linked,
        };
        if linked {
            emit(&req.events, &req.tenant, ChannelEvent::Connected);
        }
        tokio::spawn(monitor.run(cancel.clone()));
        info!(tenant = %req.tenant, resumed, linked, "relay session opened");

        Ok(Arc::new(RelayChannel {
            client: self.client.clone(),
            number_key,
            cancel,
        }))
    }
}

/// One tenant's relay session.
pub struct RelayChannel {
    client: RelayClient,
    number_key: String,
    cancel: CancellationToken,
}

fn public_url(media: &MediaRef) -> Result<&str, HeraldError> {
    if media.is_public_url() {
        Ok(&media.0)
    } else {
        Err(HeraldError::Validation(format!(
            "media reference {} is not a public URL",
            media.0
        )))
    }
}

#[async_trait]
impl DeliveryChannel for RelayChannel {
    async fn send(&self, msg: &OutboundMessage) -> Result<MessageId, HeraldError> {
        if self.cancel.is_cancelled() {
            return Err(HeraldError::channel("relay session is closed"));
        }
        let Some(media) = &msg.media else {
            return self
                .client
                .send_text(&self.number_key, &msg.to, &msg.text)
                .await;
        };

        let url = public_url(media)?;
        match media.kind() {
            MediaKind::Image => {
                self.client
                    .send_image(&self.number_key, &msg.to, url, &msg.text)
                    .await
            }
            MediaKind::Video | MediaKind::Document => {
                self.client
                    .send_file(&self.number_key, &msg.to, url, media.file_name(), &msg.text)
                    .await
            }
        }
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.cancel.cancel();
        Ok(())
    }

    async fn logout(&self) -> Result<(), HeraldError> {
        self.cancel.cancel();
        self.client.logout(&self.number_key).await
    }
}
