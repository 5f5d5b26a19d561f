// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted channel connector for deterministic pool and dispatch tests.
//!
//! [`ScriptedConnector`] decides per tenant how pairing unfolds and per
//! address how deliveries fail. Every channel it opens shares one delivery
//! log, so tests can assert on what was sent regardless of reconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use herald_core::{
    AdapterType, ChannelConnector, ChannelEvent, ConnectRequest, Credentials, DeliveryChannel,
    DisconnectReason, HealthStatus, HeraldError, MessageId, OutboundMessage, PairingChallenge,
    PluginAdapter, SessionStore, TenantId,
};

/// How a tenant's connection attempt unfolds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingScript {
    /// Connect as soon as the channel opens.
    Connect,
    /// Issue this challenge code. Connects only after
    /// [`ScriptedConnector::approve`], unless credentials were already stored.
    Challenge(String),
    /// Emit nothing at all.
    Silent,
    /// Refuse to open a channel.
    Refuse,
}

/// Scripted behaviour of deliveries to one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the next `n` attempts with a transient error, then succeed.
    FailTimes(u32),
    /// Fail every attempt with a transient error.
    AlwaysFail,
    /// Fail every attempt with a validation error from the network.
    Reject,
    /// Never complete.
    Hang,
}

#[derive(Default)]
struct Deliveries {
    sent: Vec<OutboundMessage>,
    attempts: HashMap<String, u32>,
    faults: HashMap<String, Fault>,
    delay: Duration,
}

struct TenantScript {
    script: PairingScript,
    events: Option<mpsc::UnboundedSender<ChannelEvent>>,
    store: Option<Arc<dyn SessionStore>>,
    channels: Vec<Arc<ScriptedChannel>>,
}

impl TenantScript {
    fn new(script: PairingScript) -> Self {
        Self {
            script,
            events: None,
            store: None,
            channels: Vec::new(),
        }
    }
}

/// A [`ChannelConnector`] driven entirely by test scripts.
pub struct ScriptedConnector {
    default_script: PairingScript,
    tenants: Mutex<HashMap<TenantId, TenantScript>>,
    deliveries: Arc<Mutex<Deliveries>>,
    opens: AtomicUsize,
    open_delay: Mutex<Duration>,
}

impl ScriptedConnector {
    /// A connector whose tenants connect immediately unless scripted otherwise.
    pub fn new() -> Self {
        Self::with_default(PairingScript::Connect)
    }

    pub fn with_default(default_script: PairingScript) -> Self {
        Self {
            default_script,
            tenants: Mutex::new(HashMap::new()),
            deliveries: Arc::new(Mutex::new(Deliveries::default())),
            opens: AtomicUsize::new(0),
            open_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub async fn script(&self, tenant: &TenantId, script: PairingScript) {
        let mut tenants = self.tenants.lock().await;
        let entry = tenants
            .entry(tenant.clone())
            .or_insert_with(|| TenantScript::new(script.clone()));
        entry.script = script;
    }

    /// Completes a pending pairing: saves credentials and reports the session connected.
    pub async fn approve(&self, tenant: &TenantId) {
        let (events, store) = {
            let tenants = self.tenants.lock().await;
            let Some(entry) = tenants.get(tenant) else {
                return;
            };
            (entry.events.clone(), entry.store.clone())
        };
        if let Some(store) = store {
            let _ = store.save(tenant, &scripted_credentials(tenant)).await;
        }
        if let Some(events) = events {
            emit(&events, tenant, ChannelEvent::Connected);
        }
    }

    /// Reports the tenant's latest channel as closed.
    pub async fn drop_connection(&self, tenant: &TenantId, reason: DisconnectReason) {
        let tenants = self.tenants.lock().await;
        if let Some(events) = tenants.get(tenant).and_then(|t| t.events.as_ref()) {
            emit(events, tenant, ChannelEvent::Closed(reason));
        }
    }

    pub async fn set_fault(&self, address: &str, fault: Fault) {
        self.deliveries
            .lock()
            .await
            .faults
            .insert(address.to_string(), fault);
    }

    /// Delays every `open` call, as a slow network handshake would.
    pub async fn set_open_delay(&self, delay: Duration) {
        *self.open_delay.lock().await = delay;
    }

    /// Adds a fixed delay to every successful delivery.
    pub async fn set_send_delay(&self, delay: Duration) {
        self.deliveries.lock().await.delay = delay;
    }

    /// Messages delivered successfully, in delivery order.
    pub async fn sent(&self) -> Vec<OutboundMessage> {
        self.deliveries.lock().await.sent.clone()
    }

    /// Delivery attempts made to an address, failed ones included.
    pub async fn attempts(&self, address: &str) -> u32 {
        self.deliveries
            .lock()
            .await
            .attempts
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Channels opened across all tenants.
    pub fn total_opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Channels opened for one tenant.
    pub async fn opens(&self, tenant: &TenantId) -> usize {
        self.tenants
            .lock()
            .await
            .get(tenant)
            .map_or(0, |t| t.channels.len())
    }

    /// Channels for the tenant that are neither closed nor logged out.
    pub async fn live_channels(&self, tenant: &TenantId) -> usize {
        self.tenants.lock().await.get(tenant).map_or(0, |t| {
            t.channels.iter().filter(|c| c.is_live()).count()
        })
    }

    /// The most recently opened channel for the tenant.
    pub async fn latest_channel(&self, tenant: &TenantId) -> Option<Arc<ScriptedChannel>> {
        self.tenants
            .lock()
            .await
            .get(tenant)
            .and_then(|t| t.channels.last().cloned())
    }
}

impl Default for ScriptedConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn scripted_credentials(tenant: &TenantId) -> Credentials {
    Credentials::new(serde_json::json!({ "number_key": format!("key-{tenant}") }))
}

#[async_trait]
impl PluginAdapter for ScriptedConnector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelConnector for ScriptedConnector {
    async fn open(&self, req: ConnectRequest) -> Result<Arc<dyn DeliveryChannel>, HeraldError> {
        let delay = *self.open_delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut tenants = self.tenants.lock().await;
        let entry = tenants
            .entry(req.tenant.clone())
            .or_insert_with(|| TenantScript::new(self.default_script.clone()));
        if entry.script == PairingScript::Refuse {
            return Err(HeraldError::channel("scripted refusal"));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        debug!(tenant = %req.tenant, script = ?entry.script, "scripted channel opened");

        let channel = Arc::new(ScriptedChannel {
            deliveries: Arc::clone(&self.deliveries),
            closed: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
        });
        entry.channels.push(Arc::clone(&channel));
        entry.events = Some(req.events.clone());
        entry.store = Some(Arc::clone(&req.store));

        match &entry.script {
            PairingScript::Connect => {
                if req.credentials.is_none() {
                    req.store
                        .save(&req.tenant, &scripted_credentials(&req.tenant))
                        .await?;
                }
                emit(&req.events, &req.tenant, ChannelEvent::Connected);
            }
            PairingScript::Challenge(code) => {
                if req.credentials.is_some() {
                    emit(&req.events, &req.tenant, ChannelEvent::Connected);
                } else {
                    let challenge = PairingChallenge { code: code.clone() };
                    emit(&req.events, &req.tenant, ChannelEvent::PairingChallenge(challenge));
                }
            }
            PairingScript::Silent | PairingScript::Refuse => {}
        }
        Ok(channel)
    }
}

fn emit(
    events: &mpsc::UnboundedSender<ChannelEvent>,
    tenant: &TenantId,
    event: ChannelEvent,
) {
    if events.send(event).is_err() {
        debug!(tenant = %tenant, "scripted event had no listener");
    }
}

/// A channel whose deliveries follow the connector's fault table.
pub struct ScriptedChannel {
    deliveries: Arc<Mutex<Deliveries>>,
    closed: AtomicBool,
    logged_out: AtomicBool,
}

impl ScriptedChannel {
    pub fn is_live(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.logged_out.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryChannel for ScriptedChannel {
    async fn send(&self, msg: &OutboundMessage) -> Result<MessageId, HeraldError> {
        if !self.is_live() {
            return Err(HeraldError::channel("channel closed"));
        }
        let (fault, delay) = {
            let mut deliveries = self.deliveries.lock().await;
            *deliveries.attempts.entry(msg.to.clone()).or_insert(0) += 1;
            let fault = match deliveries.faults.get_mut(&msg.to) {
                Some(Fault::FailTimes(0)) | None => None,
                Some(Fault::FailTimes(n)) => {
                    *n -= 1;
                    Some(Fault::FailTimes(*n + 1))
                }
                Some(other) => Some(*other),
            };
            (fault, deliveries.delay)
        };

        match fault {
            Some(Fault::Hang) => std::future::pending().await,
            Some(Fault::Reject) => Err(HeraldError::Validation(format!(
                "recipient {} is not on the network",
                msg.to
            ))),
            Some(Fault::FailTimes(_) | Fault::AlwaysFail) => {
                Err(HeraldError::channel(format!("delivery to {} failed", msg.to)))
            }
            None => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let mut deliveries = self.deliveries.lock().await;
                deliveries.sent.push(msg.clone());
                Ok(MessageId(format!("scripted-{}", deliveries.sent.len())))
            }
        }
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), HeraldError> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}
