// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery channel traits for the external messaging network.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::traits::credentials::SessionStore;
use crate::types::{ChannelEvent, Credentials, MessageId, OutboundMessage, TenantId};

/// An open (or opening) session on the messaging network for one tenant.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    /// Delivers one message. Errors are reported per call; the channel stays usable.
    async fn send(&self, msg: &OutboundMessage) -> Result<MessageId, HeraldError>;

    /// Closes the underlying connection without invalidating stored credentials.
    async fn close(&self) -> Result<(), HeraldError>;

    /// Logs the session out on the network side, invalidating its credentials.
    async fn logout(&self) -> Result<(), HeraldError>;
}

/// Everything a connector needs to open a session for a tenant.
pub struct ConnectRequest {
    pub tenant: TenantId,
    /// Previously persisted credentials, if the tenant has paired before.
    pub credentials: Option<Credentials>,
    /// Where updated credentials must be written as soon as the network issues them.
    pub store: Arc<dyn SessionStore>,
    /// Lifecycle events for this connection. Dropping the sender ends the connection's event stream.
    pub events: mpsc::UnboundedSender<ChannelEvent>,
}

/// Factory for channel sessions on a specific messaging network.
#[async_trait]
pub trait ChannelConnector: PluginAdapter {
    /// Starts opening a session. Pairing and readiness are reported through `req.events`.
    async fn open(&self, req: ConnectRequest) -> Result<Arc<dyn DeliveryChannel>, HeraldError>;
}
