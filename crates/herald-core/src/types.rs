// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the connection pool, the dispatch engine and the ledger.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque identifier of a business account. All sessions and broadcasts are scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(value: &str) -> Self {
        TenantId(value.to_string())
    }
}

/// Unique identifier for a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastId(pub String);

impl BroadcastId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        BroadcastId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for BroadcastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BroadcastId {
    fn from(value: &str) -> Self {
        BroadcastId(value.to_string())
    }
}

/// Identifier returned by a delivery channel for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
}

/// Current UTC time in the millisecond ISO 8601 form used by every persisted timestamp.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

// --- Broadcast ledger ---

/// Lifecycle status of a broadcast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    Draft,
    Sending,
    Completed,
    Failed,
    Partial,
}

impl BroadcastStatus {
    /// Terminal broadcasts are immutable and can no longer be dispatched.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BroadcastStatus::Completed | BroadcastStatus::Failed | BroadcastStatus::Partial
        )
    }

    /// Derives the terminal status from the full set of recipient outcomes.
    ///
    /// `Failed` when nothing was sent out of a non-empty set, `Completed` when
    /// nothing failed, `Partial` for any mix.
    pub fn from_counts(counts: &StatusCounts) -> Self {
        if counts.total() > 0 && counts.sent == 0 {
            BroadcastStatus::Failed
        } else if counts.failed == 0 {
            BroadcastStatus::Completed
        } else {
            BroadcastStatus::Partial
        }
    }
}

/// Delivery status of a single recipient record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// Per-status tallies of a broadcast's recipient records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub sent: u64,
    pub failed: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.sent + self.failed
    }
}

/// Kind of attachment, derived from the media reference's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

/// Reference to a media attachment, as a URL the delivery network can fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(pub String);

impl MediaRef {
    /// Whether the reference is an absolute `http(s)` URL.
    pub fn is_public_url(&self) -> bool {
        ["https://", "http://"].iter().any(|scheme| {
            self.0
                .get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
                && self.0.len() > scheme.len()
        })
    }

    pub fn kind(&self) -> MediaKind {
        let ext = self
            .file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => MediaKind::Image,
            "mp4" | "mov" | "3gp" => MediaKind::Video,
            _ => MediaKind::Document,
        }
    }

    /// Last path segment of the reference, without any query string.
    pub fn file_name(&self) -> &str {
        let path = self.0.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().unwrap_or(path)
    }
}

/// The message a broadcast sends: a text body with optional attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub body: String,
    #[serde(default)]
    pub media: Option<MediaRef>,
}

/// A named message campaign for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Broadcast {
    pub id: BroadcastId,
    pub tenant_id: TenantId,
    pub title: String,
    pub template: MessageTemplate,
    pub status: BroadcastStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// A broadcast together with its recipient tallies, as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastSummary {
    #[serde(flatten)]
    pub broadcast: Broadcast,
    pub counts: StatusCounts,
}

/// One row per (broadcast, recipient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    pub id: i64,
    pub broadcast_id: BroadcastId,
    pub customer_id: Option<i64>,
    pub name: String,
    /// Normalized international address, digits only.
    pub address: String,
    pub email: Option<String>,
    /// Personalized message as it was (or was attempted to be) delivered.
    pub message: Option<String>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

/// A validated recipient about to be written as a pending record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipient {
    pub customer_id: Option<i64>,
    pub name: String,
    pub address: String,
    pub email: Option<String>,
}

/// Result of one recipient's attempt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent { message: String, sent_at: String },
    Failed { message: String, error: String },
}

/// Tenant-scoped aggregate counts for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastStatistics {
    pub total_broadcasts: u64,
    pub total_recipients: u64,
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
    /// `round(100 * sent / (sent + failed))`, 0 when nothing was attempted.
    pub success_rate: u32,
}

impl BroadcastStatistics {
    pub fn success_rate(sent: u64, failed: u64) -> u32 {
        let attempted = sent + failed;
        if attempted == 0 {
            return 0;
        }
        ((sent as f64 / attempted as f64) * 100.0).round() as u32
    }
}

/// Inclusive creation-date window for statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

// --- Recipients ---

/// A customer as exposed by the externally owned customer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Which of a tenant's customers a broadcast targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientSelector {
    /// Every customer of the tenant.
    All,
    /// An explicit list of customer ids.
    Customers(Vec<i64>),
}

// --- Channel ---

/// A single message handed to a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Normalized recipient address.
    pub to: String,
    pub text: String,
    pub media: Option<MediaRef>,
}

/// Out-of-band confirmation the operator must complete to pair a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingChallenge {
    pub code: String,
}

/// Why a channel session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Transport status code, when the transport reports one.
    pub code: Option<u16>,
    pub detail: String,
}

impl DisconnectReason {
    /// Status code transports use for an explicit logout.
    pub const LOGGED_OUT: u16 = 401;

    pub fn logged_out() -> Self {
        DisconnectReason {
            code: Some(Self::LOGGED_OUT),
            detail: "logged out".to_string(),
        }
    }

    pub fn network(detail: impl Into<String>) -> Self {
        DisconnectReason {
            code: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({code})", self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

/// Lifecycle events emitted by a channel connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The operator must complete this challenge before the session opens.
    PairingChallenge(PairingChallenge),
    /// The session is open and usable.
    Connected,
    /// The session closed.
    Closed(DisconnectReason),
}

/// Coarse liveness of a tenant's session, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Connected,
    Disconnected,
}

/// Persisted credential material that lets a session reopen without re-pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub data: serde_json::Value,
    pub updated_at: String,
}

impl Credentials {
    pub fn new(data: serde_json::Value) -> Self {
        Credentials {
            data,
            updated_at: now_timestamp(),
        }
    }
}
