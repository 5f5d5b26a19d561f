// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald outbound messaging service.
//!
//! This crate provides the trait definitions, error types, and domain types
//! shared by the connection pool, the broadcast dispatch engine, the delivery
//! ledger and the transports that plug into them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HeraldError;
pub use types::{
    AdapterType, Broadcast, BroadcastId, BroadcastStatistics, BroadcastStatus, BroadcastSummary,
    ChannelEvent, Credentials, Customer, DateRange, DeliveryOutcome, DeliveryStatus,
    DisconnectReason, HealthStatus, MediaKind, MediaRef, MessageId, MessageTemplate,
    NewRecipient, OutboundMessage, PairingChallenge, RecipientRecord, RecipientSelector,
    SessionStatus, StatusCounts, TenantId, now_timestamp,
};

pub use traits::{
    ChannelConnector, ConnectRequest, CustomerDirectory, DeliveryChannel, PluginAdapter,
    SessionProvider, SessionStore, StorageAdapter,
};
