// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Herald messaging service.

use thiserror::Error;

use crate::types::TenantId;

/// The primary error type used across all Herald adapter traits and core operations.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Delivery channel errors (transport failure, rejected message, closed session).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input rejected before any state was touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The operation is not allowed in the current state of the target.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested entity does not exist (or belongs to another tenant).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// No usable messaging session could be obtained for the tenant.
    #[error("no usable session for tenant {tenant}: {reason}")]
    SessionUnavailable { tenant: TenantId, reason: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The operation was cancelled before it finished.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Shorthand for a [`HeraldError::Channel`] without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        HeraldError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a delivery attempt that failed with this error is worth repeating.
    pub fn is_transient(&self) -> bool {
        matches!(self, HeraldError::Channel { .. } | HeraldError::Timeout { .. })
    }
}
