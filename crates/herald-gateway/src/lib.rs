// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Herald messaging service.
//!
//! Exposes broadcast management and per-tenant connection control over a
//! JSON REST API, authenticated with per-tenant bearer tokens.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod media;
pub mod server;

pub use auth::TenantTokens;
pub use error::ApiError;
pub use media::MediaStore;
pub use server::{GatewayState, router, start_server};
