// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Herald messaging subsystem.
//!
//! Long-lived backends extend the [`PluginAdapter`] base trait. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod credentials;
pub mod directory;
pub mod session;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::{ChannelConnector, ConnectRequest, DeliveryChannel};
pub use credentials::SessionStore;
pub use directory::CustomerDirectory;
pub use session::SessionProvider;
pub use storage::StorageAdapter;
