// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Herald messaging service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Herald configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HeraldConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Delivery ledger database settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Connection pool settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Broadcast dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// HTTP relay transport settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Retention sweeper settings.
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "herald".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_data_dir() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|d| d.join("herald"))
        .unwrap_or_else(|| std::path::PathBuf::from(".herald"))
}

fn default_database_path() -> String {
    default_data_dir().join("herald.db").display().to_string()
}

fn default_true() -> bool {
    true
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Directory holding one credential folder per tenant.
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: String,

    /// A connected session unused for this long is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How long a connect request waits for a pairing challenge or readiness.
    #[serde(default = "default_pairing_window_secs")]
    pub pairing_window_secs: u64,

    /// How long an unanswered pairing attempt stays open in the background.
    #[serde(default = "default_pairing_timeout_secs")]
    pub pairing_timeout_secs: u64,

    /// Pause before reconnecting after a transient disconnect.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Consecutive transient disconnects tolerated before the session is dropped.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Disconnect codes meaning the credentials are no longer valid.
    #[serde(default = "default_terminal_disconnect_codes")]
    pub terminal_disconnect_codes: Vec<u16>,
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn pairing_window(&self) -> Duration {
        Duration::from_secs(self.pairing_window_secs)
    }

    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            credentials_dir: default_credentials_dir(),
            idle_timeout_secs: default_idle_timeout_secs(),
            pairing_window_secs: default_pairing_window_secs(),
            pairing_timeout_secs: default_pairing_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            terminal_disconnect_codes: default_terminal_disconnect_codes(),
        }
    }
}

fn default_credentials_dir() -> String {
    default_data_dir().join("credentials").display().to_string()
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_pairing_window_secs() -> u64 {
    10
}

fn default_pairing_timeout_secs() -> u64 {
    120
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_terminal_disconnect_codes() -> Vec<u16> {
    vec![401, 440]
}

/// Broadcast dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Delivery attempts per recipient, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts for the same recipient.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Fixed part of the pause between recipients.
    #[serde(default = "default_throttle_base_ms")]
    pub throttle_base_ms: u64,

    /// Upper bound of the random part of the pause between recipients.
    #[serde(default = "default_throttle_jitter_ms")]
    pub throttle_jitter_ms: u64,

    /// Bound on a single delivery attempt.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// International dialing code prefixed to local numbers.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Leading digit(s) of a mobile subscriber number after the country code.
    #[serde(default = "default_mobile_prefix")]
    pub mobile_prefix: String,

    /// Subscriber number length bounds, mobile prefix included.
    #[serde(default = "default_min_subscriber_digits")]
    pub min_subscriber_digits: usize,

    #[serde(default = "default_max_subscriber_digits")]
    pub max_subscriber_digits: usize,
}

impl DispatchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            throttle_base_ms: default_throttle_base_ms(),
            throttle_jitter_ms: default_throttle_jitter_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            country_code: default_country_code(),
            mobile_prefix: default_mobile_prefix(),
            min_subscriber_digits: default_min_subscriber_digits(),
            max_subscriber_digits: default_max_subscriber_digits(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1500
}

fn default_throttle_base_ms() -> u64 {
    4000
}

fn default_throttle_jitter_ms() -> u64 {
    4000
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_mobile_prefix() -> String {
    "8".to_string()
}

fn default_min_subscriber_digits() -> usize {
    9
}

fn default_max_subscriber_digits() -> usize {
    12
}

/// HTTP relay transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Base URL of the relay API.
    #[serde(default = "default_relay_api_url")]
    pub api_url: String,

    /// Account API key. `None` requires the `HERALD_RELAY_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Device status polling interval while a session is pairing or open.
    #[serde(default = "default_status_poll_secs")]
    pub status_poll_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_url: default_relay_api_url(),
            api_key: None,
            status_poll_secs: default_status_poll_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_relay_api_url() -> String {
    "http://127.0.0.1:8081/api".to_string()
}

fn default_status_poll_secs() -> u64 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token to tenant id. Each token authenticates exactly one tenant.
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,

    /// Base URL the relay reaches this gateway at. Media uploads are only
    /// accepted when this and `retention.media_dir` are both set.
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            tokens: BTreeMap::new(),
            public_url: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Retention sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cron expression (5 fields, UTC).
    #[serde(default = "default_retention_schedule")]
    pub schedule: String,

    /// Terminal broadcasts and media files older than this are removed.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Directory uploaded media files are written to and pruned from.
    #[serde(default)]
    pub media_dir: Option<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule: default_retention_schedule(),
            retention_days: default_retention_days(),
            media_dir: None,
        }
    }
}

fn default_retention_schedule() -> String {
    "0 3 * * *".to_string()
}

fn default_retention_days() -> u32 {
    30
}
