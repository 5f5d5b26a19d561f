// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as ordered bounds, parsable schedules, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::HeraldConfig;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HeraldConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    let sessions = &config.sessions;
    if sessions.credentials_dir.trim().is_empty() {
        errors.push(invalid("sessions.credentials_dir must not be empty"));
    }
    if sessions.pairing_window_secs < 1 {
        errors.push(invalid("sessions.pairing_window_secs must be at least 1"));
    }
    if sessions.pairing_timeout_secs < sessions.pairing_window_secs {
        errors.push(invalid(format!(
            "sessions.pairing_timeout_secs ({}) must not be shorter than sessions.pairing_window_secs ({})",
            sessions.pairing_timeout_secs, sessions.pairing_window_secs
        )));
    }
    if sessions.idle_timeout_secs < 1 {
        errors.push(invalid("sessions.idle_timeout_secs must be at least 1"));
    }

    let dispatch = &config.dispatch;
    if dispatch.max_attempts < 1 {
        errors.push(invalid("dispatch.max_attempts must be at least 1"));
    }
    if dispatch.attempt_timeout_secs < 1 {
        errors.push(invalid("dispatch.attempt_timeout_secs must be at least 1"));
    }
    if dispatch.country_code.is_empty() || !dispatch.country_code.chars().all(|c| c.is_ascii_digit())
    {
        errors.push(invalid(format!(
            "dispatch.country_code `{}` must be a non-empty string of digits",
            dispatch.country_code
        )));
    }
    if !dispatch.mobile_prefix.chars().all(|c| c.is_ascii_digit()) {
        errors.push(invalid(format!(
            "dispatch.mobile_prefix `{}` must contain only digits",
            dispatch.mobile_prefix
        )));
    }
    if dispatch.min_subscriber_digits > dispatch.max_subscriber_digits {
        errors.push(invalid(format!(
            "dispatch.min_subscriber_digits ({}) exceeds dispatch.max_subscriber_digits ({})",
            dispatch.min_subscriber_digits, dispatch.max_subscriber_digits
        )));
    }
    if dispatch.min_subscriber_digits <= dispatch.mobile_prefix.len() {
        errors.push(invalid(
            "dispatch.min_subscriber_digits must be longer than dispatch.mobile_prefix",
        ));
    }

    if config.relay.api_url.trim().is_empty() {
        errors.push(invalid("relay.api_url must not be empty"));
    }
    if config.relay.status_poll_secs < 1 {
        errors.push(invalid("relay.status_poll_secs must be at least 1"));
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(invalid("gateway.host must not be empty"));
    }
    if let Some(url) = &config.gateway.public_url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        errors.push(invalid(format!(
            "gateway.public_url `{url}` must be an http(s) URL"
        )));
    }
    if config.gateway.max_upload_bytes == 0 {
        errors.push(invalid("gateway.max_upload_bytes must be at least 1"));
    }
    for (token, tenant) in &config.gateway.tokens {
        if token.trim().is_empty() {
            errors.push(invalid("gateway.tokens must not contain an empty token"));
        }
        if tenant.trim().is_empty() {
            errors.push(invalid("gateway.tokens must not map a token to an empty tenant id"));
        }
    }

    let retention = &config.retention;
    if let Err(e) = retention.schedule.parse::<croner::Cron>() {
        errors.push(invalid(format!(
            "retention.schedule `{}` is not a valid cron expression: {e}",
            retention.schedule
        )));
    }
    if retention.retention_days < 1 {
        errors.push(invalid("retention.retention_days must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
