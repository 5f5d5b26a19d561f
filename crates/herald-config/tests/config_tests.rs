// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Herald configuration system.

use herald_config::diagnostic::ConfigError;
use herald_config::model::HeraldConfig;
use herald_config::{load_and_validate_str, load_config, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_herald_config() {
    let toml = r#"
[service]
name = "herald-test"
log_level = "debug"

[storage]
database_path = "/tmp/herald-test.db"
wal_mode = false

[sessions]
credentials_dir = "/tmp/herald-creds"
idle_timeout_secs = 600
pairing_window_secs = 5
pairing_timeout_secs = 60
terminal_disconnect_codes = [401]

[dispatch]
max_attempts = 3
retry_delay_ms = 100
throttle_base_ms = 0
throttle_jitter_ms = 0
country_code = "44"
mobile_prefix = "7"
min_subscriber_digits = 10
max_subscriber_digits = 10

[relay]
api_url = "https://relay.example.com/api"
api_key = "key-123"

[gateway]
host = "0.0.0.0"
port = 8080

[gateway.tokens]
"token-a" = "tenant-a"
"token-b" = "tenant-b"

[retention]
enabled = false
schedule = "30 2 * * *"
retention_days = 7
media_dir = "/srv/uploads"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "herald-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/herald-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.sessions.idle_timeout_secs, 600);
    assert_eq!(config.sessions.terminal_disconnect_codes, vec![401]);
    // Unset keys keep their defaults.
    assert_eq!(config.sessions.reconnect_delay_secs, 5);
    assert_eq!(config.dispatch.max_attempts, 3);
    assert_eq!(config.dispatch.country_code, "44");
    assert_eq!(config.relay.api_key.as_deref(), Some("key-123"));
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.tokens.get("token-b").map(String::as_str), Some("tenant-b"));
    assert!(!config.retention.enabled);
    assert_eq!(config.retention.media_dir.as_deref(), Some("/srv/uploads"));
}

#[test]
fn empty_toml_yields_defaults() {
    let config = load_and_validate_str("").expect("defaults should be valid");
    let defaults = HeraldConfig::default();
    assert_eq!(config.service.name, "herald");
    assert_eq!(config.sessions.idle_timeout_secs, 3600);
    assert_eq!(config.sessions.pairing_window_secs, 10);
    assert_eq!(config.sessions.terminal_disconnect_codes, vec![401, 440]);
    assert_eq!(config.dispatch.max_attempts, 2);
    assert_eq!(config.dispatch.retry_delay_ms, 1500);
    assert_eq!(config.dispatch.throttle_base_ms, 4000);
    assert_eq!(config.dispatch.throttle_jitter_ms, 4000);
    assert_eq!(config.retention.schedule, "0 3 * * *");
    assert_eq!(config.retention.retention_days, 30);
    assert_eq!(config.gateway.port, defaults.gateway.port);
    assert!(config.storage.database_path.ends_with("herald.db"));
}

#[test]
fn unknown_field_is_rejected() {
    let toml = r#"
[dispatch]
max_atempts = 3
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("max_atempts"),
        "error should mention the bad key, got: {err_str}"
    );
}

#[test]
fn unknown_field_diagnostic_carries_suggestion() {
    let toml = r#"
[retention]
retention_dyas = 10
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "retention_dyas");
            assert_eq!(suggestion.as_deref(), Some("retention_days"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").expect_err("should fail");
    assert!(!errors.is_empty());
}

#[test]
fn wrong_type_is_reported() {
    let errors = load_and_validate_str("[gateway]\nport = \"eighty\"\n").expect_err("should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::WrongType { .. })),
        "expected WrongType, got {errors:?}"
    );
}

#[test]
fn validation_collects_every_problem() {
    let toml = r#"
[sessions]
pairing_window_secs = 30
pairing_timeout_secs = 10

[dispatch]
max_attempts = 0
country_code = "+62"
min_subscriber_digits = 14
max_subscriber_digits = 12

[retention]
schedule = "every night"
retention_days = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let has = |needle: &str| messages.iter().any(|m| m.contains(needle));
    assert!(has("pairing_timeout_secs"), "{messages:?}");
    assert!(has("max_attempts"), "{messages:?}");
    assert!(has("country_code"), "{messages:?}");
    assert!(has("min_subscriber_digits"), "{messages:?}");
    assert!(has("retention.schedule"), "{messages:?}");
    assert!(has("retention_days"), "{messages:?}");
    assert!(errors.len() >= 6);
}

#[test]
fn empty_tenant_for_token_is_rejected() {
    let toml = r#"
[gateway.tokens]
"secret" = " "
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| e.to_string().contains("gateway.tokens")));
}

#[test]
fn relative_public_url_is_rejected() {
    let toml = r#"
[gateway]
public_url = "herald.example.com"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| e.to_string().contains("gateway.public_url")));
}

#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "herald.toml",
            r#"
[gateway]
port = 4000

[sessions]
idle_timeout_secs = 100
"#,
        )?;
        jail.set_env("HERALD_GATEWAY_PORT", "5000");
        jail.set_env("HERALD_SESSIONS_IDLE_TIMEOUT_SECS", "42");
        jail.set_env("HERALD_RELAY_API_KEY", "from-env");

        let config = load_config()?;
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.sessions.idle_timeout_secs, 42);
        assert_eq!(config.relay.api_key.as_deref(), Some("from-env"));
        Ok(())
    });
}
