//! Tests for configuration validation

use std::path::PathBuf;
use std::time::Duration;

use buffered_messenger::config::{BufferBackendConfig, LogFormat, MessengerConfig, SenderConfig};
use buffered_messenger::core::MessengerError;

#[test]
fn test_messenger_config_validation() {
    let valid = MessengerConfig {
        tick_period_ms: 500,
        shutdown_grace_ms: 2_000,
        error_sink_capacity: 16,
        buffer: BufferBackendConfig::Sqlite {
            path: PathBuf::from("buffer.db"),
            busy_timeout_ms: 1_000,
        },
        sender: SenderConfig::Log,
        log_format: LogFormat::Text,
    };
    assert!(valid.validate().is_ok());
}

#[test]
fn test_messenger_config_invalid_tick_period() {
    let invalid = MessengerConfig {
        tick_period_ms: 0,
        ..MessengerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_messenger_config_invalid_grace() {
    let invalid = MessengerConfig {
        shutdown_grace_ms: 0,
        ..MessengerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_messenger_config_invalid_sink_capacity() {
    let invalid = MessengerConfig {
        error_sink_capacity: 0,
        ..MessengerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_twilio_requires_credentials() {
    let invalid = MessengerConfig {
        sender: SenderConfig::Twilio {
            account_sid: "AC1".into(),
            auth_token: String::new(),
            api_base: "https://api.twilio.com".into(),
        },
        ..MessengerConfig::default()
    };
    assert_eq!(
        invalid.validate(),
        Err(MessengerError::Config("twilio auth_token must not be empty".into()))
    );
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = MessengerConfig::from_json_str(
        r#"{
            "tick_period_ms": 250,
            "buffer": { "kind": "sqlite", "path": "/tmp/buffer.db" },
            "sender": { "kind": "message_bird", "access_key": "live_key" },
            "log_format": "json"
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.tick_period_ms, 250);
    assert_eq!(cfg.shutdown_grace_ms, 5_000);
    assert_eq!(cfg.error_sink_capacity, 256);
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert_eq!(
        cfg.buffer,
        BufferBackendConfig::Sqlite {
            path: PathBuf::from("/tmp/buffer.db"),
            busy_timeout_ms: 5_000,
        }
    );
    assert_eq!(
        cfg.sender,
        SenderConfig::MessageBird {
            access_key: "live_key".into(),
            api_base: "https://rest.messagebird.com".into(),
        }
    );
    assert_eq!(cfg.scheduler_settings().tick_period, Duration::from_millis(250));
}

#[test]
fn test_from_json_str_rejects_unknown_backend() {
    let err =
        MessengerConfig::from_json_str(r#"{ "buffer": { "kind": "postgres" } }"#).unwrap_err();
    assert!(matches!(err, MessengerError::Config(_)));
}

#[test]
fn test_from_lookup_defaults_when_unset() {
    let cfg = MessengerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, MessengerConfig::default());
}

#[test]
fn test_from_lookup_rejects_unknown_sender() {
    let err = MessengerConfig::from_lookup(|key| {
        (key == "MESSENGER_SENDER").then(|| "carrier_pigeon".to_string())
    })
    .unwrap_err();
    assert!(err.to_string().contains("MESSENGER_SENDER"));
}
