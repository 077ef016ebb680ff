//! Tests for component builders

use std::sync::Arc;

use buffered_messenger::builders::{build_buffer, build_error_sink, build_scheduler, build_sender};
use buffered_messenger::config::{BufferBackendConfig, MessengerConfig, SenderConfig};
use buffered_messenger::core::{MessengerError, SchedulerState, TickOutcome};

#[tokio::test]
async fn test_build_in_memory_pipeline() {
    let cfg = MessengerConfig::default();
    let buffer = build_buffer(&cfg.buffer).unwrap();
    let sender = build_sender(&cfg.sender, reqwest::Client::new());
    let errors = build_error_sink(&cfg);

    buffer.save("111", "Acme", "hello").await.unwrap();

    let scheduler = build_scheduler(&cfg, Arc::clone(&buffer), sender, errors.clone()).unwrap();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(
        scheduler.tick().await,
        TickOutcome::Delivered {
            message_id: 1,
            recipients: 1
        }
    );
    assert!(errors.events().is_empty());
}

#[tokio::test]
async fn test_build_sqlite_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("buffer.db");
    let buffer = build_buffer(&BufferBackendConfig::Sqlite {
        path: path.clone(),
        busy_timeout_ms: 1_000,
    })
    .unwrap();

    buffer.save("111", "Acme", "hello").await.unwrap();
    assert!(path.exists());
    assert_eq!(buffer.claim().await.unwrap().map(|m| m.id), Some(1));
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let cfg = MessengerConfig {
        tick_period_ms: 0,
        ..MessengerConfig::default()
    };
    let buffer = build_buffer(&cfg.buffer).unwrap();
    let sender = build_sender(
        &SenderConfig::MessageBird {
            access_key: "k".into(),
            api_base: "http://localhost:1".into(),
        },
        reqwest::Client::new(),
    );
    let errors = build_error_sink(&MessengerConfig::default());

    let err = build_scheduler(&cfg, buffer, sender, errors).err();
    assert!(matches!(err, Some(MessengerError::Config(_))));
}
