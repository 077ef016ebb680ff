//! Tests for error sinks

use std::sync::Arc;
use std::time::Duration;

use buffered_messenger::core::{
    build_error_event, BoundedErrorSink, ErrorSink, FailureStage, MessengerError, NoopErrorSink,
    TracingErrorSink,
};

#[test]
fn test_bounded_error_sink() {
    let sink = BoundedErrorSink::new(10);
    sink.report(build_error_event(
        FailureStage::Delivery,
        Some(7),
        MessengerError::Delivery("provider down".into()),
    ));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].stage, FailureStage::Delivery);
    assert_eq!(events[0].message_id, Some(7));
    assert!(events[0].occurred_at_ms > 0);
}

#[test]
fn test_bounded_error_sink_overflow() {
    let sink = BoundedErrorSink::new(2);
    for id in 1..=3 {
        sink.report(build_error_event(
            FailureStage::Recipients,
            Some(id),
            MessengerError::Persistence("gone".into()),
        ));
    }

    let events = sink.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message_id, Some(2)); // First one popped
    assert_eq!(events[1].message_id, Some(3));
    assert_eq!(sink.dropped(), 1);
    assert!(sink.events().is_empty());
}

#[test]
fn test_error_event_display() {
    let claim = build_error_event(
        FailureStage::Claim,
        None,
        MessengerError::Persistence("database is locked".into()),
    );
    assert_eq!(
        claim.to_string(),
        "failed to claim next message: persistence error: database is locked"
    );

    let send = build_error_event(
        FailureStage::Delivery,
        Some(4),
        MessengerError::Delivery("timeout".into()),
    );
    assert_eq!(
        send.to_string(),
        "failed to send notification for message 4: delivery error: timeout"
    );
}

#[test]
fn test_stateless_sinks_accept_events() {
    let event = build_error_event(
        FailureStage::Claim,
        None,
        MessengerError::Persistence("x".into()),
    );
    NoopErrorSink.report(event.clone());
    TracingErrorSink.report(event);
}

#[tokio::test]
async fn test_recv_wakes_on_report() {
    let sink = Arc::new(BoundedErrorSink::new(4));
    let consumer = {
        let sink = Arc::clone(&sink);
        tokio::spawn(async move { sink.recv().await })
    };

    tokio::task::yield_now().await;
    sink.report(build_error_event(
        FailureStage::Delivery,
        Some(1),
        MessengerError::Delivery("boom".into()),
    ));

    let event = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer woke")
        .expect("consumer task");
    assert_eq!(event.message_id, Some(1));
}
