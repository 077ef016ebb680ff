//! Tests for the SMS submission surface

use std::sync::Arc;

use buffered_messenger::core::{Buffer, Messenger, MessengerError, SchedulerSettings};
use buffered_messenger::infra::InMemoryBuffer;
use buffered_messenger::runtime::{health, submit_sms, Accepted, SmsSubmission, MAX_MESSAGE_CHARS};

fn submission(originator: &str, recipient: &str, message: &str) -> SmsSubmission {
    SmsSubmission {
        originator: originator.to_string(),
        recipient: recipient.to_string(),
        message: message.to_string(),
    }
}

#[test]
fn test_validate_message_length() {
    let at_limit = submission("Acme", "+31600000000", &"x".repeat(MAX_MESSAGE_CHARS));
    assert!(at_limit.validate().is_ok());

    let too_long = submission("Acme", "+31600000000", &"x".repeat(MAX_MESSAGE_CHARS + 1));
    assert_eq!(
        too_long.validate(),
        Err(MessengerError::Validation("message too long".into()))
    );
}

#[test]
fn test_validate_counts_characters_not_bytes() {
    let accented = submission("Acme", "+31600000000", &"é".repeat(MAX_MESSAGE_CHARS));
    assert!(accented.validate().is_ok());
}

#[test]
fn test_validate_required_fields() {
    assert_eq!(
        submission("", "+31600000000", "hi").validate(),
        Err(MessengerError::Validation("originator required".into()))
    );
    assert_eq!(
        submission("Acme", "", "hi").validate(),
        Err(MessengerError::Validation("recipient required".into()))
    );
}

#[tokio::test]
async fn test_submit_sms_enqueues_into_buffer() {
    let buffer = Arc::new(InMemoryBuffer::new());
    let messenger = Messenger::new(buffer.clone(), SchedulerSettings::default());

    let accepted = submit_sms(&messenger, submission("Acme", "111", "hello"))
        .await
        .unwrap();
    assert_eq!(accepted, Accepted::default());
    assert_eq!(accepted.status, "accepted");

    submit_sms(&messenger, submission("Acme", "222", "hello"))
        .await
        .unwrap();

    assert_eq!(buffer.len(), 1);
    let message = buffer.claim().await.unwrap().unwrap();
    let phones: Vec<_> = buffer
        .recipients(message.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.phone_number)
        .collect();
    assert_eq!(phones, vec!["111", "222"]);
}

#[tokio::test]
async fn test_submit_sms_rejects_before_enqueue() {
    let buffer = Arc::new(InMemoryBuffer::new());
    let messenger = Messenger::new(buffer.clone(), SchedulerSettings::default());

    let err = submit_sms(&messenger, submission("Acme", "", "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, MessengerError::Validation(_)));
    assert!(buffer.is_empty());
}

#[test]
fn test_health() {
    assert!(health().ok);
}
