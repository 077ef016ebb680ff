//! Tests for error types

use buffered_messenger::core::MessengerError;

#[test]
fn test_validation_error() {
    let err = MessengerError::Validation("phone_number cannot be empty".to_string());
    assert_eq!(format!("{}", err), "validation error: phone_number cannot be empty");
}

#[test]
fn test_persistence_error_with_context() {
    let err =
        MessengerError::persistence("failed to begin claim transaction", "database is locked");
    assert_eq!(
        format!("{}", err),
        "persistence error: failed to begin claim transaction: database is locked"
    );
}

#[test]
fn test_delivery_error() {
    let err = MessengerError::Delivery("provider unavailable".to_string());
    assert_eq!(format!("{}", err), "delivery error: provider unavailable");
}

#[test]
fn test_config_error() {
    let err = MessengerError::Config("tick_period_ms must be greater than 0".to_string());
    assert_eq!(format!("{}", err), "config error: tick_period_ms must be greater than 0");
}

#[test]
fn test_converts_into_anyhow() {
    fn load() -> buffered_messenger::core::AppResult<()> {
        let parsed: Result<(), MessengerError> = Err(MessengerError::Config("bad".into()));
        parsed?;
        Ok(())
    }
    let err = load().unwrap_err();
    assert_eq!(err.to_string(), "config error: bad");
}
