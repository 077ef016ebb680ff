//! Error types for buffer, scheduler, and delivery operations.

use thiserror::Error;

/// Errors produced by messenger components.
///
/// An empty queue is not represented here: `Buffer::claim` reports it as
/// `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    /// A required input was empty or malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// The store was unreachable or a transaction failed.
    #[error("persistence error: {0}")]
    Persistence(String),
    /// The notification sender failed to deliver to one or more recipients.
    #[error("delivery error: {0}")]
    Delivery(String),
    /// Configuration could not be parsed or failed validation.
    #[error("config error: {0}")]
    Config(String),
}

impl MessengerError {
    /// Wrap any displayable store failure with context.
    pub fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{context}: {err}"))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
