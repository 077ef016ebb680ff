//! API-facing request/response models for SMS submission.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::core::{Messenger, MessengerError, Sms};

/// Longest accepted message body, in characters.
pub const MAX_MESSAGE_CHARS: usize = 160;

/// SMS submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsSubmission {
    /// Sender name or number shown to the recipient.
    pub originator: String,
    /// Destination phone number.
    pub recipient: String,
    /// Message body.
    pub message: String,
}

impl SmsSubmission {
    /// Check the payload before it reaches the buffer.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Validation`] for an overlong message or a missing
    /// originator or recipient, checked in that order.
    pub fn validate(&self) -> Result<(), MessengerError> {
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(MessengerError::Validation("message too long".into()));
        }
        if self.originator.is_empty() {
            return Err(MessengerError::Validation("originator required".into()));
        }
        if self.recipient.is_empty() {
            return Err(MessengerError::Validation("recipient required".into()));
        }
        Ok(())
    }
}

impl From<SmsSubmission> for Sms {
    fn from(req: SmsSubmission) -> Self {
        Self {
            originator: req.originator,
            recipient: req.recipient,
            message: req.message,
        }
    }
}

/// Acknowledgement for an enqueued submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accepted {
    /// Always `"accepted"`.
    pub status: String,
}

impl Default for Accepted {
    fn default() -> Self {
        Self {
            status: "accepted".to_string(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Validate a submission and enqueue it for delivery.
///
/// # Errors
///
/// Validation errors from [`SmsSubmission::validate`], or the buffer's error
/// when the save fails.
pub async fn submit_sms(
    messenger: &Messenger,
    req: SmsSubmission,
) -> Result<Accepted, MessengerError> {
    req.validate()?;
    let sms = Sms::from(req);
    messenger
        .enqueue_sms(&sms)
        .await
        .inspect_err(|e| error!(error = %e, "failed to enqueue notification"))?;
    debug!(originator = %sms.originator, "sms accepted");
    Ok(Accepted::default())
}

/// Return a health payload.
pub fn health() -> Health {
    Health { ok: true }
}
