//! Buffered queue model and the store contract shared by all backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::MessengerError;

/// Store-assigned, monotonically increasing message identity.
pub type MessageId = i64;

/// A message waiting in (or claimed from) the delivery queue.
///
/// While unclaimed, a message is the single bucket for its
/// `(originator, text)` dedup key. Once claimed it is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// Identity assigned by the store on creation.
    pub id: MessageId,
    /// Sender identifier shown to recipients.
    pub originator: String,
    /// Message body.
    pub text: String,
    /// Whether a scheduler has taken this message for delivery.
    pub claimed: bool,
}

/// A phone number attached to a queued message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    /// Owning message identity.
    pub message_id: MessageId,
    /// Destination phone number.
    pub phone_number: String,
}

/// Durable queue with dedup-on-write and claim-on-read semantics.
///
/// Implementations must be safe for concurrent callers, including several
/// schedulers sharing one underlying store.
#[async_trait]
pub trait Buffer: Send + Sync {
    /// Queue `text` from `originator` for `phone_number`.
    ///
    /// Attaches the recipient to the unclaimed message with the same
    /// `(originator, text)` if one exists, otherwise creates a new message.
    /// Re-submitting an already attached recipient is a no-op.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Validation`] if any argument is empty, in which case
    /// the store is untouched; [`MessengerError::Persistence`] on store failure.
    async fn save(
        &self,
        phone_number: &str,
        originator: &str,
        text: &str,
    ) -> Result<(), MessengerError>;

    /// Atomically take the lowest-id unclaimed message and mark it claimed.
    ///
    /// Returns `Ok(None)` when nothing is waiting.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Persistence`] on store failure.
    async fn claim(&self) -> Result<Option<QueuedMessage>, MessengerError>;

    /// All recipients attached to `message_id`, in attach order.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Persistence`] on store failure.
    async fn recipients(&self, message_id: MessageId) -> Result<Vec<Recipient>, MessengerError>;
}

/// Reject empty `Save` arguments before touching the store.
pub(crate) fn validate_save_args(
    phone_number: &str,
    originator: &str,
    text: &str,
) -> Result<(), MessengerError> {
    for (field, value) in [
        ("phone_number", phone_number),
        ("originator", originator),
        ("text", text),
    ] {
        if value.is_empty() {
            return Err(MessengerError::Validation(format!("{field} cannot be empty")));
        }
    }
    Ok(())
}
