//! Delivery provider abstraction.

use async_trait::async_trait;

use crate::core::{MessengerError, QueuedMessage, Recipient};

/// Attempts delivery of a claimed message to its recipients.
///
/// Implementations must try every recipient and report one aggregate outcome;
/// any failure among recipients is a single [`MessengerError::Delivery`].
/// Timeouts and retries are the implementation's concern.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use buffered_messenger::core::{MessengerError, NotificationSender, QueuedMessage, Recipient};
///
/// struct StdoutSender;
///
/// #[async_trait]
/// impl NotificationSender for StdoutSender {
///     async fn send(
///         &self,
///         message: &QueuedMessage,
///         recipients: &[Recipient],
///     ) -> Result<(), MessengerError> {
///         for r in recipients {
///             println!("{} -> {}: {}", message.originator, r.phone_number, message.text);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Deliver `message` to every recipient.
    ///
    /// # Errors
    ///
    /// [`MessengerError::Delivery`] if any recipient could not be reached.
    async fn send(
        &self,
        message: &QueuedMessage,
        recipients: &[Recipient],
    ) -> Result<(), MessengerError>;
}

/// Collect per-recipient failures into one delivery error.
pub(crate) fn aggregate_failures(failures: &[(String, String)]) -> Result<(), MessengerError> {
    if failures.is_empty() {
        return Ok(());
    }
    let detail = failures
        .iter()
        .map(|(phone, reason)| format!("{phone}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ");
    Err(MessengerError::Delivery(format!(
        "{} recipient(s) failed: {detail}",
        failures.len()
    )))
}
