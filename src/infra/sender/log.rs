//! Sender that only logs deliveries. Useful for local runs without provider credentials.

use async_trait::async_trait;
use tracing::info;

use crate::core::{MessengerError, NotificationSender, QueuedMessage, Recipient};

/// Logs each delivery and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(
        &self,
        message: &QueuedMessage,
        recipients: &[Recipient],
    ) -> Result<(), MessengerError> {
        let numbers: Vec<&str> = recipients.iter().map(|r| r.phone_number.as_str()).collect();
        info!(
            message_id = message.id,
            originator = %message.originator,
            recipients = ?numbers,
            "sending message (log only)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let message = QueuedMessage {
            id: 1,
            originator: "O".into(),
            text: "T".into(),
            claimed: true,
        };
        let recipients = vec![Recipient {
            message_id: 1,
            phone_number: "+31600000000".into(),
        }];
        assert!(LogSender.send(&message, &recipients).await.is_ok());
    }
}
