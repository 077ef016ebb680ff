//! MessageBird SMS sender. One request carries every recipient.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use tracing::info;

use crate::core::{MessengerError, NotificationSender, QueuedMessage, Recipient};

/// Production MessageBird REST endpoint.
pub const MESSAGEBIRD_API_BASE: &str = "https://rest.messagebird.com";

#[derive(Serialize)]
struct CreateMessage<'a> {
    originator: &'a str,
    recipients: Vec<&'a str>,
    body: &'a str,
}

/// Delivers messages through the MessageBird Messages API.
#[derive(Debug, Clone)]
pub struct MessageBirdSender {
    client: reqwest::Client,
    access_key: String,
    api_base: String,
}

impl MessageBirdSender {
    /// Create a sender with an access key. Timeouts come from `client`.
    pub fn new(client: reqwest::Client, access_key: impl Into<String>) -> Self {
        Self {
            client,
            access_key: access_key.into(),
            api_base: MESSAGEBIRD_API_BASE.to_string(),
        }
    }

    /// Point the sender at another API host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_request(
        &self,
        message: &QueuedMessage,
        recipients: &[Recipient],
    ) -> Result<reqwest::Request, reqwest::Error> {
        let payload = CreateMessage {
            originator: &message.originator,
            recipients: recipients.iter().map(|r| r.phone_number.as_str()).collect(),
            body: &message.text,
        };
        self.client
            .post(format!("{}/messages", self.api_base.trim_end_matches('/')))
            .header(AUTHORIZATION, format!("AccessKey {}", self.access_key))
            .header(ACCEPT, "application/json")
            .json(&payload)
            .build()
    }
}

#[async_trait]
impl NotificationSender for MessageBirdSender {
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
            "sending message via messagebird"
        );

        let request = self
            .build_request(message, recipients)
            .map_err(|e| MessengerError::Delivery(format!("failed to build request: {e}")))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| MessengerError::Delivery(format!("messagebird request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(MessengerError::Delivery(format!(
            "messagebird rejected message {} for {} recipient(s): status {status}: {body}",
            message.id,
            recipients.len()
        )))
    }
}
