//! Twilio SMS sender.
//!
//! Twilio accepts one destination per request, so every recipient gets its
//! own `POST`. All recipients are attempted; failures are aggregated.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{info, warn};

use crate::core::sender::aggregate_failures;
use crate::core::{MessengerError, NotificationSender, QueuedMessage, Recipient};

/// Production Twilio REST endpoint.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Delivers messages through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    api_base: String,
}

impl TwilioSender {
    /// Create a sender for an account. Timeouts come from `client`.
    pub fn new(
        client: reqwest::Client,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Point the sender at another API host (proxies, test servers).
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }

    fn build_request(
        &self,
        message: &QueuedMessage,
        phone_number: &str,
    ) -> Result<reqwest::Request, reqwest::Error> {
        self.client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(ACCEPT, "application/json")
            .form(&[
                ("To", phone_number),
                ("From", message.originator.as_str()),
                ("Body", message.text.as_str()),
            ])
            .build()
    }

    async fn send_one(&self, message: &QueuedMessage, phone_number: &str) -> Result<(), String> {
        let request = self
            .build_request(message, phone_number)
            .map_err(|e| e.to_string())?;
        let response = self.client.execute(request).await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("status {status}: {body}"));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for TwilioSender {
    async fn send(
        &self,
        message: &QueuedMessage,
        recipients: &[Recipient],
    ) -> Result<(), MessengerError> {
        let mut failures = Vec::new();
        for recipient in recipients {
            match self.send_one(message, &recipient.phone_number).await {
                Ok(()) => info!(
                    message_id = message.id,
                    phone_number = %recipient.phone_number,
                    "message sent via twilio"
                ),
                Err(reason) => {
                    warn!(
                        message_id = message.id,
                        phone_number = %recipient.phone_number,
                        error = %reason,
                        "twilio delivery failed"
                    );
                    failures.push((recipient.phone_number.clone(), reason));
                }
            }
        }
        aggregate_failures(&failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    fn message() -> QueuedMessage {
        QueuedMessage {
            id: 9,
            originator: "Acme".into(),
            text: "hello world".into(),
            claimed: true,
        }
    }

    #[test]
    fn test_request_shape() {
        let sender = TwilioSender::new(reqwest::Client::new(), "AC123", "secret")
            .with_api_base("http://localhost:9999/");
        let request = sender.build_request(&message(), "+31600000000").unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:9999/2010-04-01/Accounts/AC123/Messages.json"
        );
        let auth = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with("Basic "));
        assert_eq!(
            request.headers()[CONTENT_TYPE].to_str().unwrap(),
            "application/x-www-form-urlencoded"
        );
        let body = request.body().and_then(reqwest::Body::as_bytes).unwrap();
        assert_eq!(
            std::str::from_utf8(body).unwrap(),
            "To=%2B31600000000&From=Acme&Body=hello+world"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_every_recipient() {
        let sender = TwilioSender::new(reqwest::Client::new(), "AC123", "secret")
            .with_api_base("http://127.0.0.1:1");
        let recipients = vec![
            Recipient {
                message_id: 9,
                phone_number: "111".into(),
            },
            Recipient {
                message_id: 9,
                phone_number: "222".into(),
            },
        ];

        let err = sender.send(&message(), &recipients).await.unwrap_err();
        let MessengerError::Delivery(detail) = err else {
            panic!("expected delivery error");
        };
        assert!(detail.starts_with("2 recipient(s) failed"));
        assert!(detail.contains("111: "));
        assert!(detail.contains("222: "));
    }
}
