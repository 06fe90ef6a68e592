//! Outbound subscriber notifications
//!
//! Delivery is best-effort: callers log failures and move on.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use dramapass_types::SubscriberId;

/// Default Telegram Bot API host
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform refused the message
    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Sends a text message to a subscriber
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` (HTML formatted) to `to`
    async fn notify(&self, to: SubscriberId, text: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, to: SubscriberId, text: &str) -> Result<(), NotifyError> {
        info!(subscriber = %to, text = %text, "Notification");
        Ok(())
    }
}

/// Telegram Bot API notifier
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    /// Create a notifier for the bot identified by `token`
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self::with_base_url(client, TELEGRAM_API_BASE, token)
    }

    /// Create a notifier against another Bot API host
    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text))]
    async fn notify(&self, to: SubscriberId, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let response: TelegramResponse = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: to.0,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(NotifyError::Rejected(
                response.description.unwrap_or_else(|| "unknown".into()),
            ));
        }
        debug!(subscriber = %to, "Telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_sends_html_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": 42,
                "parse_mode": "HTML"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::with_base_url(Client::new(), server.uri(), "test-token");
        notifier.notify(SubscriberId(42), "<b>hi</b>").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found"
            })))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::with_base_url(Client::new(), server.uri(), "t");
        let err = notifier.notify(SubscriberId(1), "x").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(msg) if msg.contains("chat not found")));
    }
}
