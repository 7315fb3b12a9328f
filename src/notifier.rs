//! Operator notifications.
//!
//! Notifications are a side channel: callers go through [`notify_best_effort`]
//! so a failing webhook never changes the outcome of the DNS work it reports.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Upper bound on one webhook delivery.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Sink for status and error messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a plain-text message.
    async fn notify(&self, message: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts `{"text": ...}` to a chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    /// Create a notifier for the given webhook URL.
    pub fn new(webhook_url: String) -> Result<Self> {
        Self::with_timeout(webhook_url, WEBHOOK_TIMEOUT)
    }

    /// Create with a custom delivery timeout.
    pub fn with_timeout(webhook_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { text: message })
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DdnsError::Notify(format!(
                "received non-OK response: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Writes messages to the log when no webhook is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        tracing::info!(target: "cloud_ddns::notify", "{}", message);
        Ok(())
    }
}

/// Build the notifier for an optional webhook.
pub fn create_notifier(webhook_url: Option<&str>) -> Result<Box<dyn Notifier>> {
    let notifier: Box<dyn Notifier> = match webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(url.to_string())?),
        None => Box::new(LogNotifier),
    };
    Ok(notifier)
}

/// Send a message, logging instead of returning any failure.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        tracing::warn!("Notification dropped: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_posts_text_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"text": "hello"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", mock_server.uri())).unwrap();
        tokio_test::assert_ok!(notifier.notify("hello").await);
    }

    #[tokio::test]
    async fn test_webhook_non_ok_status() {
        let mock_server = MockServer::start().await;

        // 204 is a success class but still not what the webhook promises.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let notifier = WebhookNotifier::new(mock_server.uri()).unwrap();
        let result = notifier.notify("hello").await;

        assert!(matches!(result, Err(DdnsError::Notify(_))));
    }

    #[tokio::test]
    async fn test_webhook_unreachable() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/hook".to_string()).unwrap();
        let result = notifier.notify("hello").await;

        assert!(matches!(result, Err(DdnsError::Network(_))));
    }

    #[tokio::test]
    async fn test_webhook_gives_up_on_slow_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(60)))
            .mount(&mock_server)
            .await;

        let notifier =
            WebhookNotifier::with_timeout(mock_server.uri(), Duration::from_millis(200)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), notifier.notify("hello")).await;

        assert!(matches!(result, Ok(Err(DdnsError::Network(_)))));
    }

    #[test]
    fn test_create_notifier_without_webhook() {
        tokio_test::assert_ok!(create_notifier(None));
        tokio_test::assert_ok!(create_notifier(Some("https://chat.example.com/hook")));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        tokio_test::assert_ok!(LogNotifier.notify("anything").await);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .times(1)
            .returning(|_| Err(DdnsError::Notify("500".to_string())));

        notify_best_effort(&mock, "boom").await;
    }
}
