//! Chat webhook channel
//!
//! POSTs the rendered message as JSON to a Discord-compatible webhook URL.

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{info, warn};

use super::channel::{NotificationChannel, SendResult};
use super::message::NotificationMessage;
use crate::error::NotifierError;

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Webhook channel configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Webhook URL (contains the token, never logged in full)
    pub url: String,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Webhook channel
pub struct WebhookChannel {
    client: Client,
    config: WebhookConfig,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(NotifierError::HttpClient)?;

        Ok(Self { client, config })
    }

    /// Host part of the webhook URL, safe for logs
    pub fn endpoint_host(&self) -> String {
        redact_url(&self.config.url)
    }

    /// Serialize and POST the message
    pub fn deliver(&self, message: &NotificationMessage) -> Result<u16, NotifierError> {
        let payload = message.to_payload()?;

        info!(
            channel = "webhook",
            host = %self.endpoint_host(),
            payload = %String::from_utf8_lossy(&payload),
            "Sending payload"
        );

        let response = self
            .client
            .post(&self.config.url)
            .json(message)
            .send()
            .map_err(NotifierError::Delivery)?;

        let status = response.status();
        if status.is_success() {
            info!(channel = "webhook", status = status.as_u16(), "Webhook delivered");
        } else {
            // The endpoint answered; a rejected payload is not retried.
            warn!(channel = "webhook", status = status.as_u16(), "Webhook returned non-success status");
        }

        Ok(status.as_u16())
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send(&self, message: &NotificationMessage) -> Result<SendResult, NotifierError> {
        let status = self.deliver(message)?;
        Ok(SendResult::Sent { status })
    }
}

/// Reduce a URL to `scheme://host[:port]`
fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            _ => "<invalid url>".to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}
