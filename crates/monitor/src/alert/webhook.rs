//! HTTP webhook alert sink (Slack/Telegram relays, generic receivers).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::info;

use crate::constants::WEBHOOK_TIMEOUT_SECONDS;
use crate::errors::{DeliveryError, MonitorError};
use crate::types::Alert;

use super::AlertSink;

/// POSTs alerts as JSON to a single configured URL.
///
/// One request per call, bounded by the client timeout. 2xx and 3xx count as
/// delivered; redirects are not followed.
pub struct WebhookAlerter {
    webhook_url: String,
    client: Client,
}

impl WebhookAlerter {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self, MonitorError> {
        Self::with_timeout(webhook_url, Duration::from_secs(WEBHOOK_TIMEOUT_SECONDS))
    }

    pub fn with_timeout(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.webhook_url
    }
}

#[async_trait]
impl AlertSink for WebhookAlerter {
    async fn deliver(&self, alert: &Alert) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(alert)?;

        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(level = alert.level.as_str(), title = %alert.title, "alert sent");
        Ok(())
    }
}
