//! Inbound forwarding — fire-and-forget webhook delivery to the
//! application backend.
//!
//! Spawns one task per inbound message, makes a single POST attempt, and
//! logs the outcome. Delivery failure never reaches the session or blocks
//! later events; the contract is at-most-once, best-effort.

use std::time::Duration;

use serde_json::json;

use zg_domain::config::WebhookConfig;
use zg_domain::error::{Error, Result};
use zg_sessions::number::strip_address_suffix;
use zg_sessions::{InboundMessage, InboundSink};

/// Body used when the message carries only non-text media. Part of the
/// downstream backend's wire contract.
pub const MEDIA_PLACEHOLDER: &str = "[Mensagem com mídia]";
/// Body used when the message is entirely empty.
pub const EMPTY_PLACEHOLDER: &str = "[Mensagem vazia]";

pub struct WebhookForwarder {
    client: reqwest::Client,
    url: String,
}

impl WebhookForwarder {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("building webhook client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// Build the webhook body for one inbound message.
    pub fn payload(instance: &str, message: &InboundMessage) -> serde_json::Value {
        let body = match message.body.as_deref().filter(|b| !b.is_empty()) {
            Some(text) => text.to_owned(),
            None if message.has_media => MEDIA_PLACEHOLDER.to_owned(),
            None => EMPTY_PLACEHOLDER.to_owned(),
        };
        let timestamp = if message.timestamp > 0 {
            message.timestamp
        } else {
            chrono::Utc::now().timestamp()
        };

        json!({
            "sessionName": instance,
            "fromNumber": strip_address_suffix(&message.from),
            "body": body,
            "timestamp": timestamp,
        })
    }
}

impl InboundSink for WebhookForwarder {
    fn forward(&self, instance: &str, message: InboundMessage) {
        if self.url.is_empty() {
            tracing::debug!(instance = %instance, "webhook disabled, dropping inbound message");
            return;
        }

        let payload = Self::payload(instance, &message);
        let client = self.client.clone();
        let url = self.url.clone();
        let instance = instance.to_owned();

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(instance = %instance, status = %resp.status(), "inbound message forwarded");
                }
                Ok(resp) => {
                    tracing::warn!(
                        instance = %instance,
                        status = %resp.status(),
                        "webhook returned non-success status"
                    );
                }
                Err(e) => {
                    tracing::warn!(instance = %instance, error = %e, "webhook delivery failed");
                }
            }
        });
    }
}
