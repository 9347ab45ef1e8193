//! Bridge adapter — drives the protocol-automation sidecar over HTTP.
//!
//! The sidecar owns the actual platform client (browser emulation, QR
//! issuance, message transport); this adapter starts/stops per-instance
//! clients, relays sends, and pumps the sidecar's long-poll event stream
//! into the instance's event channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use zg_domain::config::BridgeConfig;
use zg_domain::error::{Error, Result};
use zg_sessions::{AdapterEvent, AdapterFactory, InboundMessage, OutboundMedia, SessionAdapter};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Qr {
        qr: String,
    },
    Ready,
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message {
        from: String,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        has_media: bool,
        #[serde(default)]
        timestamp: Option<i64>,
    },
}

impl From<WireEvent> for AdapterEvent {
    fn from(event: WireEvent) -> Self {
        match event {
            WireEvent::Qr { qr } => AdapterEvent::QrIssued { qr },
            WireEvent::Ready => AdapterEvent::Ready,
            WireEvent::Disconnected { reason } => AdapterEvent::Disconnected { reason },
            WireEvent::Message {
                from,
                body,
                has_media,
                timestamp,
            } => AdapterEvent::Message(InboundMessage {
                from,
                body,
                has_media,
                timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp()),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Factory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BridgeFactory {
    client: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl BridgeFactory {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Long-poll requests must outlive the poll window.
            .timeout(Duration::from_secs(
                config.request_timeout_secs.max(config.poll_timeout_secs + 5),
            ))
            .build()
            .map_err(|e| Error::Http(format!("building bridge client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }
}

impl AdapterFactory for BridgeFactory {
    fn create(&self, name: &str, events: mpsc::Sender<AdapterEvent>) -> Arc<dyn SessionAdapter> {
        Arc::new(BridgeAdapter {
            inner: Arc::new(BridgeInner {
                client: self.client.clone(),
                base_url: self.base_url.clone(),
                name: name.to_owned(),
                poll_timeout_secs: self.poll_timeout_secs,
                events,
                stopped: AtomicBool::new(false),
                pump_started: AtomicBool::new(false),
            }),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BridgeAdapter {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    client: reqwest::Client,
    base_url: String,
    name: String,
    poll_timeout_secs: u64,
    events: mpsc::Sender<AdapterEvent>,
    /// Raised by `destroy`; the event pump observes it and exits.
    stopped: AtomicBool,
    pump_started: AtomicBool,
}

impl BridgeInner {
    fn url(&self, tail: &str) -> String {
        format!("{}/clients/{}/{tail}", self.base_url, self.name)
    }

    async fn post_json(&self, tail: &str, body: serde_json::Value) -> Result<()> {
        let url = self.url(tail);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!("{url}: {}", resp.status())));
        }
        Ok(())
    }

    /// One long-poll pass; pushed events go straight into the session
    /// channel. Returns `false` once the channel is gone.
    async fn poll_once(&self) -> bool {
        let url = self.url("events");
        let result = self
            .client
            .get(&url)
            .query(&[("wait", self.poll_timeout_secs)])
            .send()
            .await;

        let events = match result {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<Vec<WireEvent>>().await {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(instance = %self.name, error = %e, "bad bridge event payload");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        return true;
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(instance = %self.name, status = %resp.status(), "bridge event poll rejected");
                tokio::time::sleep(Duration::from_secs(1)).await;
                return true;
            }
            Err(e) => {
                tracing::warn!(instance = %self.name, error = %e, "bridge event poll failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                return true;
            }
        };

        for event in events {
            if self.events.send(event.into()).await.is_err() {
                return false;
            }
        }
        true
    }
}

async fn run_event_pump(inner: Arc<BridgeInner>) {
    tracing::debug!(instance = %inner.name, "bridge event pump started");
    while !inner.stopped.load(Ordering::Acquire) {
        if !inner.poll_once().await {
            break;
        }
    }
    tracing::debug!(instance = %inner.name, "bridge event pump stopped");
}

#[async_trait]
impl SessionAdapter for BridgeAdapter {
    async fn initialize(&self) -> Result<()> {
        self.inner.post_json("start", json!({})).await?;
        // First successful start spins up the pump; re-initialization after
        // a failure reuses the running one.
        if !self.inner.pump_started.swap(true, Ordering::SeqCst) {
            tokio::spawn(run_event_pump(self.inner.clone()));
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.post_json("stop", json!({})).await
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
        self.inner
            .post_json("send", json!({ "to": recipient, "body": body }))
            .await
    }

    async fn send_media(&self, recipient: &str, media: &OutboundMedia) -> Result<()> {
        self.inner
            .post_json(
                "send-media",
                json!({
                    "to": recipient,
                    "mime_type": media.mime_type,
                    "filename": media.filename,
                    "data_base64": BASE64.encode(&media.data),
                }),
            )
            .await
    }

    async fn resolve_recipient(&self, address: &str) -> Result<Option<String>> {
        let url = self.inner.url("resolve");
        let resp = self
            .inner
            .client
            .get(&url)
            .query(&[("number", address)])
            .send()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!("{url}: {}", resp.status())));
        }
        let resolved: ResolveResponse = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("{url}: {e}")))?;
        Ok(resolved.id)
    }
}
