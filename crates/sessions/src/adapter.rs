//! Collaborator boundaries: the protocol-automation client behind each
//! instance, and the sink that receives inbound messages.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use zg_domain::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle and message events emitted by one instance's adapter.
///
/// Events for a single instance are delivered serially over its channel;
/// there is no ordering guarantee across instances.
#[derive(Debug)]
pub enum AdapterEvent {
    /// A QR challenge was issued; a human must scan it to authorize the
    /// instance.
    QrIssued { qr: String },
    /// The underlying client is authenticated and ready to send.
    Ready,
    /// The underlying client lost its connection.
    Disconnected { reason: String },
    /// An inbound message arrived on this instance.
    Message(InboundMessage),
}

/// One inbound message as reported by the adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Sender address in platform form (e.g. `5561991763642@c.us`).
    pub from: String,
    /// Literal text body, if the message carried any.
    pub body: Option<String>,
    pub has_media: bool,
    /// Platform timestamp (unix seconds).
    pub timestamp: i64,
}

/// Media payload for an outbound send.
#[derive(Debug, Clone)]
pub struct OutboundMedia {
    pub mime_type: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SessionAdapter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One protocol session as seen by the lifecycle manager.
///
/// All calls may suspend for unbounded durations (network and browser
/// startup latency); callers must not hold any lock across them.
#[async_trait]
pub trait SessionAdapter: Send + Sync {
    /// Begin connecting. Lifecycle progress is reported through the event
    /// channel handed to the factory, not the return value.
    async fn initialize(&self) -> Result<()>;

    /// Release the underlying client resources.
    async fn destroy(&self) -> Result<()>;

    async fn send_text(&self, recipient: &str, body: &str) -> Result<()>;

    async fn send_media(&self, recipient: &str, media: &OutboundMedia) -> Result<()>;

    /// Resolve a canonical address against the platform's directory.
    /// `None` means the address is not registered.
    async fn resolve_recipient(&self, address: &str) -> Result<Option<String>>;
}

/// Builds one adapter per instance, wiring it to the instance's event
/// channel.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, name: &str, events: mpsc::Sender<AdapterEvent>) -> Arc<dyn SessionAdapter>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// InboundSink
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives inbound messages from instance event loops.
///
/// Implementations must be fire-and-forget: delivery failure is theirs to
/// log and swallow, and `forward` must never block event processing.
pub trait InboundSink: Send + Sync {
    fn forward(&self, instance: &str, message: InboundMessage);
}
