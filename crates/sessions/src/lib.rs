//! Session lifecycle management for ZapGate.
//!
//! One messaging-platform session ("instance") per tenant name, multiplexed
//! behind a single process: an authoritative in-memory registry with a
//! durable JSON mirror, an admission cap on concurrent instances, automatic
//! reconnection after disconnects, restart-time reconciliation, and a
//! readiness-guarded message dispatch surface.
//!
//! The protocol automation itself lives behind the [`SessionAdapter`] trait;
//! inbound messages leave through the [`InboundSink`] trait.

pub mod adapter;
pub mod dispatch;
pub mod manager;
pub mod number;
pub mod registry;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use adapter::{
    AdapterEvent, AdapterFactory, InboundMessage, InboundSink, OutboundMedia, SessionAdapter,
};
pub use dispatch::{MessageDispatcher, OutboundMessage, SendOutcome, SendPart};
pub use manager::{CreateOutcome, LifecycleManager};
pub use number::format_number;
pub use registry::{AdmissionController, SessionRegistry};
pub use session::{Session, SessionState};
pub use store::{InstanceRecord, InstanceStore};
