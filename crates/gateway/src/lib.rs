//! ZapGate gateway: the HTTP facade over the session lifecycle core, the
//! bridge adapter that drives the protocol-automation sidecar, and the
//! webhook forwarder for inbound messages.

pub mod api;
pub mod bootstrap;
pub mod bridge;
pub mod cli;
pub mod qr;
pub mod state;
pub mod webhook;
