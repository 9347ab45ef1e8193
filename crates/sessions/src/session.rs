//! One instance: its adapter, its lifecycle state, and the pending QR
//! challenge.
//!
//! Transitions are applied by the per-instance event loop; each method
//! returns whether the state actually changed so repeated `ready` or
//! `disconnected` signals degrade to no-ops.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::adapter::SessionAdapter;

/// Lifecycle state of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Adapter initialization in progress.
    Creating,
    /// A QR challenge is pending a human scan.
    AwaitingScan,
    /// Authenticated and able to send.
    Connected,
    /// Connection lost; a reconnect is scheduled.
    Disconnected,
    /// Terminal. The instance has been removed.
    Destroyed,
}

struct Inner {
    state: SessionState,
    /// Pending QR payload. Non-empty iff `state == AwaitingScan`.
    qr: Option<String>,
}

/// One registered instance. The adapter is owned exclusively by this
/// session; other components only borrow it for the duration of a call.
pub struct Session {
    name: String,
    /// Monotonic tag distinguishing successive sessions bound to the same
    /// name. Stale reconnect tasks compare generations before acting.
    generation: u64,
    adapter: Arc<dyn SessionAdapter>,
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(name: &str, generation: u64, adapter: Arc<dyn SessionAdapter>) -> Self {
        Self {
            name: name.to_owned(),
            generation,
            adapter,
            inner: RwLock::new(Inner {
                state: SessionState::Creating,
                qr: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn adapter(&self) -> Arc<dyn SessionAdapter> {
        self.adapter.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().state == SessionState::Connected
    }

    pub fn qr_challenge(&self) -> Option<String> {
        self.inner.read().qr.clone()
    }

    /// QR challenge issued: `Creating → AwaitingScan`. A fresh challenge
    /// while already awaiting a scan replaces the stored payload.
    pub fn note_qr(&self, qr: String) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            SessionState::Creating | SessionState::AwaitingScan => {
                inner.state = SessionState::AwaitingScan;
                inner.qr = Some(qr);
                true
            }
            _ => false,
        }
    }

    /// Adapter signalled ready: `Creating | AwaitingScan | Disconnected →
    /// Connected`. Clears the challenge.
    pub fn note_ready(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            SessionState::Creating | SessionState::AwaitingScan | SessionState::Disconnected => {
                inner.state = SessionState::Connected;
                inner.qr = None;
                true
            }
            _ => false,
        }
    }

    /// Adapter signalled disconnect: `Connected | AwaitingScan →
    /// Disconnected`. Clears the challenge.
    pub fn note_disconnected(&self) -> bool {
        let mut inner = self.inner.write();
        match inner.state {
            SessionState::Connected | SessionState::AwaitingScan => {
                inner.state = SessionState::Disconnected;
                inner.qr = None;
                true
            }
            _ => false,
        }
    }

    /// Explicit destroy: any non-terminal state → `Destroyed`.
    pub fn mark_destroyed(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.state == SessionState::Destroyed {
            return false;
        }
        inner.state = SessionState::Destroyed;
        inner.qr = None;
        true
    }
}
