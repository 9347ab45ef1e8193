//! Lifecycle orchestration: create, restore, reconnect, destroy.
//!
//! The manager is the only writer of both the in-memory registry and the
//! durable mirror. Each instance gets one event-loop task that applies the
//! state machine; disconnects schedule a single delayed reconnect that
//! swaps in a fresh session bound to the same name, generation-checked so a
//! concurrent destroy always wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use zg_domain::error::{Error, Result};

use crate::adapter::{AdapterEvent, AdapterFactory, InboundSink};
use crate::registry::{AdmissionController, InsertDenied, SessionRegistry};
use crate::session::{Session, SessionState};
use crate::store::InstanceStore;

/// Buffered lifecycle events per instance. The adapter delivers serially,
/// so this only needs to absorb short bursts.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of a create call. Re-creating a registered name is benign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

pub struct LifecycleManager {
    registry: Arc<SessionRegistry>,
    store: Arc<InstanceStore>,
    admission: AdmissionController,
    factory: Arc<dyn AdapterFactory>,
    sink: Arc<dyn InboundSink>,
    reconnect_delay: Duration,
    generations: AtomicU64,
}

impl LifecycleManager {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<InstanceStore>,
        admission: AdmissionController,
        factory: Arc<dyn AdapterFactory>,
        sink: Arc<dyn InboundSink>,
        reconnect_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            store,
            admission,
            factory,
            sink,
            reconnect_delay,
            generations: AtomicU64::new(1),
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    // ── Create ───────────────────────────────────────────────────────

    /// Register a new instance and begin adapter initialization.
    ///
    /// Admission and the duplicate check are one atomic decision; the
    /// durable record is only ensured once initialization succeeds, so a
    /// name that never came up is not resurrected on restart.
    pub async fn create_session(self: &Arc<Self>, name: &str) -> Result<CreateOutcome> {
        let (session, events) = match self.register(name)? {
            Some(pair) => pair,
            None => {
                tracing::debug!(instance = %name, "create requested for existing instance");
                return Ok(CreateOutcome::AlreadyExists);
            }
        };

        tokio::spawn(run_session_events(self.clone(), session.clone(), events));
        tracing::info!(instance = %name, generation = session.generation(), "creating instance");

        if let Err(e) = session.adapter().initialize().await {
            session.mark_destroyed();
            self.registry.remove_if(name, session.generation());
            tracing::error!(instance = %name, error = %e, "adapter initialization failed");
            return Err(Error::AdapterInit(e.to_string()));
        }

        self.store.ensure(name);
        Ok(CreateOutcome::Created)
    }

    /// Admit, construct, and register under the registry lock. `None`
    /// means the name is already registered.
    fn register(
        &self,
        name: &str,
    ) -> Result<Option<(Arc<Session>, mpsc::Receiver<AdapterEvent>)>> {
        let generation = self.next_generation();
        let mut receiver = None;
        match self.registry.try_insert(name, &self.admission, || {
            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let adapter = self.factory.create(name, tx);
            receiver = Some(rx);
            Arc::new(Session::new(name, generation, adapter))
        }) {
            Ok(session) => {
                let rx = receiver.expect("receiver set when a session was constructed");
                Ok(Some((session, rx)))
            }
            Err(InsertDenied::AlreadyExists) => Ok(None),
            Err(InsertDenied::CapacityExceeded { max }) => Err(Error::CapacityExceeded { max }),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    // ── Restore ──────────────────────────────────────────────────────

    /// Recreate every instance the durable mirror says should exist.
    /// One instance failing to initialize does not stop the others.
    /// Returns `(restored, failed)`.
    pub async fn restore_all(self: &Arc<Self>) -> (usize, usize) {
        let records = self.store.list();
        tracing::info!(count = records.len(), "restoring persisted instances");

        let mut restored = 0;
        let mut failed = 0;
        for record in records {
            match self.create_session(&record.name).await {
                Ok(_) => restored += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!(instance = %record.name, error = %e, "restore failed");
                }
            }
        }
        (restored, failed)
    }

    // ── Destroy ──────────────────────────────────────────────────────

    /// Tear an instance down: claim it, release the adapter (best-effort),
    /// drop the durable record. Safe against an in-flight reconnect — the
    /// claim removes the entry the reconnect would need to swap.
    pub async fn destroy_session(&self, name: &str) -> Result<()> {
        let session = self
            .registry
            .remove_claim(name)
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        session.mark_destroyed();

        if let Err(e) = session.adapter().destroy().await {
            tracing::warn!(instance = %name, error = %e, "adapter teardown failed (ignored)");
        }

        self.store.remove(name);
        tracing::info!(instance = %name, "instance destroyed");
        Ok(())
    }

    // ── Projections for the HTTP facade ──────────────────────────────

    /// `Some(ready)` for a registered instance, `None` otherwise.
    pub fn status(&self, name: &str) -> Option<bool> {
        self.registry.get(name).map(|s| s.is_ready())
    }

    /// `None`: unknown name. `Some(None)`: registered, no pending
    /// challenge. `Some(Some(qr))`: challenge awaiting a scan.
    pub fn qr_challenge(&self, name: &str) -> Option<Option<String>> {
        self.registry.get(name).map(|s| s.qr_challenge())
    }

    pub fn instance_names(&self) -> Vec<String> {
        self.registry.names()
    }

    // ── Reconnect ────────────────────────────────────────────────────

    fn schedule_reconnect(self: &Arc<Self>, name: String, generation: u64) {
        let manager = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(manager.reconnect_delay).await;
            manager.reconnect(&name, generation).await;
        });
    }

    /// Swap in a fresh session for `name` and re-initialize it. A no-op if
    /// the disconnected session was destroyed, replaced, or recovered on
    /// its own during the delay.
    async fn reconnect(self: &Arc<Self>, name: &str, expected_generation: u64) {
        let generation = self.next_generation();
        let mut receiver = None;
        let session = match self.registry.replace_if(name, expected_generation, || {
            let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
            let adapter = self.factory.create(name, tx);
            receiver = Some(rx);
            Arc::new(Session::new(name, generation, adapter))
        }) {
            Some(session) => session,
            None => {
                tracing::debug!(instance = %name, "reconnect skipped — instance gone or recovered");
                return;
            }
        };

        let rx = receiver.expect("receiver set when a session was constructed");
        tokio::spawn(run_session_events(self.clone(), session.clone(), rx));
        tracing::info!(instance = %name, generation, "reconnecting");

        // Initialization may keep failing while the platform is unreachable.
        // Retry on the same fresh session until it sticks or the instance
        // goes away; a single task per disconnect keeps attempts serial.
        loop {
            match session.adapter().initialize().await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(instance = %name, error = %e, "reconnect initialization failed, will retry");
                }
            }
            tokio::time::sleep(self.reconnect_delay).await;
            let still_current = self
                .registry
                .get(name)
                .is_some_and(|current| current.generation() == session.generation());
            if !still_current || session.state() == SessionState::Destroyed {
                tracing::debug!(instance = %name, "abandoning reconnect retries");
                return;
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Per-instance event loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive one session's state machine from its adapter events. Within one
/// instance, transitions are strictly ordered by this single consumer.
async fn run_session_events(
    manager: Arc<LifecycleManager>,
    session: Arc<Session>,
    mut events: mpsc::Receiver<AdapterEvent>,
) {
    let name = session.name().to_owned();

    while let Some(event) = events.recv().await {
        match event {
            AdapterEvent::QrIssued { qr } => {
                if session.note_qr(qr) {
                    tracing::info!(instance = %name, "qr challenge issued");
                }
            }
            AdapterEvent::Ready => {
                if session.note_ready() {
                    manager.store.set_connected(&name, true);
                    tracing::info!(instance = %name, "instance connected");
                }
            }
            AdapterEvent::Disconnected { reason } => {
                if session.note_disconnected() {
                    manager.store.set_connected(&name, false);
                    tracing::warn!(
                        instance = %name,
                        reason = %reason,
                        delay_secs = manager.reconnect_delay.as_secs(),
                        "instance disconnected — reconnect scheduled"
                    );
                    manager.schedule_reconnect(name.clone(), session.generation());
                }
            }
            AdapterEvent::Message(message) => {
                manager.sink.forward(&name, message);
            }
        }

        if session.state() == SessionState::Destroyed {
            break;
        }
    }

    tracing::debug!(instance = %name, "event loop ended");
}
