//! The authoritative name → session map, plus the admission cap.
//!
//! Every structural mutation (create, reconnect swap, destroy claim) happens
//! under the registry's single write lock, which is what makes concurrent
//! creations for the same name, capacity checks, and destroy-vs-reconnect
//! races resolve deterministically.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::{Session, SessionState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admission controller
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Enforces the cap on concurrently registered instances.
///
/// Only consulted inside [`SessionRegistry::try_insert`]'s write lock, so
/// the existence check and the capacity check are one atomic decision.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    max_free: usize,
}

impl AdmissionController {
    pub fn new(max_free: usize) -> Self {
        Self { max_free }
    }

    pub fn max(&self) -> usize {
        self.max_free
    }

    /// True iff another instance may be admitted given `active` currently
    /// registered ones.
    pub fn admits(&self, active: usize) -> bool {
        active < self.max_free
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why an insert was denied.
#[derive(Debug, PartialEq, Eq)]
pub enum InsertDenied {
    AlreadyExists,
    CapacityExceeded { max: usize },
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(name).cloned()
    }

    /// Registered instance names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Atomically admit and register a new instance.
    ///
    /// `make` runs under the write lock and only after both checks pass, so
    /// a losing concurrent caller never constructs a duplicate adapter.
    pub fn try_insert(
        &self,
        name: &str,
        admission: &AdmissionController,
        make: impl FnOnce() -> Arc<Session>,
    ) -> Result<Arc<Session>, InsertDenied> {
        let mut sessions = self.sessions.write();
        if sessions.contains_key(name) {
            return Err(InsertDenied::AlreadyExists);
        }
        if !admission.admits(sessions.len()) {
            return Err(InsertDenied::CapacityExceeded {
                max: admission.max(),
            });
        }
        let session = make();
        sessions.insert(name.to_owned(), session.clone());
        Ok(session)
    }

    /// Swap in a fresh session for `name`, but only if the current entry
    /// still carries `expected_generation` and is sitting in `Disconnected`.
    /// Used by reconnect tasks: a destroyed, replaced, or self-recovered
    /// instance makes the swap a no-op.
    pub fn replace_if(
        &self,
        name: &str,
        expected_generation: u64,
        make: impl FnOnce() -> Arc<Session>,
    ) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write();
        let current = sessions.get(name)?;
        if current.generation() != expected_generation
            || current.state() != SessionState::Disconnected
        {
            return None;
        }
        let session = make();
        sessions.insert(name.to_owned(), session.clone());
        Some(session)
    }

    /// Atomically take the entry for `name`, claiming exclusive ownership of
    /// the teardown path.
    pub fn remove_claim(&self, name: &str) -> Option<Arc<Session>> {
        self.sessions.write().remove(name)
    }

    /// Remove the entry only if it still carries `expected_generation`.
    /// Used to roll back a registration whose initialization failed.
    pub fn remove_if(&self, name: &str, expected_generation: u64) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write();
        if sessions.get(name)?.generation() != expected_generation {
            return None;
        }
        sessions.remove(name)
    }
}
