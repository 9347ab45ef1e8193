//! Durable mirror of the instance registry.
//!
//! Persists one record per instance in `instances.json` under the
//! configured state path. The mirror is the source of truth for which
//! instances should exist after a process restart; the lifecycle manager is
//! its only writer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use zg_domain::error::{Error, Result};

/// A single persisted instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub name: String,
    /// Last-known readiness. Informational only; restore always begins a
    /// fresh initialization.
    pub connected: bool,
}

/// JSON-file-backed instance store.
pub struct InstanceStore {
    path: PathBuf,
    records: RwLock<HashMap<String, InstanceRecord>>,
}

impl InstanceStore {
    /// Load or create the store at `state_path/instances.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path).map_err(Error::Io)?;

        let path = state_path.join("instances.json");
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "corrupt instance store, starting empty");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        tracing::info!(
            instances = records.len(),
            path = %path.display(),
            "instance store loaded"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn get(&self, name: &str) -> Option<InstanceRecord> {
        self.records.read().get(name).cloned()
    }

    /// All persisted records, in no particular order.
    pub fn list(&self) -> Vec<InstanceRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Create the record for `name` with `connected = false` if absent.
    pub fn ensure(&self, name: &str) {
        let mut records = self.records.write();
        if records.contains_key(name) {
            return;
        }
        records.insert(
            name.to_owned(),
            InstanceRecord {
                name: name.to_owned(),
                connected: false,
            },
        );
        self.rewrite(&records);
    }

    /// Upsert the last-known readiness flag for `name`.
    pub fn set_connected(&self, name: &str, connected: bool) {
        let mut records = self.records.write();
        records
            .entry(name.to_owned())
            .or_insert_with(|| InstanceRecord {
                name: name.to_owned(),
                connected,
            })
            .connected = connected;
        self.rewrite(&records);
    }

    /// Drop the record for `name`. The instance will not be recreated on
    /// the next restart.
    pub fn remove(&self, name: &str) {
        let mut records = self.records.write();
        if records.remove(name).is_some() {
            self.rewrite(&records);
        }
    }

    /// Rewrite the whole file via tmp + rename. Failures are logged, not
    /// propagated: losing one durable write must not take the session down.
    fn rewrite(&self, records: &HashMap<String, InstanceRecord>) {
        let tmp = self.path.with_extension("json.tmp");
        let result = serde_json::to_string_pretty(records)
            .map_err(Error::Json)
            .and_then(|json| std::fs::write(&tmp, json).map_err(Error::Io))
            .and_then(|_| std::fs::rename(&tmp, &self.path).map_err(Error::Io));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            tracing::warn!(path = %self.path.display(), error = %e, "instance store write failed");
        }
    }
}
