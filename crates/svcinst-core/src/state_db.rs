//! Durable State Store backed by redb.
//!
//! # Table design
//!
//! A single `STATE` table keyed by `component \0 key`:
//! ```text
//! [ component utf-8 | 0x00 | key utf-8 ]
//! ```
//!
//! All keys of one component are contiguous, so `has_state` and `keys` are a
//! single range scan over `component\0 .. component\x01`. Values are
//! JSON-encoded `StateRecord`s.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{InstallError, Result};
use crate::state::{StateStore, StateValue};

const STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("state");

fn record_key(component: &str, key: &str) -> String {
    format!("{component}\0{key}")
}

/// Half-open bounds covering every key of `component`.
fn component_bounds(component: &str) -> (String, String) {
    (format!("{component}\0"), format!("{component}\u{1}"))
}

fn db_err(e: impl std::fmt::Display) -> InstallError {
    InstallError::StateDb(e.to_string())
}

/// A stored value plus the moment it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub value: StateValue,
    pub captured_at: DateTime<Utc>,
}

pub struct StateDb {
    db: Database,
}

impl StateDb {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path).map_err(db_err)?;
        // Ensure the table exists before any reads
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(STATE).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    /// Every record for `component`, sorted by key.
    pub fn records(&self, component: &str) -> Result<Vec<(String, StateRecord)>> {
        let (lower, upper) = component_bounds(component);
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(STATE).map_err(db_err)?;

        let prefix_len = lower.len();
        let mut result = Vec::new();
        for entry in table
            .range(lower.as_str()..upper.as_str())
            .map_err(db_err)?
        {
            let (k, v) = entry.map_err(db_err)?;
            let record: StateRecord = serde_json::from_slice(v.value())?;
            result.push((k.value()[prefix_len..].to_string(), record));
        }
        Ok(result)
    }

    pub fn record(&self, component: &str, key: &str) -> Result<Option<StateRecord>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(STATE).map_err(db_err)?;
        let found = table
            .get(record_key(component, key).as_str())
            .map_err(db_err)?;
        let record = match found {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        Ok(record)
    }
}

impl StateStore for StateDb {
    fn has_state(&self, component: &str) -> Result<bool> {
        let (lower, upper) = component_bounds(component);
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(STATE).map_err(db_err)?;
        let mut range = table
            .range(lower.as_str()..upper.as_str())
            .map_err(db_err)?;
        let found = range.next().is_some();
        Ok(found)
    }

    fn backup_state(&self, component: &str, key: &str, value: StateValue) -> Result<()> {
        let record = StateRecord {
            value,
            captured_at: Utc::now(),
        };
        let data = serde_json::to_vec(&record)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(STATE).map_err(db_err)?;
            table
                .insert(record_key(component, key).as_str(), data.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn restore_state(&self, component: &str, key: &str) -> Result<Option<StateValue>> {
        Ok(self.record(component, key)?.map(|r| r.value))
    }

    fn clear_state(&self, component: &str, key: &str) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(STATE).map_err(db_err)?;
            table
                .remove(record_key(component, key).as_str())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    fn keys(&self, component: &str) -> Result<Vec<(String, StateValue)>> {
        Ok(self
            .records(component)?
            .into_iter()
            .map(|(k, r)| (k, r.value))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
