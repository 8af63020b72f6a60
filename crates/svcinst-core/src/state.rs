//! Pre-change state capture.
//!
//! Installers record what a resource looked like right before they touch it,
//! keyed by `(component, key)`. Uninstall reads those records back to decide
//! which reversals to perform. A key that was never recorded restores as
//! `None`, which is not the same as a recorded `false`.

use crate::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// StateValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl StateValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StateValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StateValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{b}"),
            StateValue::Int(i) => write!(f, "{i}"),
            StateValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for StateValue {
    fn from(v: bool) -> Self {
        StateValue::Bool(v)
    }
}

impl From<i64> for StateValue {
    fn from(v: i64) -> Self {
        StateValue::Int(v)
    }
}

impl From<&str> for StateValue {
    fn from(v: &str) -> Self {
        StateValue::Text(v.to_string())
    }
}

impl From<String> for StateValue {
    fn from(v: String) -> Self {
        StateValue::Text(v)
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Durable `(component, key) -> value` records.
///
/// Methods take `&self` so a single store can be shared by every step of an
/// install run; implementations handle their own interior mutability.
pub trait StateStore {
    /// True if any key has been recorded for `component`.
    fn has_state(&self, component: &str) -> Result<bool>;

    /// Record `value`, replacing any earlier record for the same key.
    fn backup_state(&self, component: &str, key: &str, value: StateValue) -> Result<()>;

    /// Last recorded value, or `None` if the key was never backed up.
    /// Never removes the record.
    fn restore_state(&self, component: &str, key: &str) -> Result<Option<StateValue>>;

    /// Remove one record. Removing an absent key is not an error.
    fn clear_state(&self, component: &str, key: &str) -> Result<()>;

    /// All records for `component`, sorted by key.
    fn keys(&self, component: &str) -> Result<Vec<(String, StateValue)>>;
}

/// In-process store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<BTreeMap<(String, String), StateValue>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), StateValue>> {
        // A panicked writer cannot leave a half-written BTreeMap entry behind.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStateStore {
    fn has_state(&self, component: &str) -> Result<bool> {
        Ok(self.lock().keys().any(|(c, _)| c == component))
    }

    fn backup_state(&self, component: &str, key: &str, value: StateValue) -> Result<()> {
        self.lock()
            .insert((component.to_string(), key.to_string()), value);
        Ok(())
    }

    fn restore_state(&self, component: &str, key: &str) -> Result<Option<StateValue>> {
        Ok(self
            .lock()
            .get(&(component.to_string(), key.to_string()))
            .cloned())
    }

    fn clear_state(&self, component: &str, key: &str) -> Result<()> {
        self.lock()
            .remove(&(component.to_string(), key.to_string()));
        Ok(())
    }

    fn keys(&self, component: &str) -> Result<Vec<(String, StateValue)>> {
        Ok(self
            .lock()
            .iter()
            .filter(|((c, _), _)| c == component)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// ServiceState
// ---------------------------------------------------------------------------

/// A State Store scoped to one service namespace.
///
/// `Copy`, so step closures can each capture their own handle.
#[derive(Clone, Copy)]
pub struct ServiceState<'a> {
    component: &'a str,
    store: &'a dyn StateStore,
}

impl<'a> ServiceState<'a> {
    pub fn new(component: &'a str, store: &'a dyn StateStore) -> Self {
        Self { component, store }
    }

    pub fn component(&self) -> &'a str {
        self.component
    }

    pub fn backup(&self, key: &str, value: impl Into<StateValue>) -> Result<()> {
        let value = value.into();
        tracing::debug!(component = %self.component, key, value = %value, "backing up state");
        self.store.backup_state(self.component, key, value)
    }

    pub fn restore(&self, key: &str) -> Result<Option<StateValue>> {
        self.store.restore_state(self.component, key)
    }

    /// Like [`restore`](Self::restore) but insists on a boolean record.
    pub fn restore_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.restore(key)? {
            None => Ok(None),
            Some(StateValue::Bool(b)) => Ok(Some(b)),
            Some(_) => Err(InstallError::StateType {
                component: self.component.to_string(),
                key: key.to_string(),
                expected: "boolean",
            }),
        }
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.store.clear_state(self.component, key)
    }

    /// True once any state has been captured for this service.
    pub fn is_configured(&self) -> Result<bool> {
        self.store.has_state(self.component)
    }
}

impl fmt::Debug for ServiceState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceState")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
