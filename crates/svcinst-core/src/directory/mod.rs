//! Directory access used by the installer.
//!
//! The wire protocol lives behind [`DirectoryClient`]; connections come from a
//! [`DirectoryConnector`]. Installer code talks to a [`DirectorySession`], which
//! binds once and unbinds on every exit path.

mod memory;

pub use memory::{MemoryDirectory, AUTOGENERATE};

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{InstallError, Result};

/// Bind DN of the directory administrator.
pub const DIRECTORY_MANAGER: &str = "cn=Directory Manager";

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A directory entry. Attribute names are case-insensitive and stored
/// lowercased; values keep their case and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: String,
    attrs: BTreeMap<String, Vec<String>>,
}

impl Entry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: impl Into<String>) {
        self.dn = dn.into();
    }

    pub fn values(&self, attr: &str) -> &[String] {
        self.attrs
            .get(&attr.to_ascii_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn first(&self, attr: &str) -> Option<&str> {
        self.values(attr).first().map(|s| s.as_str())
    }

    pub fn has(&self, attr: &str) -> bool {
        !self.values(attr).is_empty()
    }

    /// Replace every value of `attr`. An empty list removes the attribute.
    pub fn set_values<I, S>(&mut self, attr: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let key = attr.to_ascii_lowercase();
        if values.is_empty() {
            self.attrs.remove(&key);
        } else {
            self.attrs.insert(key, values);
        }
    }

    pub fn set_value(&mut self, attr: &str, value: impl Into<String>) {
        self.set_values(attr, [value.into()]);
    }

    pub fn add_values<I, S>(&mut self, attr: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = self.attrs.entry(attr.to_ascii_lowercase()).or_default();
        for v in values {
            let v = v.into();
            if !slot.contains(&v) {
                slot.push(v);
            }
        }
    }

    /// Remove the listed values, or the whole attribute when `values` is empty.
    pub fn remove_values(&mut self, attr: &str, values: &[String]) {
        let key = attr.to_ascii_lowercase();
        if values.is_empty() {
            self.attrs.remove(&key);
            return;
        }
        if let Some(slot) = self.attrs.get_mut(&key) {
            slot.retain(|v| !values.contains(v));
            if slot.is_empty() {
                self.attrs.remove(&key);
            }
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Apply one modification in place.
    pub fn apply(&mut self, change: &Modification) {
        match change {
            Modification::Add { attr, values } => self.add_values(attr, values.iter().cloned()),
            Modification::Replace { attr, values } => {
                self.set_values(attr, values.iter().cloned())
            }
            Modification::Delete { attr, values } => self.remove_values(attr, values),
        }
    }
}

impl fmt::Display for Entry {
    /// LDIF-style rendering, used in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dn: {}", self.dn)?;
        for (attr, values) in &self.attrs {
            for v in values {
                writeln!(f, "{attr}: {v}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    Add { attr: String, values: Vec<String> },
    Replace { attr: String, values: Vec<String> },
    /// An empty `values` deletes the whole attribute.
    Delete { attr: String, values: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

/// Canonical form used to compare DNs: lowercased, no padding around `,`/`=`.
pub fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| {
            rdn.split('=')
                .map(|p| p.trim())
                .collect::<Vec<_>>()
                .join("=")
        })
        .collect::<Vec<_>>()
        .join(",")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Client traits
// ---------------------------------------------------------------------------

pub trait DirectoryClient {
    fn bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Entries at or below `base`. A missing `base` is `InstallError::NotFound`.
    fn search(&mut self, base: &str, scope: Scope) -> Result<Vec<Entry>>;

    /// Fails with `InstallError::AlreadyExists` when the DN is taken.
    fn add(&mut self, entry: &Entry) -> Result<()>;

    fn delete(&mut self, dn: &str) -> Result<()>;
    fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()>;
    fn unbind(&mut self) -> Result<()>;
}

pub trait DirectoryConnector {
    fn connect(&self, host: &str) -> Result<Box<dyn DirectoryClient + '_>>;
}

#[derive(Clone)]
pub struct Credentials {
    pub bind_dn: String,
    pub password: String,
}

impl Credentials {
    pub fn new(bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            password: password.into(),
        }
    }

    pub fn directory_manager(password: impl Into<String>) -> Self {
        Self {
            bind_dn: DIRECTORY_MANAGER.to_string(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bind_dn", &self.bind_dn)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DirectorySession
// ---------------------------------------------------------------------------

/// An authenticated connection held for the length of one logical operation.
pub struct DirectorySession<'c> {
    client: Box<dyn DirectoryClient + 'c>,
    bound: bool,
}

impl<'c> DirectorySession<'c> {
    /// Connect to `host` and bind. `server_name` only labels the failure.
    pub fn open(
        connector: &'c dyn DirectoryConnector,
        host: &str,
        credentials: &Credentials,
        server_name: &str,
    ) -> Result<Self> {
        let label = if server_name.is_empty() { host } else { server_name };
        let connection_error = |e: InstallError| {
            tracing::error!(
                "Could not connect to the Directory Server on {label}: {e}"
            );
            InstallError::Connection {
                host: label.to_string(),
                reason: e.to_string(),
            }
        };

        let mut client = connector.connect(host).map_err(connection_error)?;
        if let Err(e) = client.bind(&credentials.bind_dn, &credentials.password) {
            return Err(connection_error(e));
        }
        Ok(Self {
            client,
            bound: true,
        })
    }

    /// The entry at `dn`, or `None` when it does not exist.
    pub fn get_entry(&mut self, dn: &str) -> Result<Option<Entry>> {
        match self.client.search(dn, Scope::Base) {
            Ok(mut entries) => Ok(entries.pop()),
            Err(InstallError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn search(&mut self, base: &str, scope: Scope) -> Result<Vec<Entry>> {
        self.client.search(base, scope)
    }

    pub fn add(&mut self, entry: &Entry) -> Result<()> {
        self.client.add(entry)
    }

    pub fn delete(&mut self, dn: &str) -> Result<()> {
        self.client.delete(dn)
    }

    pub fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()> {
        self.client.modify(dn, changes)
    }

    /// Unbind now and report the result. Dropping the session unbinds too,
    /// but swallows the error.
    pub fn close(mut self) -> Result<()> {
        self.bound = false;
        self.client.unbind()
    }
}

impl Drop for DirectorySession<'_> {
    fn drop(&mut self) {
        if self.bound {
            if let Err(e) = self.client.unbind() {
                tracing::debug!(error = %e, "unbind failed");
            }
        }
    }
}
