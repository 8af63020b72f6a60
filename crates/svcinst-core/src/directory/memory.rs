use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use super::{normalize_dn, DirectoryClient, DirectoryConnector, Entry, Modification, Scope};
use crate::error::{InstallError, Result};

/// Value of `ipaUniqueID` asking the server to assign a fresh identifier.
pub const AUTOGENERATE: &str = "autogenerate";

/// An in-process directory for tests and dry runs.
///
/// Entries are keyed by normalized DN. Adding an entry whose `ipaUniqueID` is
/// `autogenerate` stores a fresh UUID in its place, as the directory server's
/// uniqueness plugin would.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: Mutex<BTreeMap<String, Entry>>,
    credentials: Option<(String, String)>,
    offline: bool,
    hosts: Mutex<Vec<String>>,
    binds: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryDirectory {
    /// A directory that accepts any bind.
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory that only accepts `bind_dn` / `password`.
    pub fn with_credentials(bind_dn: &str, password: &str) -> Self {
        Self {
            credentials: Some((normalize_dn(bind_dn), password.to_string())),
            ..Self::default()
        }
    }

    /// A directory whose every connection attempt fails.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    /// Seed an entry without counting it as a mutation.
    pub fn insert(&self, entry: Entry) {
        self.lock().insert(normalize_dn(entry.dn()), entry);
    }

    pub fn entry(&self, dn: &str) -> Option<Entry> {
        self.lock().get(&normalize_dn(dn)).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hosts passed to `connect`, in order.
    pub fn connected_hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Successful binds so far.
    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::Relaxed)
    }

    /// Adds, deletes and modifies applied so far.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DirectoryConnector for MemoryDirectory {
    fn connect(&self, host: &str) -> Result<Box<dyn DirectoryClient + '_>> {
        self.hosts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(host.to_string());
        if self.offline {
            return Err(InstallError::Directory(format!(
                "can't contact LDAP server at {host}"
            )));
        }
        Ok(Box::new(MemoryConnection {
            dir: self,
            bound: false,
        }))
    }
}

struct MemoryConnection<'a> {
    dir: &'a MemoryDirectory,
    bound: bool,
}

impl MemoryConnection<'_> {
    fn require_bind(&self) -> Result<()> {
        if self.bound {
            Ok(())
        } else {
            Err(InstallError::Directory("operation requires a bind".into()))
        }
    }

    fn mutated(&self) {
        self.dir.mutations.fetch_add(1, Ordering::Relaxed);
    }
}

impl DirectoryClient for MemoryConnection<'_> {
    fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        if let Some((want_dn, want_pw)) = &self.dir.credentials {
            if normalize_dn(dn) != *want_dn || password != want_pw {
                return Err(InstallError::Directory("invalid credentials".into()));
            }
        }
        self.bound = true;
        self.dir.binds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn search(&mut self, base: &str, scope: Scope) -> Result<Vec<Entry>> {
        self.require_bind()?;
        let base = normalize_dn(base);
        let entries = self.dir.lock();
        if !entries.contains_key(&base) {
            return Err(InstallError::NotFound(base));
        }
        let suffix = format!(",{base}");
        let found = entries
            .iter()
            .filter(|(dn, _)| match scope {
                Scope::Base => **dn == base,
                Scope::OneLevel => dn
                    .strip_suffix(&suffix)
                    .is_some_and(|rdn| !rdn.contains(',')),
                Scope::Subtree => **dn == base || dn.ends_with(&suffix),
            })
            .map(|(_, e)| e.clone())
            .collect();
        Ok(found)
    }

    fn add(&mut self, entry: &Entry) -> Result<()> {
        self.require_bind()?;
        let key = normalize_dn(entry.dn());
        let mut entries = self.dir.lock();
        if entries.contains_key(&key) {
            return Err(InstallError::AlreadyExists(entry.dn().to_string()));
        }
        let mut stored = entry.clone();
        if stored
            .first("ipaUniqueID")
            .is_some_and(|v| v.eq_ignore_ascii_case(AUTOGENERATE))
        {
            stored.set_value("ipaUniqueID", Uuid::new_v4().to_string());
        }
        entries.insert(key, stored);
        drop(entries);
        self.mutated();
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> Result<()> {
        self.require_bind()?;
        if self.dir.lock().remove(&normalize_dn(dn)).is_none() {
            return Err(InstallError::NotFound(dn.to_string()));
        }
        self.mutated();
        Ok(())
    }

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()> {
        self.require_bind()?;
        {
            let mut entries = self.dir.lock();
            let entry = entries
                .get_mut(&normalize_dn(dn))
                .ok_or_else(|| InstallError::NotFound(dn.to_string()))?;
            for change in changes {
                entry.apply(change);
            }
        }
        self.mutated();
        Ok(())
    }

    fn unbind(&mut self) -> Result<()> {
        self.bound = false;
        Ok(())
    }
}
