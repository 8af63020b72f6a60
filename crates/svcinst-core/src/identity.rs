use serde::{Deserialize, Serialize};

/// Who is being installed, and where.
///
/// `name` doubles as the State Store namespace and the OS service-manager
/// target. The identity is fixed when an orchestrator is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    name: String,
    directory_name: Option<String>,
    fqdn: String,
    suffix: String,
    realm: Option<String>,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, fqdn: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory_name: None,
            fqdn: fqdn.into(),
            suffix: suffix.into(),
            realm: None,
        }
    }

    /// Identity for a host-local service with no directory context.
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(name, String::new(), String::new())
    }

    /// Register the service in the directory under `name` (e.g. `HTTP`)
    /// instead of enabling it in the local init system.
    pub fn with_directory_name(mut self, name: impl Into<String>) -> Self {
        self.directory_name = Some(name.into());
        self
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory_name(&self) -> Option<&str> {
        self.directory_name.as_deref()
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }
}
