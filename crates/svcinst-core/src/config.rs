use crate::directory::{Credentials, DirectoryConnector, DIRECTORY_MANAGER};
use crate::error::{InstallError, Result};
use crate::identity::ServiceIdentity;
use crate::paths;
use crate::registry::DirectoryTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DirectoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_host")]
    pub host: String,
    #[serde(default = "default_bind_dn")]
    pub bind_dn: String,
}

fn default_directory_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_dn() -> String {
    DIRECTORY_MANAGER.to_string()
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: default_directory_host(),
            bind_dn: default_bind_dn(),
        }
    }
}

// ---------------------------------------------------------------------------
// HostConfig
// ---------------------------------------------------------------------------

/// How this host is known in the directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "paths::default_state_db")]
    pub state_db: PathBuf,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub host: HostConfig,
    /// Path to `service`; located on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_command: Option<PathBuf>,
    /// Path to `chkconfig`; located on `PATH` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chkconfig_command: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_db: paths::default_state_db(),
            directory: DirectoryConfig::default(),
            host: HostConfig::default(),
            service_command: None,
            chkconfig_command: None,
        }
    }
}

impl Config {
    /// Read the YAML config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Identity of `name` on this host. Hosts without an `fqdn` get a
    /// local-only identity.
    pub fn identity_for(&self, name: &str) -> Result<ServiceIdentity> {
        paths::validate_service_name(name)?;
        let Some(fqdn) = self.host.fqdn.as_deref() else {
            return Ok(ServiceIdentity::local(name));
        };
        let suffix = self.host.suffix.as_deref().ok_or_else(|| {
            InstallError::Config(format!("host.fqdn is set to {fqdn} but host.suffix is missing"))
        })?;
        let mut identity = ServiceIdentity::new(name, fqdn, suffix);
        if let Some(realm) = &self.host.realm {
            identity = identity.with_realm(realm.clone());
        }
        Ok(identity)
    }

    /// Bind identity for directory work: `directory.bind_dn` with `password`.
    pub fn credentials(&self, password: impl Into<String>) -> Credentials {
        Credentials::new(self.directory.bind_dn.clone(), password)
    }

    /// `directory.host` reached through `connector`.
    pub fn directory_target<'a>(
        &'a self,
        connector: &'a dyn DirectoryConnector,
    ) -> DirectoryTarget<'a> {
        DirectoryTarget {
            connector,
            host: &self.directory.host,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.state_db.is_relative() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "state_db '{}' is relative; state will depend on the working directory",
                    self.state_db.display()
                ),
            });
        }

        if self.directory.host.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "directory.host is empty".to_string(),
            });
        }

        if self.directory.bind_dn.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "directory.bind_dn is empty".to_string(),
            });
        }

        match (&self.host.fqdn, &self.host.suffix) {
            (Some(_), None) => warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "host.fqdn is set but host.suffix is missing".to_string(),
            }),
            (None, Some(_)) => warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "host.suffix is set but host.fqdn is missing; it will be ignored"
                    .to_string(),
            }),
            _ => {}
        }

        if let Some(fqdn) = &self.host.fqdn {
            if !fqdn.contains('.') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("host.fqdn '{fqdn}' is not fully qualified"),
                });
            }
        }

        for (key, cmd) in [
            ("service_command", &self.service_command),
            ("chkconfig_command", &self.chkconfig_command),
        ] {
            if let Some(cmd) = cmd {
                if !cmd.exists() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!("{key} '{}' does not exist", cmd.display()),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Entry, MemoryDirectory};
    use crate::registry::registration_dn;
    use crate::relocation::{canonical_dn, legacy_dn, Relocation};
    use crate::service::{DirectoryAccess, Service};
    use crate::state::MemoryStateStore;
    use crate::testing::RecordingManager;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(cfg.state_db, PathBuf::from(paths::DEFAULT_STATE_DB));
        assert_eq!(cfg.directory.host, "127.0.0.1");
        assert_eq!(cfg.directory.bind_dn, "cn=Directory Manager");
        assert!(cfg.host.fqdn.is_none());
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcinst.yaml");
        std::fs::write(
            &path,
            "host:\n  fqdn: ipa.example.com\n  suffix: dc=example,dc=com\ndirectory:\n  host: ldap.example.com\n",
        )
        .unwrap();

        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.directory.host, "ldap.example.com");
        assert_eq!(cfg.directory.bind_dn, "cn=Directory Manager");
        assert_eq!(cfg.host.fqdn.as_deref(), Some("ipa.example.com"));
        assert_eq!(cfg.state_db, PathBuf::from(paths::DEFAULT_STATE_DB));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcinst.yaml");
        std::fs::write(&path, "\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert!(cfg.service_command.is_none());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcinst.yaml");
        std::fs::write(&path, "directory: [unterminated").unwrap();
        assert!(matches!(Config::load(&path), Err(InstallError::Yaml(_))));
    }

    #[test]
    fn identity_follows_host_section() {
        let mut cfg = Config::default();
        let local = cfg.identity_for("httpd").unwrap();
        assert_eq!(local.name(), "httpd");

        cfg.host.fqdn = Some("ipa.example.com".into());
        assert!(matches!(cfg.identity_for("httpd"), Err(InstallError::Config(_))));

        cfg.host.suffix = Some("dc=example,dc=com".into());
        cfg.host.realm = Some("EXAMPLE.COM".into());
        let id = cfg.identity_for("httpd").unwrap();
        assert_eq!(id.fqdn(), "ipa.example.com");
        assert_eq!(id.suffix(), "dc=example,dc=com");
        assert_eq!(id.realm(), Some("EXAMPLE.COM"));

        assert!(matches!(
            cfg.identity_for("bad name"),
            Err(InstallError::InvalidName(_))
        ));
    }

    #[test]
    fn validate_flags_inconsistent_host() {
        let mut cfg = Config::default();
        cfg.host.fqdn = Some("ipa".into());
        cfg.state_db = PathBuf::from("relative.redb");
        cfg.service_command = Some(PathBuf::from("/definitely/not/service"));

        let warnings = cfg.validate();
        let errors = warnings
            .iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 1);
        assert!(warnings.iter().any(|w| w.message.contains("not fully qualified")));
        assert!(warnings.iter().any(|w| w.message.contains("relative")));
        assert!(warnings.iter().any(|w| w.message.contains("service_command")));
    }

    #[test]
    fn directory_section_drives_directory_work() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("svcinst.yaml");
        std::fs::write(
            &path,
            "host:\n  fqdn: ipa.example.com\n  suffix: dc=example,dc=com\n  realm: EXAMPLE.COM\n\
             directory:\n  host: ldap.example.com\n  bind_dn: uid=installer,cn=sysaccounts\n",
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();

        let ldap = MemoryDirectory::with_credentials("uid=installer,cn=sysaccounts", "pw");
        let principal = "HTTP/ipa.example.com@EXAMPLE.COM";
        ldap.insert(Entry::new(legacy_dn(principal, "EXAMPLE.COM", "dc=example,dc=com")));

        let identity = cfg.identity_for("httpd").unwrap();
        let creds = cfg.credentials("pw");
        assert_eq!(creds.bind_dn, "uid=installer,cn=sysaccounts");
        let store = MemoryStateStore::new();
        let mgr = RecordingManager::default();
        let svc = Service::new(&identity, &store, &mgr)
            .with_directory(DirectoryAccess::new(cfg.directory_target(&ldap), &creds))
            .with_output(Box::new(std::io::sink()));

        svc.enable_in_directory("HTTP").unwrap();
        assert_eq!(
            svc.move_service(principal).unwrap(),
            Relocation::Moved {
                dn: canonical_dn(principal, "dc=example,dc=com")
            }
        );
        assert!(ldap
            .entry(&registration_dn("HTTP", "ipa.example.com", "dc=example,dc=com"))
            .is_some());
        assert_eq!(ldap.connected_hosts(), ["ldap.example.com", "ldap.example.com"]);

        // The default bind DN is refused by this directory.
        let fallback = Config::default().credentials("pw");
        let rejected = Service::new(&identity, &store, &mgr)
            .with_directory(DirectoryAccess::new(cfg.directory_target(&ldap), &fallback))
            .with_output(Box::new(std::io::sink()));
        assert!(matches!(
            rejected.move_service(principal),
            Err(InstallError::Connection { .. })
        ));
    }
}
