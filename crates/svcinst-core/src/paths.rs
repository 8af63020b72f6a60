use crate::error::{InstallError, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Well-known locations
// ---------------------------------------------------------------------------

pub const DEFAULT_CONFIG_PATH: &str = "/etc/svcinst/svcinst.yaml";
pub const DEFAULT_STATE_DB: &str = "/var/lib/svcinst/sysrestore.redb";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV: &str = "SVCINST_CONFIG";

/// Where `service` and `chkconfig` live when they are not on `PATH`.
pub const SBIN_DIR: &str = "/sbin";

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

pub fn default_state_db() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DB)
}

// ---------------------------------------------------------------------------
// Service name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.@\-]*$").unwrap())
}

/// Service names end up as `service`/`chkconfig` arguments and state keys.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(InstallError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["httpd", "krb5kdc", "ipa_kpasswd", "pki-cad", "dirsrv@EXAMPLE-COM"] {
            validate_service_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "-httpd", "has space", "../etc", "a;b", &"x".repeat(65)] {
            assert!(validate_service_name(name).is_err(), "expected invalid: {name}");
        }
    }
}
