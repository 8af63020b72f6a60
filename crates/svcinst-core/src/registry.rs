//! Registration of enabled services in the directory's masters container.
//!
//! Once a service is registered, the directory, not the local init system,
//! drives its startup. Other hosts read the `startOrder` values to sequence
//! dependent services.

use serde::Serialize;

use crate::controller::ServiceController;
use crate::directory::{Credentials, DirectoryConnector, DirectorySession, Entry};
use crate::error::{InstallError, Result};

/// Container below the suffix that holds one entry per server.
pub const MASTERS_CONTAINER: &str = "cn=masters,cn=ipa,cn=etc";

pub const ENABLED_SERVICE: &str = "enabledService";

/// Directory name, OS daemon, and start order of a service. Lower starts earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KnownService {
    pub name: &'static str,
    pub daemon: &'static str,
    pub start_order: u32,
}

/// Fixed, host-independent start ordering.
pub const SERVICE_ORDER: &[KnownService] = &[
    KnownService {
        name: "KDC",
        daemon: "krb5kdc",
        start_order: 10,
    },
    KnownService {
        name: "KPASSWD",
        daemon: "ipa_kpasswd",
        start_order: 20,
    },
    KnownService {
        name: "DNS",
        daemon: "named",
        start_order: 30,
    },
    KnownService {
        name: "HTTP",
        daemon: "httpd",
        start_order: 40,
    },
    KnownService {
        name: "CA",
        daemon: "pki-cad",
        start_order: 50,
    },
];

pub fn lookup(name: &str) -> Option<&'static KnownService> {
    SERVICE_ORDER.iter().find(|s| s.name == name)
}

pub fn start_order(name: &str) -> Result<u32> {
    lookup(name)
        .map(|s| s.start_order)
        .ok_or_else(|| InstallError::UnknownService(name.to_string()))
}

pub fn registration_dn(name: &str, fqdn: &str, suffix: &str) -> String {
    format!("cn={name},cn={fqdn},{MASTERS_CONTAINER},{suffix}")
}

/// The registration entry for `name` on `fqdn`.
pub fn registration_entry(name: &str, fqdn: &str, suffix: &str) -> Result<Entry> {
    let order = start_order(name)?;
    let mut entry = Entry::new(registration_dn(name, fqdn, suffix));
    entry.set_values("objectclass", ["nsContainer", "ipaConfigObject"]);
    entry.set_value("cn", name);
    entry.set_values(
        "ipaconfigstring",
        [ENABLED_SERVICE.to_string(), format!("startOrder {order}")],
    );
    Ok(entry)
}

/// Where and how to reach the directory.
#[derive(Clone, Copy)]
pub struct DirectoryTarget<'a> {
    pub connector: &'a dyn DirectoryConnector,
    /// Address to connect to, usually the local server.
    pub host: &'a str,
}

/// Hand startup of `controller`'s service to the directory.
///
/// Disables the local boot-time start, then adds the registration entry for
/// `name` on `fqdn`. An existing registration is an error: it is logged and
/// returned as `InstallError::AlreadyExists`.
pub fn enable_in_directory(
    controller: ServiceController<'_>,
    target: DirectoryTarget<'_>,
    name: &str,
    fqdn: &str,
    credentials: &Credentials,
    suffix: &str,
) -> Result<()> {
    // Fail on an unknown name before touching the host.
    let entry = registration_entry(name, fqdn, suffix)?;

    controller.set_enabled(false)?;

    let mut session = DirectorySession::open(
        target.connector,
        target.host,
        credentials,
        fqdn,
    )?;

    match session.add(&entry) {
        Ok(()) => {
            tracing::info!(service = %name, host = %fqdn, dn = %entry.dn(), "registered service startup entry");
            session.close()
        }
        Err(e @ InstallError::AlreadyExists(_)) => {
            tracing::error!("failed to add {name} Service startup entry: {e}");
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Remove the registration for `name` on `fqdn`. Returns whether an entry was
/// removed; a missing entry is not an error.
pub fn disable_in_directory(
    target: DirectoryTarget<'_>,
    name: &str,
    fqdn: &str,
    credentials: &Credentials,
    suffix: &str,
) -> Result<bool> {
    let dn = registration_dn(name, fqdn, suffix);
    let mut session = DirectorySession::open(
        target.connector,
        target.host,
        credentials,
        fqdn,
    )?;
    let removed = match session.delete(&dn) {
        Ok(()) => true,
        Err(InstallError::NotFound(_)) => false,
        Err(e) => return Err(e),
    };
    if removed {
        tracing::info!(service = %name, host = %fqdn, "removed service startup entry");
    }
    session.close()?;
    Ok(removed)
}

pub fn is_enabled_in_directory(
    target: DirectoryTarget<'_>,
    name: &str,
    fqdn: &str,
    credentials: &Credentials,
    suffix: &str,
) -> Result<bool> {
    let mut session = DirectorySession::open(
        target.connector,
        target.host,
        credentials,
        fqdn,
    )?;
    let found = session
        .get_entry(&registration_dn(name, fqdn, suffix))?
        .is_some();
    session.close()?;
    Ok(found)
}
