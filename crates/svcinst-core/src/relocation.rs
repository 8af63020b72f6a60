//! Move a service principal from the Kerberos container to the services
//! container.
//!
//! `kadmin.local` creates principals under `cn=<realm>,cn=kerberos`. Service
//! principals belong under `cn=services,cn=accounts`, carry the service object
//! classes, and are owned by the host's computer entry. The move is a delete
//! followed by an add, so a crash in between leaves the principal in neither
//! place. If the add itself fails the original entry is put back.

use crate::directory::{normalize_dn, Credentials, DirectorySession, Entry, AUTOGENERATE};
use crate::error::Result;
use crate::registry::DirectoryTarget;

/// Object classes every relocated service principal must carry.
pub const SERVICE_OBJECT_CLASSES: [&str; 3] = ["ipaobject", "ipaservice", "pkiuser"];

pub fn legacy_dn(principal: &str, realm: &str, suffix: &str) -> String {
    format!("krbprincipalname={principal},cn={realm},cn=kerberos,{suffix}")
}

pub fn canonical_dn(principal: &str, suffix: &str) -> String {
    format!("krbprincipalname={principal},cn=services,cn=accounts,{suffix}")
}

pub fn host_dn(fqdn: &str, suffix: &str) -> String {
    format!("fqdn={fqdn},cn=computers,cn=accounts,{suffix}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// No entry at the legacy location; the usual case after the first run.
    NothingToRelocate,
    Moved { dn: String },
}

/// `existing` plus the service classes, without duplicates (case-insensitive).
pub fn union_object_classes(existing: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + SERVICE_OBJECT_CLASSES.len());
    let candidates = existing
        .iter()
        .map(|s| s.as_str())
        .chain(SERVICE_OBJECT_CLASSES);
    for class in candidates {
        if !out.iter().any(|c| c.eq_ignore_ascii_case(class)) {
            out.push(class.to_string());
        }
    }
    out
}

/// The entry as it should look at its canonical location.
pub fn relocated_entry(mut entry: Entry, principal: &str, fqdn: &str, suffix: &str) -> Entry {
    let classes = union_object_classes(entry.values("objectclass"));
    entry.set_dn(canonical_dn(principal, suffix));
    entry.set_values("objectclass", classes);
    entry.set_value("ipaUniqueID", AUTOGENERATE);
    entry.set_value("managedBy", host_dn(fqdn, suffix));
    entry
}

/// Relocate `principal` of `realm` if it is still at its legacy location.
pub fn relocate(
    target: DirectoryTarget<'_>,
    credentials: &Credentials,
    fqdn: &str,
    principal: &str,
    realm: &str,
    suffix: &str,
) -> Result<Relocation> {
    let mut session = DirectorySession::open(target.connector, target.host, credentials, fqdn)?;

    let old_dn = legacy_dn(principal, realm, suffix);
    let Some(original) = session.get_entry(&old_dn)? else {
        // Replicas never had the principal in the old place.
        tracing::debug!(principal, "no legacy principal entry, nothing to relocate");
        session.close()?;
        return Ok(Relocation::NothingToRelocate);
    };

    let moved = relocated_entry(original.clone(), principal, fqdn, suffix);
    session.delete(original.dn())?;

    if let Err(e) = session.add(&moved) {
        match session.add(&original) {
            Ok(()) => tracing::warn!(
                principal,
                error = %e,
                "could not create {}, restored entry at {}",
                moved.dn(),
                original.dn()
            ),
            Err(restore) => tracing::error!(
                principal,
                error = %e,
                restore_error = %restore,
                "principal entry lost: removed from {} and could not be created at {}",
                original.dn(),
                moved.dn()
            ),
        }
        return Err(e);
    }

    tracing::info!(
        principal,
        from = %normalize_dn(&old_dn),
        to = %moved.dn(),
        "relocated service principal"
    );
    session.close()?;
    Ok(Relocation::Moved {
        dn: moved.dn().to_string(),
    })
}
