//! Publishing a service certificate on the service's principal entry.
//!
//! The certificate is stored as an extra `userCertificate` value, base64
//! encoded DER as in LDIF. The principal must already live in the services
//! container (see [`relocation`](crate::relocation)).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::directory::{Credentials, DirectorySession, Modification};
use crate::error::{InstallError, Result};
use crate::registry::DirectoryTarget;
use crate::relocation::canonical_dn;

pub const USER_CERTIFICATE: &str = "userCertificate";

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// DER bytes of `cert`. PEM input is unwrapped; anything else is taken as DER.
pub fn to_der(cert: &[u8]) -> Result<Vec<u8>> {
    let pem = std::str::from_utf8(cert)
        .ok()
        .and_then(|text| text.find(PEM_BEGIN).map(|at| &text[at + PEM_BEGIN.len()..]));
    let Some(body) = pem else {
        return Ok(cert.to_vec());
    };

    let end = body
        .find(PEM_END)
        .ok_or_else(|| InstallError::Certificate(format!("missing '{PEM_END}' line")))?;
    let encoded: String = body[..end].split_whitespace().collect();
    STANDARD
        .decode(encoded)
        .map_err(|e| InstallError::Certificate(format!("bad PEM body: {e}")))
}

/// Add `cert` (DER or PEM) to the entry of `principal`.
///
/// A missing principal entry is `InstallError::NotFound`; directory failures
/// are logged and returned unchanged.
pub fn add_cert_to_service(
    target: DirectoryTarget<'_>,
    credentials: &Credentials,
    fqdn: &str,
    principal: &str,
    suffix: &str,
    cert: &[u8],
) -> Result<()> {
    let der = to_der(cert)?;
    if der.is_empty() {
        return Err(InstallError::Certificate("certificate is empty".into()));
    }

    let dn = canonical_dn(principal, suffix);
    let mut session = DirectorySession::open(target.connector, target.host, credentials, fqdn)?;
    let change = Modification::Add {
        attr: USER_CERTIFICATE.to_string(),
        values: vec![STANDARD.encode(&der)],
    };
    if let Err(e) = session.modify(&dn, &[change]) {
        tracing::error!("could not add certificate to service {principal} entry: {e}");
        return Err(e);
    }

    tracing::info!(principal, dn = %dn, bytes = der.len(), "added service certificate");
    session.close()
}
