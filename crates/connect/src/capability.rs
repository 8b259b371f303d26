//! One-shot capability negotiation against an active session.
//!
//! The whole manifest is presented upfront so the user sees a single prompt.
//! The grant is inspected here only for the mandatory accounts category;
//! per-category decisions are the application's to read.

use tracing::{debug, warn};

use common::{
    normalize_backend_message, CapabilityDeniedError, CapabilityGrant, CapabilityManifest,
};

use crate::session::Session;

/// Present `manifest` to the session's signer and enforce the accounts
/// requirement.
///
/// A grant without at least one account fails the connection attempt with
/// [`CapabilityDeniedError::AccountsDenied`]; other categories may be
/// individually refused without failing negotiation.
pub async fn negotiate_capabilities(
    session: &Session,
    manifest: CapabilityManifest,
) -> Result<CapabilityGrant, CapabilityDeniedError> {
    let grant = session
        .signer()
        .request_capabilities(manifest)
        .await
        .map_err(|err| {
            warn!(error = %err, "capability request failed");
            CapabilityDeniedError::Refused(normalize_backend_message(&err.to_string()))
        })?;

    grant.require_accounts()?;
    debug!(
        accounts = grant.accounts.len(),
        can_register = grant.can_register,
        can_simulate = grant.can_simulate,
        can_transact = grant.can_transact,
        "capability grant received"
    );
    Ok(grant)
}
