//! Error taxonomy for the connector.
//!
//! Lower-level components never retry; every error propagates to the
//! onboarding machine or the application, which own all retry decisions.
//! Anything shown to a user goes through [`normalize_backend_message`] first
//! so raw backend error shapes never leak into the UI.

use thiserror::Error;

use crate::chain::TxIdentity;

/// Discovery never started. Fatal for the call; distinct from an empty
/// result set, which is a normal completion.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("malformed chain identity: {0:?}")]
    InvalidChainIdentity(String),
}

/// Channel negotiation failed. Recoverable: the caller returns to backend
/// selection.
#[derive(Debug, Clone, Error)]
pub enum HandshakeError {
    /// The backend refused the handshake outright.
    #[error("backend {backend} rejected the handshake: {reason}")]
    Rejected { backend: String, reason: String },

    /// The backend withdrew between initiate and confirm. The caller must
    /// return to backend selection, not retry confirm.
    #[error("backend {backend} revoked the connection before confirmation")]
    Revoked { backend: String },

    /// Confirm or cancel on a connection that is no longer pending.
    #[error("connection not pending")]
    NotPending,

    /// The provider could not be reached at all.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// A required capability category was not granted.
#[derive(Debug, Clone, Error)]
pub enum CapabilityDeniedError {
    /// The accounts category is mandatory; without at least one address the
    /// connection attempt is treated as failed.
    #[error("the signer did not expose any accounts; account access is required to connect")]
    AccountsDenied,

    #[error("the signer refused the capability request: {0}")]
    Refused(String),
}

/// Failure reported by a signer backend during a session operation.
#[derive(Debug, Clone, Error)]
pub enum SignerError {
    /// The user or backend declined the operation.
    #[error("signer rejected the request: {0}")]
    Rejected(String),

    /// The session is gone (provider disconnected mid-operation).
    #[error("signer disconnected")]
    Disconnected,

    /// Any other backend-reported failure.
    #[error("signer backend error: {0}")]
    Backend(String),
}

/// Failure inside the transaction pipeline. The pipeline has already emitted
/// an `error` progress event by the time this reaches the caller.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A phase failed. `phase` is the phase name as carried in progress
    /// events.
    #[error("transaction {phase} failed: {message}")]
    Phase { phase: &'static str, message: String },

    /// The transaction identity already reached a final state on the ledger.
    /// Fatal for this submission.
    #[error("transaction {identity} was already submitted and finalized")]
    DuplicateSubmission { identity: TxIdentity },
}

/// Failure surfaced inside the onboarding orchestration.
#[derive(Debug, Clone, Error)]
pub enum OnboardingFlowError {
    #[error("onboarding step {step} failed: {message}")]
    Step { step: &'static str, message: String },

    /// The machine is in a terminal error status; a reset is required.
    #[error("onboarding is in an error state and must be reset")]
    RequiresReset,

    /// A drip secret was needed but none is held.
    #[error("no drip secret has been supplied")]
    MissingSecret,
}

/// Normalize a raw backend error message into a stable user-facing phrase.
///
/// Backend error shapes vary wildly between providers; the UI keys off a
/// small set of known substrings and falls back to the trimmed raw text.
pub fn normalize_backend_message(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("invalid secret") || lower.contains("password") {
        "The secret phrase was not accepted.".to_string()
    } else if lower.contains("rejected") || lower.contains("denied") {
        "The request was declined in the signer.".to_string()
    } else if lower.contains("insufficient") {
        "The account balance is too low for this action.".to_string()
    } else if lower.contains("disconnect") {
        "The signer connection was lost.".to_string()
    } else {
        raw.trim().to_string()
    }
}
