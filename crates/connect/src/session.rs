//! Authenticated signer sessions.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use common::{
    AuthorizationRequest, AuthorizationWitness, CallBundle, CapabilityGrant, CapabilityManifest,
    ProvenTransaction, ProvingRequest, SignerError, SimulationOutput,
};

use crate::provider::SignerBackend;

/// The operations every signer backend exposes once a session is
/// established. Implemented by the embedded signer and by confirmed
/// external channels alike.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Accounts the signer is willing to operate for.
    async fn accounts(&self) -> Result<Vec<common::Address>, SignerError>;

    /// Execute the call bundle to obtain witness-generation output and
    /// declared offchain effects.
    async fn simulate(&self, bundle: CallBundle) -> Result<SimulationOutput, SignerError>;

    /// Produce a proof for the witness-augmented bundle.
    async fn prove(&self, request: ProvingRequest) -> Result<ProvenTransaction, SignerError>;

    /// Produce an authorization witness for one simulation-surfaced request.
    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationWitness, SignerError>;

    /// Present the application's capability manifest and return the grant.
    async fn request_capabilities(
        &self,
        manifest: CapabilityManifest,
    ) -> Result<CapabilityGrant, SignerError>;
}

/// Where a session's signer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// The in-process fallback signer.
    Embedded,
    /// A confirmed external backend.
    External(SignerBackend),
}

/// An authenticated handle to a signer.
///
/// Exactly one session is active system-wide; the slot is owned by
/// [`crate::manager::SessionManager`]. Sessions are cheap to clone.
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    kind: SessionKind,
    signer: Arc<dyn Signer>,
}

impl Session {
    pub fn embedded(signer: Arc<dyn Signer>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: SessionKind::Embedded,
            signer,
        }
    }

    pub fn external(backend: SignerBackend, signer: Arc<dyn Signer>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: SessionKind::External(backend),
            signer,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &SessionKind {
        &self.kind
    }

    pub fn is_external(&self) -> bool {
        matches!(self.kind, SessionKind::External(_))
    }

    pub fn signer(&self) -> &Arc<dyn Signer> {
        &self.signer
    }
}

// Manual Debug: `signer` is a trait object.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
