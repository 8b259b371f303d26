//! Secure-channel negotiation against a chosen backend.
//!
//! `initiate` runs the key exchange and derives the verification
//! fingerprint; the user compares it out-of-band with the grid the backend
//! displays, then the application calls `confirm`. The negotiator never
//! auto-confirms: a channel without an explicit confirmation is worthless
//! against an interposed attacker.

use std::sync::Arc;

use tracing::{debug, info};

use common::{Fingerprint, HandshakeError};

use crate::manager::SessionManager;
use crate::provider::{BackendProvider, PendingChannel, SignerBackend};
use crate::session::Session;

/// A handshake in progress for exactly one backend.
///
/// Consumed by confirm; cancel and a superseding handshake destroy it.
pub struct PendingConnection {
    backend: SignerBackend,
    fingerprint: Fingerprint,
    channel: Option<Box<dyn PendingChannel>>,
}

impl PendingConnection {
    pub fn backend(&self) -> &SignerBackend {
        &self.backend
    }

    /// The fingerprint to show the user for out-of-band comparison.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// False once confirmed or cancelled.
    pub fn is_pending(&self) -> bool {
        self.channel.is_some()
    }
}

impl std::fmt::Debug for PendingConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingConnection")
            .field("backend", &self.backend.id)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

/// Negotiates authenticated channels and installs confirmed sessions into
/// the [`SessionManager`].
pub struct SecureChannelNegotiator {
    app_id: String,
    manager: Arc<SessionManager>,
}

impl SecureChannelNegotiator {
    pub fn new(app_id: impl Into<String>, manager: Arc<SessionManager>) -> Self {
        Self {
            app_id: app_id.into(),
            manager,
        }
    }

    /// Run the key exchange with `backend` through its provider.
    ///
    /// Any previously connected external provider is disconnected first,
    /// best-effort. A rejection surfaces to the caller; channel state is
    /// unaffected (there is nothing to clean up).
    pub async fn initiate(
        &self,
        provider: &Arc<dyn BackendProvider>,
        backend: SignerBackend,
    ) -> Result<PendingConnection, HandshakeError> {
        self.manager.release_external().await;

        let channel = provider.establish_channel(&self.app_id).await?;
        let fingerprint = Fingerprint::derive(&channel.secret_hash());
        debug!(backend = %backend.id, "handshake initiated, awaiting user verification");

        Ok(PendingConnection {
            backend,
            fingerprint,
            channel: Some(channel),
        })
    }

    /// Finalize a pending connection after explicit user confirmation.
    ///
    /// Fails with [`HandshakeError::NotPending`] if the connection was
    /// already confirmed or cancelled, without side effects on the active
    /// session. Fails with [`HandshakeError::Revoked`] if the backend
    /// withdrew since initiate; the caller should return to backend
    /// selection rather than retry.
    pub async fn confirm(
        &self,
        provider: &Arc<dyn BackendProvider>,
        pending: &mut PendingConnection,
    ) -> Result<Session, HandshakeError> {
        let channel = pending.channel.take().ok_or(HandshakeError::NotPending)?;
        let signer = channel.finalize().await?;
        let session = Session::external(pending.backend.clone(), signer);
        self.manager
            .install_external(session.clone(), Arc::clone(provider));
        info!(backend = %pending.backend.id, "secure channel confirmed");
        Ok(session)
    }

    /// Abandon a pending connection. Idempotent; never touches the active
    /// session.
    pub async fn cancel(&self, pending: &mut PendingConnection) {
        if let Some(channel) = pending.channel.take() {
            channel.reject().await;
            debug!(backend = %pending.backend.id, "pending connection cancelled");
        }
    }
}
