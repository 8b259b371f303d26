//! Provider boundary: the contract an external signer-backend integration
//! (browser extension bridge, hardware bridge, ...) must implement.
//!
//! The connector only ever talks to providers through these traits, so the
//! same discovery / handshake / session machinery drives every backend kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use common::{BackendId, ChainId, HandshakeError};

use crate::session::Signer;

/// A discovered signer backend. Immutable; discarded when the discovery
/// session that produced it ends or is superseded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerBackend {
    /// Provider-assigned identity.
    pub id: BackendId,
    /// Human-readable name for the selection UI.
    pub name: String,
    /// Optional icon reference.
    pub icon: Option<String>,
    /// Chain this backend serves.
    pub chain: ChainId,
    /// Self-reported API version of the backend.
    pub api_version: String,
}

/// Callback invoked when a provider loses its connection unexpectedly.
pub type DisconnectCallback = Box<dyn Fn() + Send + Sync>;

/// Unsubscribe handle for a provider disconnect hook.
///
/// Dropping the guard unregisters the hook.
pub struct DisconnectGuard(Option<Box<dyn FnOnce() + Send>>);

impl DisconnectGuard {
    pub fn new(unhook: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(unhook)))
    }

    /// A guard that unhooks nothing (for providers without disconnect
    /// signalling).
    pub fn noop() -> Self {
        Self(None)
    }

    /// Explicitly unregister the hook.
    pub fn unsubscribe(mut self) {
        if let Some(unhook) = self.0.take() {
            unhook();
        }
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if let Some(unhook) = self.0.take() {
            unhook();
        }
    }
}

impl std::fmt::Debug for DisconnectGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DisconnectGuard")
            .field(&self.0.is_some())
            .finish()
    }
}

/// A key-exchange handshake in progress on the provider side.
///
/// Exactly one of [`finalize`](PendingChannel::finalize) or
/// [`reject`](PendingChannel::reject) consumes the channel.
#[async_trait]
pub trait PendingChannel: Send + Sync {
    /// Hash of the key-exchange shared secret. Both endpoints derive the
    /// verification fingerprint from this value independently.
    fn secret_hash(&self) -> [u8; 32];

    /// Finalize the channel after explicit user confirmation.
    ///
    /// Fails with [`HandshakeError::Revoked`] if the backend withdrew in the
    /// window between initiate and confirm.
    async fn finalize(self: Box<Self>) -> Result<Arc<dyn Signer>, HandshakeError>;

    /// Abandon the handshake.
    async fn reject(self: Box<Self>);
}

/// An installed signer-backend provider.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    /// Check availability and chain compatibility.
    ///
    /// Returns `None` when the backend is unavailable or serves a different
    /// chain. Discovery bounds the wait; implementations need not enforce a
    /// timeout themselves.
    async fn probe(&self, chain: &ChainId) -> Option<SignerBackend>;

    /// Start a key exchange for the given application identity.
    async fn establish_channel(&self, app_id: &str)
        -> Result<Box<dyn PendingChannel>, HandshakeError>;

    /// Register a hook invoked on unexpected connection loss.
    fn on_disconnect(&self, callback: DisconnectCallback) -> DisconnectGuard;

    /// Tear down the provider's current connection, if any.
    async fn disconnect(&self) -> Result<(), HandshakeError>;
}
