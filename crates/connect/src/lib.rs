//! Signer session protocol: discovery, secure-channel negotiation, session
//! ownership and capability negotiation.
//!
//! ## Architecture
//!
//! ```text
//! Discovery ──▶ SecureChannelNegotiator ──▶ SessionManager ──▶ negotiate_capabilities
//!    │                  │                        │
//!    │                  │                        └─ single active-session slot,
//!    │                  │                           embedded fallback on disconnect
//!    │                  └─ PendingConnection (fingerprint, confirm/cancel)
//!    └─ incremental, bounded, cancellable enumeration of signer backends
//! ```
//!
//! All signer backends sit behind the [`provider::BackendProvider`] and
//! [`session::Signer`] traits; the connector never assumes a concrete
//! transport.

pub mod capability;
pub mod credentials;
pub mod discovery;
pub mod handshake;
pub mod manager;
pub mod provider;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use capability::negotiate_capabilities;
pub use credentials::{load_or_create, CredentialStore};
pub use discovery::{Discovery, DiscoverySession};
pub use handshake::{PendingConnection, SecureChannelNegotiator};
pub use manager::{DisconnectRegistration, SessionManager};
pub use provider::{
    BackendProvider, DisconnectCallback, DisconnectGuard, PendingChannel, SignerBackend,
};
pub use session::{Session, SessionKind, Signer};
