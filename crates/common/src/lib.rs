//! Shared domain types for the wallet-connect workspace.
//!
//! This crate holds the vocabulary every other crate speaks: chain and
//! account identifiers, contract call bundles and their simulation output,
//! capability manifests, the verification fingerprint, and the error
//! taxonomy. It contains no I/O and no async code.

pub mod calls;
pub mod capability;
pub mod chain;
pub mod error;
pub mod fingerprint;

pub use calls::{
    AuthorizationRequest, AuthorizationWitness, BackendStats, BackendStep, CallBundle,
    ContractCall, FeeConfig, OffchainEffect, ProvenTransaction, ProvingRequest, SimulationOutput,
};
pub use capability::{CapabilityGrant, CapabilityManifest};
pub use chain::{Address, BackendId, ChainId, ContractAddress, TxIdentity};
pub use error::{
    normalize_backend_message, CapabilityDeniedError, DiscoveryError, HandshakeError,
    OnboardingFlowError, PipelineError, SignerError,
};
pub use fingerprint::Fingerprint;
