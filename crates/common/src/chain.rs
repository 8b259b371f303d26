//! Chain, account and transaction identifiers.
//!
//! All of these are opaque newtypes: the connector never interprets their
//! contents beyond validation, it only routes them between the application,
//! the signer backends and the ledger client.

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

/// Identity of the chain a signer backend must serve.
///
/// A chain identity is a lowercase, dash-separated label such as
/// `"testnet-02"`. Discovery refuses to start on a malformed identity; an
/// empty result set means "nothing found", never "bad input".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    /// Parse and validate a chain identity.
    pub fn parse(raw: &str) -> Result<Self, DiscoveryError> {
        if raw.is_empty()
            || !raw
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(DiscoveryError::InvalidChainIdentity(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a signer backend (assigned by its provider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(pub String);

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user account address as reported by a signer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(pub String);

impl std::fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The on-ledger identity of a finalized-or-pending transaction.
///
/// Distinct from the pipeline's per-submission `tx_id`: two submissions of
/// the same payload share one `TxIdentity` but never a `tx_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxIdentity(pub String);

impl std::fmt::Display for TxIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
