//! Network/ledger client boundary.
//!
//! The pipeline's `sending` and `mining` phases talk to the network only
//! through this trait. Wire format, endpoints and network timeouts are the
//! implementation's concern; its failures surface as ordinary phase errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use common::{ProvenTransaction, TxIdentity};

/// How long the `mining` phase should wait for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxWait {
    /// Skip the mining phase entirely; the submission resolves once sent.
    NoWait,
    /// Wait until the transaction is included, optionally bounded.
    Inclusion { timeout: Option<Duration> },
}

impl TxWait {
    pub fn is_no_wait(&self) -> bool {
        matches!(self, Self::NoWait)
    }
}

/// Ledger-side status of a transaction identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Never seen by the ledger.
    Unknown,
    /// Submitted, not yet final.
    Pending,
    /// Reached a final state; re-submitting the same identity is an error.
    Final,
}

/// Outcome of a successful inclusion wait.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionResult {
    pub identity: TxIdentity,
    /// Block height of inclusion, when the ledger reports one.
    pub block_height: Option<u64>,
}

/// Failure reported by the network layer.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),
    #[error("timed out waiting for inclusion of {0}")]
    InclusionTimeout(TxIdentity),
}

/// The network/ledger client collaborator.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Hand a finalized transaction to the network.
    async fn send_transaction(&self, tx: &ProvenTransaction) -> Result<(), LedgerError>;

    /// Current status of a transaction identity.
    async fn transaction_status(&self, identity: &TxIdentity) -> Result<TxStatus, LedgerError>;

    /// Wait for inclusion according to `wait`. Never called with
    /// [`TxWait::NoWait`].
    async fn wait_for_inclusion(
        &self,
        identity: &TxIdentity,
        wait: &TxWait,
    ) -> Result<InclusionResult, LedgerError>;

    /// Minimum fee the network currently accepts.
    async fn current_fee_floor(&self) -> Result<u64, LedgerError>;
}
