//! Capability manifest and grant types.
//!
//! The application declares every permission category it will ever need in a
//! single manifest, requested once per connection so the user sees one prompt
//! instead of one per action. Each category is independently grantable; the
//! accounts category is the only mandatory one.

use serde::{Deserialize, Serialize};

use crate::chain::{Address, ContractAddress};
use crate::error::CapabilityDeniedError;

/// Batched declaration of every permission category the application needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityManifest {
    /// Request access to the user's account list. Mandatory for any useful
    /// connection; a grant without accounts fails the connection attempt.
    pub accounts: bool,
    /// Contracts the application intends to register with the signer.
    pub register_contracts: Vec<ContractAddress>,
    /// Contracts the application intends to simulate calls against.
    pub simulate_contracts: Vec<ContractAddress>,
    /// Contracts the application intends to submit transactions to.
    pub transact_contracts: Vec<ContractAddress>,
}

impl CapabilityManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(mut self) -> Self {
        self.accounts = true;
        self
    }

    pub fn register(mut self, contract: ContractAddress) -> Self {
        self.register_contracts.push(contract);
        self
    }

    pub fn simulate(mut self, contract: ContractAddress) -> Self {
        self.simulate_contracts.push(contract);
        self
    }

    pub fn transact(mut self, contract: ContractAddress) -> Self {
        self.transact_contracts.push(contract);
        self
    }
}

/// The signer's response to a manifest request.
///
/// Categories are independent: a signer may grant simulation but refuse
/// transactions. Only the accounts category is load-bearing for the
/// connection itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityGrant {
    /// Accounts the user exposed to the application. Empty means the
    /// accounts category was denied.
    pub accounts: Vec<Address>,
    pub can_register: bool,
    pub can_simulate: bool,
    pub can_transact: bool,
}

impl CapabilityGrant {
    /// Enforce the mandatory accounts category.
    pub fn require_accounts(&self) -> Result<&[Address], CapabilityDeniedError> {
        if self.accounts.is_empty() {
            return Err(CapabilityDeniedError::AccountsDenied);
        }
        Ok(&self.accounts)
    }
}
