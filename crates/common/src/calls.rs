//! Contract call bundles and the artifacts the pipeline moves between phases.
//!
//! A submission starts life as a [`CallBundle`], picks up authorization
//! witnesses during simulation, becomes a [`ProvingRequest`] and finally a
//! [`ProvenTransaction`] ready for the network layer.

use serde::{Deserialize, Serialize};

use crate::chain::{Address, ContractAddress, TxIdentity};

/// One contract call within a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractCall {
    /// Target contract.
    pub contract: ContractAddress,
    /// Entry point (circuit / method name) to invoke.
    pub entry_point: String,
    /// Application-defined arguments, forwarded opaquely.
    pub args: serde_json::Value,
    /// Authorization witness attached during simulation, if the call
    /// required one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<AuthorizationWitness>,
}

impl ContractCall {
    pub fn new(contract: ContractAddress, entry_point: impl Into<String>) -> Self {
        Self {
            contract,
            entry_point: entry_point.into(),
            args: serde_json::Value::Null,
            witness: None,
        }
    }

    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }
}

/// The unit of submission: an ordered list of contract calls executed
/// atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallBundle {
    pub calls: Vec<ContractCall>,
}

impl CallBundle {
    pub fn new(calls: Vec<ContractCall>) -> Self {
        Self { calls }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// A request, surfaced during simulation, for an authorization witness
/// covering one call in the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Account on whose behalf the call is made.
    pub account: Address,
    /// Index of the call in the bundle this request covers.
    pub call_index: usize,
    /// Backend-defined material to be signed over.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

/// Proof material authorizing one contract call on behalf of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationWitness {
    pub account: Address,
    pub call_index: usize,
    /// Opaque witness material produced by the signer.
    #[serde(with = "hex_bytes")]
    pub material: Vec<u8>,
}

/// A side effect declared by the simulator.
///
/// Only `AuthorizationRequest` records are acted upon by the pipeline;
/// everything else is informational and silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OffchainEffect {
    AuthorizationRequest(AuthorizationRequest),
    Log { message: String },
    #[serde(untagged)]
    Other { kind: String, data: serde_json::Value },
}

/// Backend-reported timing for one named sub-step of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStep {
    pub name: String,
    pub duration_ms: u64,
}

/// Timing statistics a backend may attach to a simulate/prove response.
///
/// `steps` never accounts for the full `total_ms`; the pipeline computes the
/// unaccounted remainder itself when building phase breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendStats {
    pub total_ms: u64,
    pub steps: Vec<BackendStep>,
}

/// Output of the simulation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    /// The bundle as executed (calls may have been normalized by the
    /// backend; witnesses are attached by the pipeline afterwards).
    pub bundle: CallBundle,
    /// Declared offchain effects, in declaration order.
    pub effects: Vec<OffchainEffect>,
    /// Backend timing statistics, when the backend reports them.
    pub stats: Option<BackendStats>,
}

/// Fee configuration for proving and submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Minimum fee the network currently accepts.
    pub floor: u64,
    /// Additional priority fee on top of the floor.
    pub priority: u64,
}

impl FeeConfig {
    pub fn with_floor(floor: u64) -> Self {
        Self { floor, priority: 0 }
    }

    pub fn total(&self) -> u64 {
        self.floor.saturating_add(self.priority)
    }
}

/// Input to the proving phase: the witness-augmented bundle plus fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvingRequest {
    pub bundle: CallBundle,
    pub fee: FeeConfig,
}

/// A proven transaction ready to be handed to the network layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenTransaction {
    /// On-ledger identity; stable across re-submissions of the same payload.
    pub identity: TxIdentity,
    /// Serialized transaction body.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    /// Backend timing statistics for the proving step, when reported.
    pub stats: Option<BackendStats>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        hex::decode(&raw).map_err(serde::de::Error::custom)
    }
}
