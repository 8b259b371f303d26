//! In-process development backends for the demo command.
//!
//! Everything here is deterministic and local: a signer that "proves" by
//! hashing, a ledger that confirms after a short delay, and onboarding
//! collaborators wired to them. Useful for exercising the full connect,
//! onboard and submit path without any real signer installed.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use common::{
    Address, AuthorizationRequest, AuthorizationWitness, BackendId, BackendStats, BackendStep,
    CallBundle, CapabilityGrant, CapabilityManifest, ChainId, ContractAddress, FeeConfig,
    HandshakeError, OffchainEffect, ProvenTransaction, ProvingRequest, SignerError,
    SimulationOutput, TxIdentity,
};
use connect::{
    BackendProvider, CredentialStore, DisconnectCallback, DisconnectGuard, PendingChannel,
    SessionManager, Signer, SignerBackend,
};
use onboarding::{BalanceProber, ContractRegistrar, DripExecutor, ProbeResult};
use pipeline::{InclusionResult, LedgerClient, LedgerError, TransactionPipeline, TxStatus, TxWait};

pub const DEV_CHAIN: &str = "devnet";
pub const DRIP_SECRET: &str = "midnight";

/// Local signer: witnesses and proofs are hashes of their inputs.
pub struct DevSigner {
    accounts: Vec<Address>,
}

impl DevSigner {
    pub fn new(label: &str) -> Self {
        Self {
            accounts: vec![Address(format!("addr_{label}_01"))],
        }
    }

    /// Build the embedded signer from persisted key material; the address is
    /// a digest of the material, so reloads keep the same account.
    pub fn from_material(material: &[u8]) -> Self {
        let digest = Sha256::digest(material);
        Self {
            accounts: vec![Address(format!("addr_{}", hex::encode(&digest[..6])))],
        }
    }
}

#[async_trait]
impl Signer for DevSigner {
    async fn accounts(&self) -> Result<Vec<Address>, SignerError> {
        Ok(self.accounts.clone())
    }

    async fn simulate(&self, bundle: CallBundle) -> Result<SimulationOutput, SignerError> {
        let account = self.accounts[0].clone();
        let mut effects: Vec<OffchainEffect> = bundle
            .calls
            .iter()
            .enumerate()
            .map(|(call_index, call)| {
                OffchainEffect::AuthorizationRequest(AuthorizationRequest {
                    account: account.clone(),
                    call_index,
                    payload: Sha256::digest(call.entry_point.as_bytes()).to_vec(),
                })
            })
            .collect();
        effects.push(OffchainEffect::Log {
            message: format!("executed {} call(s)", bundle.calls.len()),
        });
        Ok(SimulationOutput {
            bundle,
            effects,
            stats: Some(BackendStats {
                total_ms: 12,
                steps: vec![BackendStep {
                    name: "execute".into(),
                    duration_ms: 9,
                }],
            }),
        })
    }

    async fn prove(&self, request: ProvingRequest) -> Result<ProvenTransaction, SignerError> {
        let payload =
            serde_json::to_vec(&request.bundle).map_err(|e| SignerError::Backend(e.to_string()))?;
        let digest = Sha256::digest(&payload);
        Ok(ProvenTransaction {
            identity: TxIdentity(hex::encode(&digest[..16])),
            payload,
            stats: Some(BackendStats {
                total_ms: 40,
                steps: vec![BackendStep {
                    name: "circuit".into(),
                    duration_ms: 35,
                }],
            }),
        })
    }

    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationWitness, SignerError> {
        let digest = Sha256::digest(&request.payload);
        Ok(AuthorizationWitness {
            account: request.account,
            call_index: request.call_index,
            material: digest[..16].to_vec(),
        })
    }

    async fn request_capabilities(
        &self,
        manifest: CapabilityManifest,
    ) -> Result<CapabilityGrant, SignerError> {
        Ok(CapabilityGrant {
            accounts: if manifest.accounts {
                self.accounts.clone()
            } else {
                Vec::new()
            },
            can_register: !manifest.register_contracts.is_empty(),
            can_simulate: !manifest.simulate_contracts.is_empty(),
            can_transact: !manifest.transact_contracts.is_empty(),
        })
    }
}

/// In-memory credential store for the demo; real deployments persist to the
/// platform keystore.
#[derive(Default)]
pub struct DevCredentialStore {
    material: std::sync::Mutex<Option<Vec<u8>>>,
}

#[async_trait]
impl CredentialStore for DevCredentialStore {
    async fn load(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.material.lock().unwrap().clone())
    }

    async fn save(&self, material: &[u8]) -> anyhow::Result<()> {
        *self.material.lock().unwrap() = Some(material.to_vec());
        Ok(())
    }
}

/// Provider exposing one always-available dev backend on [`DEV_CHAIN`].
pub struct DevProvider {
    backend: SignerBackend,
}

impl DevProvider {
    pub fn new() -> Self {
        Self {
            backend: SignerBackend {
                id: BackendId("dev-signer".into()),
                name: "Development Signer".into(),
                icon: None,
                chain: ChainId::parse(DEV_CHAIN).expect("static chain identity"),
                api_version: "1.0.0".into(),
            },
        }
    }
}

impl Default for DevProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct DevChannel {
    secret_hash: [u8; 32],
}

#[async_trait]
impl PendingChannel for DevChannel {
    fn secret_hash(&self) -> [u8; 32] {
        self.secret_hash
    }

    async fn finalize(self: Box<Self>) -> Result<Arc<dyn Signer>, HandshakeError> {
        Ok(Arc::new(DevSigner::new("external")))
    }

    async fn reject(self: Box<Self>) {
        debug!("dev channel rejected");
    }
}

#[async_trait]
impl BackendProvider for DevProvider {
    async fn probe(&self, chain: &ChainId) -> Option<SignerBackend> {
        (*chain == self.backend.chain).then(|| self.backend.clone())
    }

    async fn establish_channel(
        &self,
        app_id: &str,
    ) -> Result<Box<dyn PendingChannel>, HandshakeError> {
        // Deterministic stand-in for a real key exchange.
        let secret_hash: [u8; 32] = Sha256::digest(app_id.as_bytes()).into();
        Ok(Box::new(DevChannel { secret_hash }))
    }

    fn on_disconnect(&self, _callback: DisconnectCallback) -> DisconnectGuard {
        DisconnectGuard::noop()
    }

    async fn disconnect(&self) -> Result<(), HandshakeError> {
        Ok(())
    }
}

/// Ledger that accepts everything and confirms after a short delay.
pub struct DevLedger;

#[async_trait]
impl LedgerClient for DevLedger {
    async fn send_transaction(&self, tx: &ProvenTransaction) -> Result<(), LedgerError> {
        debug!(identity = %tx.identity, "dev ledger accepted transaction");
        tokio::time::sleep(Duration::from_millis(25)).await;
        Ok(())
    }

    async fn transaction_status(&self, _identity: &TxIdentity) -> Result<TxStatus, LedgerError> {
        Ok(TxStatus::Unknown)
    }

    async fn wait_for_inclusion(
        &self,
        identity: &TxIdentity,
        _wait: &TxWait,
    ) -> Result<InclusionResult, LedgerError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(InclusionResult {
            identity: identity.clone(),
            block_height: Some(1234),
        })
    }

    async fn current_fee_floor(&self) -> Result<u64, LedgerError> {
        Ok(100)
    }
}

/// Registrar that pretends registration takes a moment.
pub struct DevRegistrar;

#[async_trait]
impl ContractRegistrar for DevRegistrar {
    async fn register_base(&self) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }

    async fn register_drip(&self) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(())
    }
}

/// Prober with a fixed balance.
pub struct DevProber {
    pub balance: u128,
}

#[async_trait]
impl BalanceProber for DevProber {
    async fn probe(&self) -> anyhow::Result<ProbeResult> {
        Ok(ProbeResult {
            balance: self.balance,
            rate: Some(0.04),
        })
    }
}

/// Drip executor that submits a real claim through the pipeline when the
/// secret phrase is [`DRIP_SECRET`].
pub struct DevDrip {
    manager: Arc<SessionManager>,
    pipeline: Arc<TransactionPipeline>,
}

impl DevDrip {
    pub fn new(manager: Arc<SessionManager>, pipeline: Arc<TransactionPipeline>) -> Self {
        Self { manager, pipeline }
    }
}

#[async_trait]
impl DripExecutor for DevDrip {
    async fn claim(&self, secret: &str) -> anyhow::Result<()> {
        if secret != DRIP_SECRET {
            anyhow::bail!("faucet: invalid secret");
        }
        let bundle = CallBundle::new(vec![common::ContractCall::new(
            ContractAddress("faucet".into()),
            "claim",
        )
        .with_args(serde_json::json!({ "secret": secret }))]);
        let session = self.manager.active();
        self.pipeline
            .submit(
                &session,
                bundle,
                FeeConfig::with_floor(100),
                TxWait::Inclusion { timeout: None },
            )
            .await?;
        Ok(())
    }
}
