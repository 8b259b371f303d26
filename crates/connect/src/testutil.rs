//! In-crate mocks for discovery, handshake and session-manager tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use common::{
    Address, AuthorizationRequest, AuthorizationWitness, BackendId, CallBundle, CapabilityGrant,
    CapabilityManifest, ChainId, HandshakeError, ProvenTransaction, ProvingRequest, SignerError,
    SimulationOutput, TxIdentity,
};

use crate::provider::{
    BackendProvider, DisconnectCallback, DisconnectGuard, PendingChannel, SignerBackend,
};
use crate::session::Signer;

/// Secret hash every mock channel reports; tests derive the expected
/// fingerprint from it.
pub(crate) const MOCK_SECRET_HASH: [u8; 32] = [0x42; 32];

/// A signer whose responses are canned and whose calls are counted.
#[derive(Default)]
pub(crate) struct MockSigner {
    #[allow(dead_code)]
    pub simulate_calls: AtomicUsize,
    #[allow(dead_code)]
    pub authorize_calls: AtomicUsize,
}

#[async_trait]
impl Signer for MockSigner {
    async fn accounts(&self) -> Result<Vec<Address>, SignerError> {
        Ok(vec![Address("mock-account-0".into())])
    }

    async fn simulate(&self, bundle: CallBundle) -> Result<SimulationOutput, SignerError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SimulationOutput {
            bundle,
            effects: Vec::new(),
            stats: None,
        })
    }

    async fn prove(&self, request: ProvingRequest) -> Result<ProvenTransaction, SignerError> {
        Ok(ProvenTransaction {
            identity: TxIdentity(format!("mock-tx-{}", request.bundle.calls.len())),
            payload: vec![0xaa],
            stats: None,
        })
    }

    async fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationWitness, SignerError> {
        self.authorize_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthorizationWitness {
            account: request.account,
            call_index: request.call_index,
            material: vec![0xbb],
        })
    }

    async fn request_capabilities(
        &self,
        _manifest: CapabilityManifest,
    ) -> Result<CapabilityGrant, SignerError> {
        Ok(CapabilityGrant {
            accounts: vec![Address("mock-account-0".into())],
            can_register: true,
            can_simulate: true,
            can_transact: true,
        })
    }
}

/// A provider with scriptable probe/handshake/disconnect behaviour.
pub(crate) struct MockProvider {
    name: String,
    chain: ChainId,
    available: bool,
    probe_delay: Duration,
    revoke_on_finalize: bool,
    fail_disconnect: bool,
    disconnect_calls: AtomicUsize,
    hook: Mutex<Option<Arc<DisconnectCallback>>>,
}

impl MockProvider {
    pub fn available(name: &str, chain: &str) -> Self {
        Self {
            name: name.to_string(),
            chain: ChainId::parse(chain).expect("test chain id"),
            available: true,
            probe_delay: Duration::ZERO,
            revoke_on_finalize: false,
            fail_disconnect: false,
            disconnect_calls: AtomicUsize::new(0),
            hook: Mutex::new(None),
        }
    }

    pub fn unavailable(name: &str, chain: &str) -> Self {
        let mut provider = Self::available(name, chain);
        provider.available = false;
        provider
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_revoking_channel(mut self) -> Self {
        self.revoke_on_finalize = true;
        self
    }

    pub fn with_failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn backend(&self) -> SignerBackend {
        SignerBackend {
            id: BackendId(self.name.clone()),
            name: format!("{} signer", self.name),
            icon: None,
            chain: self.chain.clone(),
            api_version: "1.0.0".to_string(),
        }
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Simulate the provider losing its connection.
    pub fn fire_disconnect(&self) {
        // Clone the hook out before invoking: the callback may re-enter the
        // provider (the manager drops its guard, which clears the slot).
        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            (*hook)();
        }
    }
}

#[async_trait]
impl BackendProvider for MockProvider {
    async fn probe(&self, chain: &ChainId) -> Option<SignerBackend> {
        if !self.probe_delay.is_zero() {
            tokio::time::sleep(self.probe_delay).await;
        }
        if self.available && *chain == self.chain {
            Some(self.backend())
        } else {
            None
        }
    }

    async fn establish_channel(
        &self,
        _app_id: &str,
    ) -> Result<Box<dyn PendingChannel>, HandshakeError> {
        Ok(Box::new(MockChannel {
            backend_name: self.name.clone(),
            revoke: self.revoke_on_finalize,
        }))
    }

    fn on_disconnect(&self, callback: DisconnectCallback) -> DisconnectGuard {
        // Last registration wins; the mock keeps the hook until replaced.
        *self.hook.lock().unwrap() = Some(Arc::new(callback));
        DisconnectGuard::noop()
    }

    async fn disconnect(&self) -> Result<(), HandshakeError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(HandshakeError::ProviderUnavailable(
                "mock disconnect failure".into(),
            ));
        }
        Ok(())
    }
}

struct MockChannel {
    backend_name: String,
    revoke: bool,
}

#[async_trait]
impl PendingChannel for MockChannel {
    fn secret_hash(&self) -> [u8; 32] {
        MOCK_SECRET_HASH
    }

    async fn finalize(self: Box<Self>) -> Result<Arc<dyn Signer>, HandshakeError> {
        if self.revoke {
            return Err(HandshakeError::Revoked {
                backend: self.backend_name,
            });
        }
        Ok(Arc::new(MockSigner::default()))
    }

    async fn reject(self: Box<Self>) {}
}
