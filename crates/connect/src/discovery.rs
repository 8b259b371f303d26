//! Bounded, incremental, cancellable enumeration of signer backends.
//!
//! Each installed provider is probed concurrently; results surface on the
//! session's channel as soon as each provider answers, so a selection UI can
//! grow its list instead of waiting for the full timeout. At most one
//! discovery session is authoritative at a time: starting a new one cancels
//! the previous session synchronously, before any new probe task runs.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

use common::{ChainId, DiscoveryError};

use crate::provider::{BackendProvider, SignerBackend};

/// Buffer for incremental results. Providers are few; a small bound keeps
/// backpressure trivial.
const RESULT_BUFFER: usize = 16;

/// Shared cancellation state of one discovery session.
struct SessionHandle {
    generation: u64,
    cancelled: Arc<AtomicBool>,
    aborts: Vec<AbortHandle>,
}

impl SessionHandle {
    /// Stop further enumeration. Idempotent; already-finished tasks are
    /// unaffected.
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for abort in &self.aborts {
            abort.abort();
        }
        debug!(generation = self.generation, "discovery session cancelled");
    }
}

/// Entry point for backend discovery.
pub struct Discovery {
    providers: Vec<Arc<dyn BackendProvider>>,
    current: Mutex<Option<Arc<SessionHandle>>>,
    generation: AtomicU64,
}

impl Discovery {
    pub fn new(providers: Vec<Arc<dyn BackendProvider>>) -> Self {
        Self {
            providers,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Start enumerating backends that serve `chain_identity`, bounded by
    /// `timeout`.
    ///
    /// A malformed chain identity is a hard error; discovery never starts.
    /// Finding nothing before the timeout is a normal, empty completion.
    /// Any previously running session is cancelled before this one produces
    /// its first result.
    pub fn discover(
        &self,
        chain_identity: &str,
        timeout: Duration,
    ) -> Result<DiscoverySession, DiscoveryError> {
        let chain = ChainId::parse(chain_identity)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        let (results_tx, results_rx) = mpsc::channel(RESULT_BUFFER);

        let mut current = self.current.lock().expect("discovery lock poisoned");
        // Supersede: the old session must stop before the new one starts
        // producing.
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        let mut aborts = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let chain = chain.clone();
            let results_tx = results_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let task = tokio::spawn(async move {
                let probe = tokio::time::timeout(timeout, provider.probe(&chain)).await;
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
                match probe {
                    Ok(Some(backend)) => {
                        trace!(backend = %backend.id, "discovery probe answered");
                        let _ = results_tx.send(backend).await;
                    }
                    Ok(None) => trace!("discovery probe declined"),
                    Err(_) => trace!("discovery probe timed out"),
                }
            });
            aborts.push(task.abort_handle());
        }
        drop(results_tx);

        let handle = Arc::new(SessionHandle {
            generation,
            cancelled,
            aborts,
        });
        *current = Some(Arc::clone(&handle));
        debug!(
            generation,
            chain = %chain,
            providers = self.providers.len(),
            timeout_ms = timeout.as_millis() as u64,
            "discovery session started"
        );

        Ok(DiscoverySession {
            results: results_rx,
            handle,
        })
    }
}

/// One open enumeration of signer backends.
///
/// Finite and not restartable: a new [`Discovery::discover`] call starts a
/// new enumeration (and invalidates this one).
pub struct DiscoverySession {
    results: mpsc::Receiver<SignerBackend>,
    handle: Arc<SessionHandle>,
}

impl DiscoverySession {
    /// Next discovered backend, or `None` when enumeration has completed,
    /// been cancelled or been superseded.
    pub async fn next(&mut self) -> Option<SignerBackend> {
        if self.handle.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        let backend = self.results.recv().await?;
        if self.handle.cancelled.load(Ordering::SeqCst) {
            // Buffered result from before cancellation; do not deliver.
            return None;
        }
        Some(backend)
    }

    /// Drain the whole enumeration.
    pub async fn collect_all(mut self) -> Vec<SignerBackend> {
        let mut backends = Vec::new();
        while let Some(backend) = self.next().await {
            backends.push(backend);
        }
        backends
    }

    /// Stop further enumeration. Safe to call at any time, including after
    /// natural completion.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Consume the session into a `Stream` of backends.
    pub fn into_stream(self) -> ReceiverStream<SignerBackend> {
        ReceiverStream::new(self.results)
    }
}
