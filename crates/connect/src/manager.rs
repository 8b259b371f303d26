//! Ownership of the single active session.
//!
//! The manager is the only component allowed to write the active-session
//! slot; everything else reads it or asks the manager for a mutation. On an
//! unexpected disconnect of the active external provider the manager
//! restores the embedded session *before* notifying subscribers, so a
//! callback that immediately asks "what is active?" always sees a valid
//! session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use tracing::{debug, info, warn};

use crate::provider::{BackendProvider, DisconnectGuard};
use crate::session::Session;

type DisconnectFn = Arc<dyn Fn() + Send + Sync>;

/// Live link to the connected external provider.
struct ExternalLink {
    provider: Arc<dyn BackendProvider>,
    /// Unregisters our disconnect hook when dropped.
    _guard: DisconnectGuard,
}

/// Owns the active session, the embedded fallback and the disconnect
/// observer registry.
pub struct SessionManager {
    active: RwLock<Session>,
    embedded: Session,
    external: Mutex<Option<ExternalLink>>,
    callbacks: Mutex<HashMap<u64, DisconnectFn>>,
    next_callback_id: AtomicU64,
}

impl SessionManager {
    /// Create a manager with the embedded session active.
    pub fn new(embedded: Session) -> Arc<Self> {
        Arc::new(Self {
            active: RwLock::new(embedded.clone()),
            embedded,
            external: Mutex::new(None),
            callbacks: Mutex::new(HashMap::new()),
            next_callback_id: AtomicU64::new(0),
        })
    }

    /// The currently active session. Never absent once the manager exists.
    pub fn active(&self) -> Session {
        self.active.read().expect("session slot poisoned").clone()
    }

    /// Whether an external session is currently active.
    pub fn is_external_active(&self) -> bool {
        self.active().is_external()
    }

    /// Make a confirmed external session active and hook its provider's
    /// disconnect signal.
    pub fn install_external(
        self: &Arc<Self>,
        session: Session,
        provider: Arc<dyn BackendProvider>,
    ) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let guard = provider.on_disconnect(Box::new(move || {
            if let Some(manager) = weak.upgrade() {
                manager.handle_unexpected_disconnect();
            }
        }));

        *self.external.lock().expect("external lock poisoned") = Some(ExternalLink {
            provider,
            _guard: guard,
        });
        *self.active.write().expect("session slot poisoned") = session;
        info!("external session installed as active");
    }

    /// Gracefully release the current external provider (best effort) and
    /// fall back to the embedded session. Errors are logged, never thrown.
    pub async fn release_external(&self) {
        let link = self.external.lock().expect("external lock poisoned").take();
        let Some(link) = link else {
            return;
        };
        // Dropping the guard unregisters our hook first, so the teardown
        // below is not observed as an unexpected disconnect.
        drop(link._guard);
        *self.active.write().expect("session slot poisoned") = self.embedded.clone();
        if let Err(err) = link.provider.disconnect().await {
            warn!(error = %err, "error disconnecting previous provider (ignored)");
        }
        debug!("external session released, embedded restored");
    }

    /// Register a disconnect observer. Observers are independent; each is
    /// invoked exactly once per unexpected disconnect.
    pub fn on_disconnect(
        self: &Arc<Self>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> DisconnectRegistration {
        let id = self.next_callback_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks
            .lock()
            .expect("callback registry poisoned")
            .insert(id, Arc::new(callback));
        DisconnectRegistration {
            manager: Arc::downgrade(self),
            id,
        }
    }

    /// Unexpected loss of the active external session.
    ///
    /// Order matters: unhook and clear the provider, restore the embedded
    /// session, and only then notify observers.
    fn handle_unexpected_disconnect(&self) {
        let link = self.external.lock().expect("external lock poisoned").take();
        if link.is_none() {
            // Already handled (spurious or duplicate signal).
            return;
        }
        drop(link);
        *self.active.write().expect("session slot poisoned") = self.embedded.clone();
        warn!("external session lost; embedded session restored");

        let observers: Vec<DisconnectFn> = self
            .callbacks
            .lock()
            .expect("callback registry poisoned")
            .values()
            .cloned()
            .collect();
        for observer in observers {
            (*observer)();
        }
    }

    fn remove_callback(&self, id: u64) {
        self.callbacks
            .lock()
            .expect("callback registry poisoned")
            .remove(&id);
    }
}

/// Removable handle for one disconnect observer.
#[derive(Debug)]
pub struct DisconnectRegistration {
    manager: Weak<SessionManager>,
    id: u64,
}

impl DisconnectRegistration {
    /// Remove the observer. Dropping the registration does the same.
    pub fn unsubscribe(self) {}
}

impl Drop for DisconnectRegistration {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.remove_callback(self.id);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active", &self.active())
            .finish_non_exhaustive()
    }
}
