//! Multi-subscriber event bus for transaction progress.
//!
//! No business logic lives here: the broadcaster fans every event out to
//! every live subscriber and drops subscribers whose receiver is gone.
//! Emission never blocks the pipeline (unbounded per-subscriber queues).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::trace;

use crate::events::TxProgressEvent;

#[derive(Default)]
struct Registry {
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<TxProgressEvent>>>,
    next_id: AtomicU64,
}

/// Fan-out bus for [`TxProgressEvent`]s. Cheap to clone.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    registry: Arc<Registry>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Every subscriber receives every event emitted
    /// after subscription, in emission order.
    pub fn subscribe(&self) -> ProgressSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        self.registry
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, tx);
        ProgressSubscription {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&self, event: TxProgressEvent) {
        let mut subscribers = self
            .registry
            .subscribers
            .lock()
            .expect("subscriber registry poisoned");
        trace!(
            tx_id = %event.tx_id,
            phase = %event.phase,
            subscribers = subscribers.len(),
            "progress event"
        );
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers (for diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }
}

/// One subscriber's end of the bus. Dropping it unsubscribes.
pub struct ProgressSubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<TxProgressEvent>,
    registry: std::sync::Weak<Registry>,
}

impl ProgressSubscription {
    /// Next event, or `None` once unsubscribed with no events left.
    pub async fn next(&mut self) -> Option<TxProgressEvent> {
        self.rx.recv().await
    }

    /// Drain whatever has been delivered so far without waiting.
    pub fn drain_ready(&mut self) -> Vec<TxProgressEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn unregister(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .subscribers
                .lock()
                .expect("subscriber registry poisoned")
                .remove(&self.id);
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn event(phase: crate::events::TxPhase) -> TxProgressEvent {
        TxProgressEvent {
            tx_id: Uuid::new_v4(),
            phase,
            started_at: Utc::now(),
            durations_ms: BTreeMap::new(),
            breakdowns: Vec::new(),
            error: None,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_every_event() {
        let bus = ProgressBroadcaster::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(event(crate::events::TxPhase::Simulating));
        bus.emit(event(crate::events::TxPhase::Proving));

        assert_eq!(a.drain_ready().len(), 2);
        assert_eq!(b.drain_ready().len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = ProgressBroadcaster::new();
        let a = bus.subscribe();
        let _b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(a);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_emit_with_no_subscribers_is_fine() {
        let bus = ProgressBroadcaster::new();
        bus.emit(event(crate::events::TxPhase::Complete));
    }
}
