//! Change fan-out to observer sessions.
//!
//! The notifier keeps an explicit subscriber registry: each subscription is a
//! first-class handle with its own bounded queue and lifetime, decoupling
//! broadcast from any specific transport. Delivery is best-effort and
//! fire-and-forget; a commit never waits on an observer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fleetwatch_types::ChangeEvent;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Subscribers {
    senders: RwLock<BTreeMap<u64, mpsc::Sender<ChangeEvent>>>,
    next_id: AtomicU64,
}

/// Fan-out point for committed changes.
///
/// The registry calls [`Notifier::broadcast`] exactly once per commit, after
/// the commit; subscribers receive events in commit order. Observers that
/// disconnect are pruned silently, and a full queue drops that subscriber's
/// event rather than blocking the commit.
#[derive(Debug, Clone)]
pub struct Notifier {
    subscribers: Arc<Subscribers>,
    capacity: usize,
}

impl Notifier {
    /// Create a notifier whose subscriptions buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Subscribers::default()),
            capacity: capacity.max(1),
        }
    }

    /// Register a new observer session and return its handle.
    ///
    /// The subscription unregisters itself when dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.senders.write().insert(id, tx);
        debug!(subscriber = id, "observer attached");

        Subscription {
            id,
            rx,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    /// Deliver an event to every current subscriber, best effort.
    pub fn broadcast(&self, event: &ChangeEvent) {
        let mut dead = Vec::new();
        {
            let senders = self.subscribers.senders.read();
            for (id, tx) in senders.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(subscriber = *id, "subscriber queue full, event dropped");
                    }
                    Err(TrySendError::Closed(_)) => dead.push(*id),
                }
            }
        }
        if !dead.is_empty() {
            let mut senders = self.subscribers.senders.write();
            for id in dead {
                senders.remove(&id);
                debug!(subscriber = id, "pruned disconnected observer");
            }
        }
    }

    /// Deliver an event to one subscriber only, best effort. Used for the
    /// attach-time resync snapshot.
    pub(crate) fn send_to(&self, id: u64, event: ChangeEvent) {
        let senders = self.subscribers.senders.read();
        if let Some(tx) = senders.get(&id) {
            let _ = tx.try_send(event);
        }
    }

    /// Number of currently attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.senders.read().len()
    }
}

/// One observer session's receiving end.
///
/// Events arrive in commit order. Missed events are never replayed; an
/// observer that falls behind resynchronizes from the next `FullRefresh`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<ChangeEvent>,
    subscribers: Arc<Subscribers>,
}

impl Subscription {
    /// The subscriber id, unique for the notifier's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event, or `None` once detached with the queue drained.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Receive without waiting, if an event is already queued.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.subscribers.senders.write().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetwatch_types::{FleetSnapshot, Metrics, Node, NodeStatus};

    fn node_event(id: &str) -> ChangeEvent {
        ChangeEvent::NodeChanged(Node::new(
            id,
            NodeStatus::Active,
            Metrics::new(25, 40, 20),
            "Row-1, Seat-1",
        ))
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event_in_order() {
        let notifier = Notifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.broadcast(&node_event("PC-01"));
        notifier.broadcast(&node_event("PC-02"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await.unwrap().node().unwrap().id, "PC-01");
            assert_eq!(sub.recv().await.unwrap().node().unwrap().id, "PC-02");
        }
    }

    #[tokio::test]
    async fn dropped_subscription_unregisters() {
        let notifier = Notifier::new(8);
        let a = notifier.subscribe();
        let _b = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        drop(a);
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_prunes_closed_receivers() {
        let notifier = Notifier::new(8);
        let mut sub = notifier.subscribe();
        // Close the receiving side without dropping the handle.
        sub.rx.close();

        notifier.broadcast(&node_event("PC-01"));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_never_blocks_broadcast() {
        let notifier = Notifier::new(1);
        let mut sub = notifier.subscribe();

        // Second event overflows the queue and is dropped, not awaited.
        notifier.broadcast(&node_event("PC-01"));
        notifier.broadcast(&node_event("PC-02"));

        assert_eq!(sub.recv().await.unwrap().node().unwrap().id, "PC-01");
        assert!(sub.try_recv().is_none());
        // The slow subscriber is still attached.
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_with_no_subscribers_is_a_no_op() {
        let notifier = Notifier::new(8);
        notifier.broadcast(&node_event("PC-01"));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn send_to_reaches_only_the_target() {
        let notifier = Notifier::new(8);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        let resync = ChangeEvent::FullRefresh(FleetSnapshot::with_timestamp(0, vec![]));
        notifier.send_to(a.id(), resync);

        assert!(a.try_recv().unwrap().is_full_refresh());
        assert!(b.try_recv().is_none());
    }
}
