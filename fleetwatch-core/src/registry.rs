//! The authoritative register of nodes.
//!
//! The registry owns the node collection exclusively behind a single lock.
//! Reads hand out cloned snapshots; writes (action application, bulk refresh)
//! serialize through the write lock, so no observer ever sees a node mid
//! mutation. Every committed change emits exactly one event, after commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use fleetwatch_types::{current_timestamp_ms, FleetSnapshot, Metrics, Node, NodeStatus};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::RegistryError;
use crate::sampler::MetricSampler;
use crate::transition::{decide, Action, ShutdownPolicy, AMBIENT_BAND, UPTIME_RANGE};

#[cfg(feature = "tokio")]
use crate::notify::{Notifier, Subscription};
#[cfg(feature = "tokio")]
use fleetwatch_types::ChangeEvent;

/// A committed action: the post-commit node plus a human-readable message.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReceipt {
    pub node: Node,
    pub message: String,
}

struct Inner {
    /// Seed-ordered; the count never changes after construction.
    nodes: Vec<Node>,
    /// Id -> position in `nodes`. Ids are immutable, so this never changes.
    index: BTreeMap<String, usize>,
}

/// The single source of truth for fleet state.
pub struct Registry {
    inner: RwLock<Inner>,
    sampler: Arc<dyn MetricSampler>,
    policy: ShutdownPolicy,
    #[cfg(feature = "tokio")]
    notifier: Notifier,
}

impl Registry {
    /// Build a registry over a seed population.
    ///
    /// Fails with [`RegistryError::DuplicateId`] if two nodes share an id,
    /// or [`RegistryError::InconsistentNode`] if a seed violates the
    /// per-node invariants. The invariants must hold after every commit,
    /// including the initial one, so a broken seed is fatal here rather than
    /// silently repaired by the first action.
    pub fn new(
        nodes: Vec<Node>,
        sampler: Arc<dyn MetricSampler>,
        policy: ShutdownPolicy,
        channel_capacity: usize,
    ) -> Result<Self, RegistryError> {
        let mut index = BTreeMap::new();
        for (position, node) in nodes.iter().enumerate() {
            if !node.is_consistent() {
                return Err(RegistryError::InconsistentNode {
                    id: node.id.clone(),
                });
            }
            if index.insert(node.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateId {
                    id: node.id.clone(),
                });
            }
        }

        #[cfg(not(feature = "tokio"))]
        let _ = channel_capacity;

        Ok(Self {
            inner: RwLock::new(Inner { nodes, index }),
            sampler,
            policy,
            #[cfg(feature = "tokio")]
            notifier: Notifier::new(channel_capacity),
        })
    }

    /// Ordered snapshot of every node, as of the call.
    pub fn list(&self) -> Vec<Node> {
        self.inner.read().nodes.clone()
    }

    /// Ordered, timestamped snapshot of the whole fleet.
    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot::from_nodes(self.list())
    }

    /// Snapshot of one node.
    pub fn get(&self, id: &str) -> Result<Node, RegistryError> {
        let inner = self.inner.read();
        match inner.index.get(id) {
            Some(&position) => Ok(inner.nodes[position].clone()),
            None => Err(RegistryError::not_found(id)),
        }
    }

    /// Number of nodes; fixed at seed time.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Whether the registry holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The shutdown policy this registry was built with.
    pub fn shutdown_policy(&self) -> ShutdownPolicy {
        self.policy
    }

    /// Apply a named action to one node.
    ///
    /// Validation happens before any field is written: on error the node is
    /// untouched and no event is emitted. On success the whole delta commits
    /// atomically under the write lock, `last_updated_ms` is stamped, and
    /// exactly one `NodeChanged` event carries the post-commit snapshot.
    pub fn apply_action(&self, id: &str, action: Action) -> Result<ActionReceipt, RegistryError> {
        let (committed, message) = {
            let mut inner = self.inner.write();
            let position = *inner
                .index
                .get(id)
                .ok_or_else(|| RegistryError::not_found(id))?;

            let outcome = decide(&inner.nodes[position], action, self.policy)?;

            let node = &mut inner.nodes[position];
            outcome.apply(node, self.sampler.as_ref());
            node.last_updated_ms = current_timestamp_ms();

            debug_assert!(node.is_consistent());
            let committed = node.clone();

            // Enqueue while still holding the lock so subscribers see events
            // in commit order; try_send keeps this non-blocking.
            #[cfg(feature = "tokio")]
            self.notifier
                .broadcast(&ChangeEvent::NodeChanged(committed.clone()));

            (committed, outcome.message)
        };

        debug!(
            node = %committed.id,
            action = %action,
            status = %committed.status,
            "action committed"
        );

        Ok(ActionReceipt {
            node: committed,
            message,
        })
    }

    /// Apply an action given its wire name.
    ///
    /// An unrecognized name is an [`RegistryError::InvalidTransition`], after
    /// the node lookup (a missing node is still `NotFound`).
    pub fn apply_action_named(
        &self,
        id: &str,
        action: &str,
    ) -> Result<ActionReceipt, RegistryError> {
        match action.parse::<Action>() {
            Ok(parsed) => self.apply_action(id, parsed),
            Err(_) => {
                let node = self.get(id)?;
                Err(RegistryError::invalid_transition(action, node.status))
            }
        }
    }

    /// Regenerate metrics across the fleet.
    ///
    /// `Backup` and `Conflict` nodes are left entirely untouched. `Inactive`
    /// nodes get their metrics forced to zero. Running nodes (`Active`,
    /// `InUse`) get fresh ambient-band metrics and a re-rolled simulated
    /// uptime. Statuses never change. Always succeeds and emits exactly one
    /// `FullRefresh` event.
    pub fn refresh_all(&self) -> FleetSnapshot {
        let snapshot = {
            let mut inner = self.inner.write();
            let now = current_timestamp_ms();

            for node in &mut inner.nodes {
                match node.status {
                    NodeStatus::Backup | NodeStatus::Conflict => {}
                    NodeStatus::Inactive => {
                        node.metrics = Metrics::zero();
                        node.last_updated_ms = now;
                    }
                    NodeStatus::Active | NodeStatus::InUse => {
                        node.metrics = AMBIENT_BAND.sample(self.sampler.as_ref());
                        node.uptime_hours =
                            self.sampler.sample(UPTIME_RANGE.0, UPTIME_RANGE.1) as u32;
                        node.last_updated_ms = now;
                    }
                }
                debug_assert!(node.is_consistent());
            }

            let snapshot = FleetSnapshot::with_timestamp(now, inner.nodes.clone());

            #[cfg(feature = "tokio")]
            self.notifier
                .broadcast(&ChangeEvent::FullRefresh(snapshot.clone()));

            snapshot
        };

        trace!(nodes = snapshot.len(), "fleet refreshed");

        snapshot
    }

    /// Attach an observer session.
    ///
    /// The new subscription immediately receives a `FullRefresh` carrying the
    /// current fleet, then every subsequent commit in order. Missed events
    /// are never replayed.
    #[cfg(feature = "tokio")]
    pub fn subscribe(&self) -> Subscription {
        let subscription = self.notifier.subscribe();
        self.notifier
            .send_to(subscription.id(), ChangeEvent::FullRefresh(self.snapshot()));
        subscription
    }

    /// Number of currently attached observers.
    #[cfg(feature = "tokio")]
    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}
