//! The fleet: seeding, ownership, and background metric churn.

use std::sync::Arc;

use fleetwatch_types::{current_timestamp_ms, ConflictKind, Metrics, Node, NodeStatus};
use tracing::info;

use crate::config::FleetConfig;
use crate::error::RegistryError;
use crate::registry::{ActionReceipt, Registry};
use crate::sampler::{MetricSampler, RngSampler};
use crate::transition::{Action, ShutdownPolicy, SEED_BAND, UPTIME_RANGE};

use fleetwatch_types::FleetSnapshot;

#[cfg(feature = "tokio")]
use crate::notify::Subscription;

/// The top-level entry point: owns the registry and drives periodic churn.
///
/// # Example
///
/// ```rust
/// use fleetwatch_core::{Fleet, NodeStatus};
///
/// let fleet = Fleet::builder()
///     .node_count(20)
///     .conflict_count(2)
///     .build()
///     .expect("default config is valid");
///
/// let snapshot = fleet.snapshot();
/// assert_eq!(snapshot.len(), 20);
/// assert_eq!(snapshot.status_count(NodeStatus::Conflict), 2);
/// ```
#[derive(Debug)]
pub struct Fleet {
    registry: Arc<Registry>,
    config: FleetConfig,
}

impl Fleet {
    /// Create a builder over the default 20-seat configuration.
    pub fn builder() -> FleetBuilder {
        FleetBuilder::default()
    }

    /// The registry, shareable across tasks.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// The configuration this fleet was seeded with.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Ordered snapshot of every node. See [`Registry::list`].
    pub fn list(&self) -> Vec<Node> {
        self.registry.list()
    }

    /// Ordered, timestamped snapshot of the whole fleet.
    pub fn snapshot(&self) -> FleetSnapshot {
        self.registry.snapshot()
    }

    /// Apply an action to one node. See [`Registry::apply_action`].
    pub fn apply_action(&self, id: &str, action: Action) -> Result<ActionReceipt, RegistryError> {
        self.registry.apply_action(id, action)
    }

    /// Apply an action by wire name. See [`Registry::apply_action_named`].
    pub fn apply_action_named(
        &self,
        id: &str,
        action: &str,
    ) -> Result<ActionReceipt, RegistryError> {
        self.registry.apply_action_named(id, action)
    }

    /// Refresh metrics across the fleet. See [`Registry::refresh_all`].
    pub fn refresh_all(&self) -> FleetSnapshot {
        self.registry.refresh_all()
    }

    /// Attach an observer session. See [`Registry::subscribe`].
    #[cfg(feature = "tokio")]
    pub fn subscribe(&self) -> Subscription {
        self.registry.subscribe()
    }

    /// Start background metric churn.
    ///
    /// Spawns a tokio task that calls `refresh_all()` on the configured
    /// interval. Returns a handle that stops the churn when told to (or when
    /// dropped).
    #[cfg(feature = "tokio")]
    pub fn start(&self) -> ChurnHandle {
        use tokio::sync::watch;

        let (stop_tx, stop_rx) = watch::channel(false);
        let registry = self.registry();
        let interval = self.config.churn_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so churn starts one
            // interval after `start()`.
            ticker.tick().await;
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = registry.refresh_all();
                    }
                    changed = stop_rx.changed() => {
                        // A closed channel means the handle was dropped;
                        // treat it the same as an explicit stop.
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        ChurnHandle { stop_tx }
    }
}

/// Handle for controlling background churn.
///
/// Drop this handle to stop churn, or call `stop()` explicitly.
#[cfg(feature = "tokio")]
pub struct ChurnHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
}

#[cfg(feature = "tokio")]
impl ChurnHandle {
    /// Stop background churn.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Builder for configuring and seeding a [`Fleet`].
#[derive(Default)]
pub struct FleetBuilder {
    config: FleetConfig,
    sampler: Option<Arc<dyn MetricSampler>>,
}

impl FleetBuilder {
    /// Set the total node count.
    pub fn node_count(mut self, count: usize) -> Self {
        self.config.node_count = count;
        self
    }

    /// Set how many nodes seed as `InUse`.
    pub fn in_use_count(mut self, count: usize) -> Self {
        self.config.in_use_count = count;
        self
    }

    /// Set how many nodes seed as `Conflict`.
    pub fn conflict_count(mut self, count: usize) -> Self {
        self.config.conflict_count = count;
        self
    }

    /// Set how many nodes seed as `Backup`.
    pub fn backup_count(mut self, count: usize) -> Self {
        self.config.backup_count = count;
        self
    }

    /// Set the id prefix.
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.id_prefix = prefix.into();
        self
    }

    /// Set the seats per row for generated locations.
    pub fn seats_per_row(mut self, seats: usize) -> Self {
        self.config.seats_per_row = seats;
        self
    }

    /// Set the OS labels drawn at seed time.
    pub fn os_labels(mut self, labels: Vec<String>) -> Self {
        self.config.os_labels = labels;
        self
    }

    /// Set the seed-time remote session probability.
    pub fn remote_chance(mut self, chance: f64) -> Self {
        self.config.remote_chance = chance;
        self
    }

    /// Set the background refresh interval.
    pub fn churn_interval(mut self, interval: std::time::Duration) -> Self {
        self.config.churn_interval = interval;
        self
    }

    /// Set the per-subscriber event queue depth.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the shutdown policy.
    pub fn shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.config.shutdown_policy = policy;
        self
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: FleetConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a metric sampler. Defaults to the thread-local RNG; tests pass
    /// a deterministic sampler here.
    pub fn sampler(mut self, sampler: Arc<dyn MetricSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Validate the configuration, seed the population, and build the fleet.
    pub fn build(self) -> Result<Fleet, RegistryError> {
        self.config.validate()?;

        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(RngSampler) as Arc<dyn MetricSampler>);
        let nodes = seed_nodes(&self.config, sampler.as_ref());
        let registry = Registry::new(
            nodes,
            sampler,
            self.config.shutdown_policy,
            self.config.channel_capacity,
        )?;

        info!(
            nodes = self.config.node_count,
            conflicts = self.config.conflict_count,
            "fleet seeded"
        );

        Ok(Fleet {
            registry: Arc::new(registry),
            config: self.config,
        })
    }
}

impl std::fmt::Debug for FleetBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetBuilder")
            .field("config", &self.config)
            .finish()
    }
}

/// Build the seed population: contiguous status blocks in the order
/// active, in-use, conflict, backup, with deterministic ids and locations
/// and sampled initial load.
fn seed_nodes(config: &FleetConfig, sampler: &dyn MetricSampler) -> Vec<Node> {
    let width = digits(config.node_count);
    let mut nodes = Vec::with_capacity(config.node_count);

    let active_end = config.active_count();
    let in_use_end = active_end + config.in_use_count;
    let conflict_end = in_use_end + config.conflict_count;
    let backup_end = conflict_end + config.backup_count;

    for position in 0..config.node_count {
        let status = if position < active_end {
            NodeStatus::Active
        } else if position < in_use_end {
            NodeStatus::InUse
        } else if position < conflict_end {
            NodeStatus::Conflict
        } else if position < backup_end {
            NodeStatus::Backup
        } else {
            NodeStatus::Inactive
        };

        let seat = position % config.seats_per_row + 1;
        let row = position / config.seats_per_row + 1;

        let mut node = Node::new(
            format!("{}{:0width$}", config.id_prefix, position + 1),
            status,
            SEED_BAND.sample(sampler),
            format!("Row-{row}, Seat-{seat}"),
        );

        if status == NodeStatus::Conflict {
            node.conflict_kind = Some(if sampler.chance(0.5) {
                ConflictKind::Hardware
            } else {
                ConflictKind::Software
            });
        }
        if status.supports_remote() {
            node.remote_active = sampler.chance(config.remote_chance);
        }
        if status == NodeStatus::Inactive {
            node.metrics = Metrics::zero();
        } else {
            node.uptime_hours = sampler.sample(UPTIME_RANGE.0, UPTIME_RANGE.1) as u32;
        }

        // validate() caps os_labels at 256, so the index fits a u8.
        let pick = sampler.sample(0, (config.os_labels.len() - 1) as u8) as usize;
        node.os_version = config.os_labels[pick].clone();

        node.last_updated_ms = current_timestamp_ms();
        nodes.push(node);
    }

    nodes
}

/// Zero-pad width for ids: at least two digits, more for larger fleets.
fn digits(count: usize) -> usize {
    let mut width = 1;
    let mut n = count;
    while n >= 10 {
        width += 1;
        n /= 10;
    }
    width.max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::FixedSampler;
    use crate::transition::LOW_BAND;

    fn deterministic_fleet() -> Fleet {
        Fleet::builder()
            .sampler(Arc::new(FixedSampler::low()))
            .build()
            .unwrap()
    }

    #[test]
    fn default_seed_matches_the_lab_layout() {
        let fleet = deterministic_fleet();
        let snapshot = fleet.snapshot();

        assert_eq!(snapshot.len(), 20);
        assert_eq!(snapshot.status_count(NodeStatus::Active), 10);
        assert_eq!(snapshot.status_count(NodeStatus::InUse), 7);
        assert_eq!(snapshot.status_count(NodeStatus::Conflict), 2);
        assert_eq!(snapshot.status_count(NodeStatus::Backup), 1);
        assert_eq!(snapshot.status_count(NodeStatus::Inactive), 0);

        // Ids and locations are deterministic.
        let first = snapshot.get("PC-01").unwrap();
        assert_eq!(first.location, "Row-1, Seat-1");
        let sixth = snapshot.get("PC-06").unwrap();
        assert_eq!(sixth.location, "Row-2, Seat-1");
        let last = snapshot.get("PC-20").unwrap();
        assert_eq!(last.location, "Row-4, Seat-5");
        assert_eq!(last.status, NodeStatus::Backup);
    }

    #[test]
    fn every_seeded_node_is_consistent() {
        let fleet = Fleet::builder().build().unwrap();
        for node in fleet.list() {
            assert!(node.is_consistent(), "{}", node.id);
            assert!(!node.os_version.is_empty());
            assert!(node.last_updated_ms > 0);
        }
    }

    #[test]
    fn seeded_conflicts_carry_a_kind() {
        let fleet = Fleet::builder().build().unwrap();
        let conflicted: Vec<Node> = fleet
            .list()
            .into_iter()
            .filter(|n| n.status == NodeStatus::Conflict)
            .collect();
        assert_eq!(conflicted.len(), 2);
        for node in conflicted {
            assert!(node.conflict_kind.is_some());
        }
    }

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let err = Fleet::builder()
            .node_count(2)
            .in_use_count(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfig(_)));
    }

    #[test]
    fn large_fleets_widen_the_id_padding() {
        let fleet = Fleet::builder()
            .node_count(120)
            .in_use_count(0)
            .conflict_count(0)
            .backup_count(0)
            .build()
            .unwrap();
        let nodes = fleet.list();
        assert_eq!(nodes[0].id, "PC-001");
        assert_eq!(nodes[119].id, "PC-120");
    }

    #[test]
    fn resolve_scenario_from_the_seeded_lab() {
        let fleet = deterministic_fleet();

        // PC-05 seeds as active, so resolve must be rejected.
        let err = fleet.apply_action_named("PC-05", "resolve").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidTransition { .. }));

        // Resolving an actual conflict node succeeds.
        let conflict_id = fleet
            .list()
            .into_iter()
            .find(|n| n.status == NodeStatus::Conflict)
            .map(|n| n.id)
            .unwrap();
        let receipt = fleet.apply_action_named(&conflict_id, "resolve").unwrap();
        assert_eq!(receipt.node.status, NodeStatus::Active);
        assert_eq!(receipt.node.conflict_kind, None);
        assert!(LOW_BAND.contains(receipt.node.metrics));
    }

    #[cfg(feature = "tokio")]
    mod churn {
        use super::*;
        use std::time::Duration;

        #[tokio::test(start_paused = true)]
        async fn churn_emits_full_refresh_each_interval() {
            let fleet = Fleet::builder()
                .sampler(Arc::new(FixedSampler::low()))
                .churn_interval(Duration::from_secs(1))
                .build()
                .unwrap();

            let mut sub = fleet.subscribe();
            assert!(sub.recv().await.unwrap().is_full_refresh());

            let churn = fleet.start();

            tokio::time::advance(Duration::from_millis(1100)).await;
            let event = sub.recv().await.unwrap();
            assert!(event.is_full_refresh());
            assert_eq!(event.snapshot().unwrap().len(), 20);

            churn.stop();
        }

        #[tokio::test(start_paused = true)]
        async fn stopped_churn_emits_nothing_further() {
            let fleet = Fleet::builder()
                .sampler(Arc::new(FixedSampler::low()))
                .churn_interval(Duration::from_secs(1))
                .build()
                .unwrap();

            let mut sub = fleet.subscribe();
            assert!(sub.recv().await.unwrap().is_full_refresh());

            let churn = fleet.start();
            churn.stop();

            // Give the churn task a chance to observe the stop signal.
            tokio::task::yield_now().await;
            tokio::time::advance(Duration::from_secs(5)).await;
            tokio::task::yield_now().await;

            assert!(sub.try_recv().is_none());
        }
    }
}
