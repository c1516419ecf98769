//! Fleet configuration: seed population shape and runtime knobs.

use std::time::Duration;

use crate::error::RegistryError;
use crate::transition::ShutdownPolicy;

/// Configuration for seeding and running a fleet.
///
/// Defaults describe a 20-seat lab: ten active machines, seven in use, two
/// in conflict, one backup, ids `PC-01..PC-20` laid out five seats per row.
/// Construct through [`Fleet::builder`](crate::Fleet::builder).
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Total number of nodes; fixed for the process lifetime.
    pub node_count: usize,
    /// Nodes seeded as `InUse`.
    pub in_use_count: usize,
    /// Nodes seeded as `Conflict` (each gets a random conflict kind).
    pub conflict_count: usize,
    /// Nodes seeded as `Backup`.
    pub backup_count: usize,
    /// Id prefix; ids are `{prefix}{NN}` with zero-padded positions.
    pub id_prefix: String,
    /// Seats per row for the generated location tokens.
    pub seats_per_row: usize,
    /// OS labels drawn at random per node at seed time. At most 256 labels;
    /// `validate()` rejects larger sets.
    pub os_labels: Vec<String>,
    /// Probability that a running node is seeded with a remote session.
    pub remote_chance: f64,
    /// Interval between background refresh passes.
    pub churn_interval: Duration,
    /// Per-subscriber event queue depth.
    pub channel_capacity: usize,
    /// What `shutdown` does to a node's status.
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            node_count: 20,
            in_use_count: 7,
            conflict_count: 2,
            backup_count: 1,
            id_prefix: "PC-".to_string(),
            seats_per_row: 5,
            os_labels: vec!["Windows 10 Pro".to_string(), "Windows 11 Pro".to_string()],
            remote_chance: 0.3,
            churn_interval: Duration::from_secs(1),
            channel_capacity: 64,
            shutdown_policy: ShutdownPolicy::PowerOff,
        }
    }
}

impl FleetConfig {
    /// Nodes seeded as `Active`: whatever the other statuses leave over.
    pub fn active_count(&self) -> usize {
        self.node_count
            .saturating_sub(self.in_use_count + self.conflict_count + self.backup_count)
    }

    /// Check that the configuration can produce a valid seed population.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.node_count == 0 {
            return Err(RegistryError::InvalidConfig(
                "node_count must be at least 1".to_string(),
            ));
        }
        let reserved = self.in_use_count + self.conflict_count + self.backup_count;
        if reserved > self.node_count {
            return Err(RegistryError::InvalidConfig(format!(
                "in_use + conflict + backup ({reserved}) exceeds node_count ({})",
                self.node_count
            )));
        }
        if self.seats_per_row == 0 {
            return Err(RegistryError::InvalidConfig(
                "seats_per_row must be at least 1".to_string(),
            ));
        }
        if self.os_labels.is_empty() {
            return Err(RegistryError::InvalidConfig(
                "at least one os label is required".to_string(),
            ));
        }
        if self.os_labels.len() > 256 {
            return Err(RegistryError::InvalidConfig(format!(
                "at most 256 os labels are supported, got {}",
                self.os_labels.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_describes_the_twenty_seat_lab() {
        let config = FleetConfig::default();
        assert_eq!(config.node_count, 20);
        assert_eq!(config.active_count(), 10);
        assert_eq!(config.in_use_count, 7);
        assert_eq!(config.conflict_count, 2);
        assert_eq!(config.backup_count, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn over_allocated_statuses_fail_validation() {
        let config = FleetConfig {
            node_count: 3,
            in_use_count: 2,
            conflict_count: 2,
            ..FleetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RegistryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_nodes_fail_validation() {
        let config = FleetConfig {
            node_count: 0,
            in_use_count: 0,
            conflict_count: 0,
            backup_count: 0,
            ..FleetConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_os_labels_fail_validation() {
        let config = FleetConfig {
            os_labels: vec![],
            ..FleetConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn too_many_os_labels_fail_validation() {
        let at_cap = FleetConfig {
            os_labels: (0..256).map(|i| format!("OS {i}")).collect(),
            ..FleetConfig::default()
        };
        assert!(at_cap.validate().is_ok());

        let over_cap = FleetConfig {
            os_labels: (0..257).map(|i| format!("OS {i}")).collect(),
            ..FleetConfig::default()
        };
        assert!(matches!(
            over_cap.validate(),
            Err(RegistryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn active_count_saturates_instead_of_underflowing() {
        let config = FleetConfig {
            node_count: 1,
            in_use_count: 5,
            ..FleetConfig::default()
        };
        assert_eq!(config.active_count(), 0);
    }
}
