//! The transition engine: pure decision logic for node actions.
//!
//! Every legal (status, action) pair lives in one table-shaped function,
//! [`decide`], which maps a node's current state and a requested action to a
//! declarative [`Outcome`] or rejects it. The engine performs no I/O and
//! touches no shared state; the registry owns applying the outcome.

use std::fmt;
use std::str::FromStr;

use fleetwatch_types::{Metrics, Node, NodeStatus};

use crate::error::RegistryError;
use crate::sampler::MetricSampler;

/// Inclusive sampling ranges for one metric triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub cpu: (u8, u8),
    pub ram: (u8, u8),
    pub disk: (u8, u8),
}

impl Band {
    /// Sample a metric triple from this band.
    pub fn sample(&self, sampler: &dyn MetricSampler) -> Metrics {
        Metrics::new(
            sampler.sample(self.cpu.0, self.cpu.1),
            sampler.sample(self.ram.0, self.ram.1),
            sampler.sample(self.disk.0, self.disk.1),
        )
    }

    /// Whether a metric triple could have been sampled from this band.
    pub fn contains(&self, metrics: Metrics) -> bool {
        (self.cpu.0..=self.cpu.1).contains(&metrics.cpu)
            && (self.ram.0..=self.ram.1).contains(&metrics.ram)
            && (self.disk.0..=self.disk.1).contains(&metrics.disk)
    }
}

/// Load after a restart, resolve, or release: a freshly idle machine.
pub const LOW_BAND: Band = Band {
    cpu: (10, 40),
    ram: (20, 60),
    disk: (10, 30),
};

/// Load while assigned to a user session.
pub const HIGH_BAND: Band = Band {
    cpu: (40, 80),
    ram: (50, 90),
    disk: (20, 50),
};

/// Background churn applied by bulk refresh to running nodes.
pub const AMBIENT_BAND: Band = Band {
    cpu: (20, 80),
    ram: (20, 90),
    disk: (15, 55),
};

/// Initial load assigned when the fleet is seeded.
pub const SEED_BAND: Band = Band {
    cpu: (20, 60),
    ram: (30, 80),
    disk: (15, 45),
};

/// Simulated uptime range (hours) for seeding and refresh churn.
pub(crate) const UPTIME_RANGE: (u8, u8) = (1, 72);

/// A named action requested against one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Power-cycle the node; always lands in `Active`.
    Restart,
    /// Power the node down (policy decides the resulting status).
    Shutdown,
    /// Toggle the remote session on a running node.
    Remote,
    /// Clear a conflict and return the node to `Active`.
    Resolve,
    /// Hand an `Active` node to a user session.
    Assign,
    /// Take an `InUse` node back from its user session.
    Release,
}

impl Action {
    /// The wire name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Restart => "restart",
            Action::Shutdown => "shutdown",
            Action::Remote => "remote",
            Action::Resolve => "resolve",
            Action::Assign => "assign",
            Action::Release => "release",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action name that is not in the closed action set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restart" => Ok(Action::Restart),
            "shutdown" => Ok(Action::Shutdown),
            "remote" => Ok(Action::Remote),
            "resolve" => Ok(Action::Resolve),
            "assign" => Ok(Action::Assign),
            "release" => Ok(Action::Release),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// What `shutdown` does to a node's status.
///
/// The behavior is a register-wide policy choice rather than a hard-coded
/// rule; both variants zero the metrics, drop the remote session, and reset
/// uptime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Shutdown always yields `Inactive`.
    #[default]
    PowerOff,

    /// Shutdown returns `InUse` and `Conflict` nodes to the `Active` pool
    /// and leaves other statuses unchanged.
    ReturnToPool,
}

impl ShutdownPolicy {
    /// The status a node lands in when shut down from `current`.
    pub fn resulting_status(&self, current: NodeStatus) -> NodeStatus {
        match self {
            ShutdownPolicy::PowerOff => NodeStatus::Inactive,
            ShutdownPolicy::ReturnToPool => match current {
                NodeStatus::InUse | NodeStatus::Conflict => NodeStatus::Active,
                other => other,
            },
        }
    }
}

/// How an outcome changes the metric triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEffect {
    /// Leave metrics as they are.
    Keep,
    /// Force all components to zero.
    Zero,
    /// Sample fresh values from a band.
    Sample(Band),
}

/// How an outcome changes the remote-session flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEffect {
    Keep,
    Toggle,
    ForceOff,
}

/// The declarative result of a legal transition: the new status plus field
/// effects, not yet applied to any node.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub status: NodeStatus,
    pub metrics: MetricEffect,
    pub remote: RemoteEffect,
    /// Clear `conflict_kind`. Always set when the transition can leave
    /// `Conflict`, so the kind/status invariant survives every commit.
    pub clear_conflict: bool,
    pub reset_uptime: bool,
    /// Human-readable confirmation for the action caller.
    pub message: String,
}

impl Outcome {
    /// Apply this outcome's effects to a node. The registry stamps
    /// `last_updated_ms` separately, as part of the commit.
    pub fn apply(&self, node: &mut Node, sampler: &dyn MetricSampler) {
        node.status = self.status;
        match self.metrics {
            MetricEffect::Keep => {}
            MetricEffect::Zero => node.metrics = Metrics::zero(),
            MetricEffect::Sample(band) => node.metrics = band.sample(sampler),
        }
        match self.remote {
            RemoteEffect::Keep => {}
            RemoteEffect::Toggle => node.remote_active = !node.remote_active,
            RemoteEffect::ForceOff => node.remote_active = false,
        }
        if self.clear_conflict {
            node.conflict_kind = None;
        }
        if self.reset_uptime {
            node.uptime_hours = 0;
        }
    }
}

/// Decide what `action` does to `node`, or reject it.
///
/// Pure: reads the node, computes a delta, writes nothing. A rejected action
/// must not be committed in any part.
pub fn decide(
    node: &Node,
    action: Action,
    policy: ShutdownPolicy,
) -> Result<Outcome, RegistryError> {
    match action {
        Action::Restart => Ok(Outcome {
            status: NodeStatus::Active,
            metrics: MetricEffect::Sample(LOW_BAND),
            remote: RemoteEffect::Keep,
            clear_conflict: true,
            reset_uptime: true,
            message: format!("{} restarted successfully", node.id),
        }),

        Action::Shutdown => Ok(Outcome {
            status: policy.resulting_status(node.status),
            metrics: MetricEffect::Zero,
            remote: RemoteEffect::ForceOff,
            clear_conflict: true,
            reset_uptime: true,
            message: format!("{} shutdown complete", node.id),
        }),

        Action::Remote => {
            if !node.status.supports_remote() {
                return Err(RegistryError::invalid_transition(action.as_str(), node.status));
            }
            let starting = !node.remote_active;
            Ok(Outcome {
                status: node.status,
                metrics: MetricEffect::Keep,
                remote: RemoteEffect::Toggle,
                clear_conflict: false,
                reset_uptime: false,
                message: format!(
                    "{} remote session {}",
                    node.id,
                    if starting { "started" } else { "ended" }
                ),
            })
        }

        Action::Resolve => {
            if node.status != NodeStatus::Conflict {
                return Err(RegistryError::invalid_transition(action.as_str(), node.status));
            }
            Ok(Outcome {
                status: NodeStatus::Active,
                metrics: MetricEffect::Sample(LOW_BAND),
                remote: RemoteEffect::Keep,
                clear_conflict: true,
                reset_uptime: false,
                message: format!("{} conflict resolved", node.id),
            })
        }

        Action::Assign => {
            if node.status != NodeStatus::Active {
                return Err(RegistryError::invalid_transition(action.as_str(), node.status));
            }
            Ok(Outcome {
                status: NodeStatus::InUse,
                metrics: MetricEffect::Sample(HIGH_BAND),
                remote: RemoteEffect::Keep,
                clear_conflict: false,
                reset_uptime: false,
                message: format!("{} assigned to user", node.id),
            })
        }

        Action::Release => {
            if node.status != NodeStatus::InUse {
                return Err(RegistryError::invalid_transition(action.as_str(), node.status));
            }
            Ok(Outcome {
                status: NodeStatus::Active,
                metrics: MetricEffect::Sample(LOW_BAND),
                remote: RemoteEffect::ForceOff,
                clear_conflict: false,
                reset_uptime: false,
                message: format!("{} released from user", node.id),
            })
        }
    }
}
