//! Error types for the register.

use fleetwatch_types::NodeStatus;
use thiserror::Error;

/// Errors surfaced by the registry.
///
/// `NotFound` and `InvalidTransition` are caller errors and never leave the
/// registry in a modified state. `DuplicateId`, `InconsistentNode`, and
/// `InvalidConfig` can only occur while seeding, never at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The referenced node id does not exist.
    #[error("node not found: {id}")]
    NotFound { id: String },

    /// The action is not legal for the node's current status, or the action
    /// name was not recognized. Nothing was committed.
    #[error("action '{action}' is not valid while status is '{status}'")]
    InvalidTransition { action: String, status: NodeStatus },

    /// Two seeded nodes carried the same id. Fatal at startup only.
    #[error("duplicate node id at seed time: {id}")]
    DuplicateId { id: String },

    /// A seeded node violated the per-node invariants (conflict-kind
    /// consistency, metric bounds). Fatal at startup only.
    #[error("inconsistent seed node: {id}")]
    InconsistentNode { id: String },

    /// The fleet configuration cannot produce a valid seed population.
    #[error("invalid fleet config: {0}")]
    InvalidConfig(String),
}

impl RegistryError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        RegistryError::NotFound { id: id.into() }
    }

    pub(crate) fn invalid_transition(action: impl Into<String>, status: NodeStatus) -> Self {
        RegistryError::InvalidTransition {
            action: action.into(),
            status,
        }
    }
}
