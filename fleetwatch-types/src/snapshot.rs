//! FleetSnapshot - an ordered point-in-time view of the whole fleet.

use alloc::vec::Vec;

use crate::{Node, NodeStatus, SCHEMA_VERSION};

/// A point-in-time snapshot of every node in the fleet.
///
/// This is the shape returned by the register's `list()` and carried by
/// `FullRefresh` events. Node order is the seed order of the register and is
/// stable for the lifetime of the process.
///
/// # Example
///
/// ```rust
/// use fleetwatch_types::{FleetSnapshot, Metrics, Node, NodeStatus};
///
/// let snapshot = FleetSnapshot::with_timestamp(1703160000000, vec![
///     Node::new("PC-01", NodeStatus::Active, Metrics::new(25, 40, 20), "Row-1, Seat-1"),
///     Node::new("PC-02", NodeStatus::InUse, Metrics::new(60, 75, 35), "Row-1, Seat-2"),
/// ]);
///
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.status_count(NodeStatus::InUse), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct FleetSnapshot {
    /// Wire schema this snapshot was encoded with. Decoders compare it
    /// against [`SCHEMA_VERSION`](crate::SCHEMA_VERSION) before trusting the
    /// record layout.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub schema: u32,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub timestamp_ms: u64,

    /// All nodes, in seed order.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub nodes: Vec<Node>,
}

impl FleetSnapshot {
    /// Create a snapshot of the given nodes with the current timestamp.
    #[cfg(feature = "std")]
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            timestamp_ms: current_timestamp_ms(),
            nodes,
        }
    }

    /// Create a snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64, nodes: Vec<Node>) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            timestamp_ms,
            nodes,
        }
    }

    /// Whether this snapshot speaks the wire schema this library was built
    /// with. A decoded snapshot with a foreign schema should be refused, not
    /// reinterpreted.
    pub fn is_schema_compatible(&self) -> bool {
        self.schema == SCHEMA_VERSION
    }

    /// Check if the snapshot is empty (no nodes).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes in the snapshot.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node by id.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterate over all nodes in seed order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes currently in the given status.
    pub fn status_count(&self, status: NodeStatus) -> usize {
        self.nodes.iter().filter(|n| n.status == status).count()
    }

    /// Number of nodes with an attached remote session.
    pub fn remote_session_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.remote_active).count()
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
