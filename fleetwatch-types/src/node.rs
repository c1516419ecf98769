//! The node record: identity, status, and metrics of one managed unit.

use alloc::string::String;
use core::fmt;

/// Operational status of a node.
///
/// Exactly one status holds at any instant. The set is closed: transitions
/// between statuses go through the register's action engine, never by
/// assigning arbitrary values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum NodeStatus {
    /// Powered on and available for assignment.
    #[cfg_attr(feature = "minicbor", n(0))]
    Active,

    /// Assigned to a user session.
    #[cfg_attr(feature = "minicbor", n(1))]
    InUse,

    /// A hardware or software conflict needs resolution.
    #[cfg_attr(feature = "minicbor", n(2))]
    Conflict,

    /// Held in reserve; never touched by bulk refresh.
    #[cfg_attr(feature = "minicbor", n(3))]
    Backup,

    /// Powered off.
    #[cfg_attr(feature = "minicbor", n(4))]
    Inactive,
}

impl NodeStatus {
    /// The wire name of this status, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Active => "active",
            NodeStatus::InUse => "in_use",
            NodeStatus::Conflict => "conflict",
            NodeStatus::Backup => "backup",
            NodeStatus::Inactive => "inactive",
        }
    }

    /// Whether a remote session is meaningful in this status.
    pub fn supports_remote(&self) -> bool {
        matches!(self, NodeStatus::Active | NodeStatus::InUse)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of conflict a node is in. Present exactly when the status is
/// [`NodeStatus::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
#[cfg_attr(feature = "minicbor", cbor(index_only))]
pub enum ConflictKind {
    #[cfg_attr(feature = "minicbor", n(0))]
    Hardware,

    #[cfg_attr(feature = "minicbor", n(1))]
    Software,
}

impl ConflictKind {
    /// The wire name of this conflict kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Hardware => "hardware",
            ConflictKind::Software => "software",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Utilization percentages for one node. Each component is in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Metrics {
    /// CPU utilization percentage.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub cpu: u8,

    /// RAM utilization percentage.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub ram: u8,

    /// Disk utilization percentage.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub disk: u8,
}

impl Metrics {
    /// Create metrics from explicit percentages.
    pub const fn new(cpu: u8, ram: u8, disk: u8) -> Self {
        Self { cpu, ram, disk }
    }

    /// All-zero metrics, the shape of a powered-off node.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Whether every component is within `[0, 100]`.
    pub fn is_within_bounds(&self) -> bool {
        self.cpu <= 100 && self.ram <= 100 && self.disk <= 100
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// The authoritative record for one managed unit.
///
/// Nodes are created together when the register is seeded and are never added
/// or removed afterward; only their mutable fields change, and only through
/// the register. `id` and `location` are immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub struct Node {
    /// Stable unique identifier, assigned at creation.
    #[cfg_attr(feature = "minicbor", n(0))]
    pub id: String,

    /// Current operational status.
    #[cfg_attr(feature = "minicbor", n(1))]
    pub status: NodeStatus,

    /// Current utilization snapshot.
    #[cfg_attr(feature = "minicbor", n(2))]
    pub metrics: Metrics,

    /// Conflict classification; `Some` exactly when `status` is `Conflict`.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    #[cfg_attr(feature = "serde", serde(default))]
    #[cfg_attr(feature = "minicbor", n(3))]
    pub conflict_kind: Option<ConflictKind>,

    /// Whether a remote session is attached. Meaningful only while the
    /// status supports remote sessions; forced off on shutdown and release.
    #[cfg_attr(feature = "minicbor", n(4))]
    pub remote_active: bool,

    /// Descriptive placement token, immutable after creation.
    #[cfg_attr(feature = "minicbor", n(5))]
    pub location: String,

    /// Descriptive OS label, immutable after creation.
    #[cfg_attr(feature = "minicbor", n(6))]
    pub os_version: String,

    /// Unix timestamp in milliseconds of the most recent commit to this node.
    #[cfg_attr(feature = "minicbor", n(7))]
    pub last_updated_ms: u64,

    /// Hours since the last restart or shutdown.
    #[cfg_attr(feature = "minicbor", n(8))]
    pub uptime_hours: u32,
}

impl Node {
    /// Create a node with the given identity and initial state.
    ///
    /// Remote is off, uptime is zero, and no conflict kind is set; use the
    /// field accessors (or the register's seeding) for richer initial state.
    pub fn new(
        id: impl Into<String>,
        status: NodeStatus,
        metrics: Metrics,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            metrics,
            conflict_kind: None,
            remote_active: false,
            location: location.into(),
            os_version: String::new(),
            last_updated_ms: 0,
            uptime_hours: 0,
        }
    }

    /// Whether `conflict_kind` agrees with the status: set exactly when the
    /// node is in `Conflict`.
    pub fn conflict_kind_consistent(&self) -> bool {
        self.conflict_kind.is_some() == (self.status == NodeStatus::Conflict)
    }

    /// Check the per-node invariants that must hold after every commit:
    /// conflict-kind consistency and metric bounds.
    pub fn is_consistent(&self) -> bool {
        self.conflict_kind_consistent() && self.metrics.is_within_bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(NodeStatus::Active.as_str(), "active");
        assert_eq!(NodeStatus::InUse.as_str(), "in_use");
        assert_eq!(NodeStatus::Conflict.as_str(), "conflict");
        assert_eq!(NodeStatus::Backup.as_str(), "backup");
        assert_eq!(NodeStatus::Inactive.as_str(), "inactive");
    }

    #[test]
    fn remote_supported_only_when_active_or_in_use() {
        assert!(NodeStatus::Active.supports_remote());
        assert!(NodeStatus::InUse.supports_remote());
        assert!(!NodeStatus::Conflict.supports_remote());
        assert!(!NodeStatus::Backup.supports_remote());
        assert!(!NodeStatus::Inactive.supports_remote());
    }

    #[test]
    fn metrics_bounds() {
        assert!(Metrics::new(0, 0, 0).is_within_bounds());
        assert!(Metrics::new(100, 100, 100).is_within_bounds());
        assert!(!Metrics::new(101, 0, 0).is_within_bounds());
        assert!(!Metrics::new(0, 0, 255).is_within_bounds());
    }

    #[test]
    fn zero_metrics() {
        assert!(Metrics::zero().is_zero());
        assert!(!Metrics::new(1, 0, 0).is_zero());
    }

    #[test]
    fn conflict_kind_must_match_status() {
        let mut node = Node::new("PC-01", NodeStatus::Active, Metrics::zero(), "Row-1, Seat-1");
        assert!(node.conflict_kind_consistent());

        // Conflict status without a kind is inconsistent.
        node.status = NodeStatus::Conflict;
        assert!(!node.conflict_kind_consistent());

        node.conflict_kind = Some(ConflictKind::Hardware);
        assert!(node.conflict_kind_consistent());

        // A stale kind after leaving conflict is inconsistent.
        node.status = NodeStatus::Active;
        assert!(!node.conflict_kind_consistent());
    }

    #[test]
    fn is_consistent_combines_both_invariants() {
        let mut node = Node::new("PC-01", NodeStatus::Active, Metrics::new(25, 40, 20), "Row-1, Seat-1");
        assert!(node.is_consistent());

        node.metrics = Metrics::new(120, 0, 0);
        assert!(!node.is_consistent());

        node.metrics = Metrics::new(20, 0, 0);
        node.conflict_kind = Some(ConflictKind::Software);
        assert!(!node.is_consistent());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let mut node = Node::new("PC-07", NodeStatus::Conflict, Metrics::new(55, 70, 30), "Row-2, Seat-2");
        node.conflict_kind = Some(ConflictKind::Software);
        node.os_version = "Windows 11 Pro".into();
        node.last_updated_ms = 1703160000000;
        node.uptime_hours = 12;

        let json = serde_json::to_string(&node).unwrap();
        let parsed: Node = serde_json::from_str(&json).unwrap();

        assert_eq!(node, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_snake_case_status_names() {
        let node = Node::new("PC-01", NodeStatus::InUse, Metrics::zero(), "Row-1, Seat-1");
        let json = serde_json::to_string(&node).unwrap();

        assert!(json.contains("\"in_use\""));
        // Absent conflict kind is omitted entirely.
        assert!(!json.contains("conflict_kind"));
    }

    #[cfg(feature = "minicbor")]
    #[test]
    fn minicbor_roundtrip() {
        let mut node = Node::new("PC-03", NodeStatus::Backup, Metrics::new(30, 45, 20), "Row-1, Seat-3");
        node.uptime_hours = 48;

        let bytes = minicbor::to_vec(&node).unwrap();
        let parsed: Node = minicbor::decode(&bytes).unwrap();

        assert_eq!(node, parsed);
    }
}
