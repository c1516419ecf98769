//! Change events broadcast to observers.

use crate::{FleetSnapshot, Node};

/// A committed change, fanned out to every subscriber in commit order.
///
/// There are exactly two shapes: a single-node commit and a registry-wide
/// refresh. Both carry post-commit snapshots in the same record shape that
/// `list()` returns, so observers never need a second read to resynchronize.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", content = "payload", rename_all = "snake_case"))]
#[cfg_attr(feature = "minicbor", derive(minicbor::Encode, minicbor::Decode))]
pub enum ChangeEvent {
    /// One node was committed; carries its post-commit state.
    #[cfg_attr(feature = "minicbor", n(0))]
    NodeChanged(#[cfg_attr(feature = "minicbor", n(0))] Node),

    /// A registry-wide refresh (or attach resync); carries the full fleet.
    #[cfg_attr(feature = "minicbor", n(1))]
    FullRefresh(#[cfg_attr(feature = "minicbor", n(0))] FleetSnapshot),
}

impl ChangeEvent {
    /// The changed node, if this is a single-node event.
    pub fn node(&self) -> Option<&Node> {
        match self {
            ChangeEvent::NodeChanged(node) => Some(node),
            ChangeEvent::FullRefresh(_) => None,
        }
    }

    /// The full snapshot, if this is a registry-wide event.
    pub fn snapshot(&self) -> Option<&FleetSnapshot> {
        match self {
            ChangeEvent::NodeChanged(_) => None,
            ChangeEvent::FullRefresh(snapshot) => Some(snapshot),
        }
    }

    /// Whether this event resynchronizes the whole fleet.
    pub fn is_full_refresh(&self) -> bool {
        matches!(self, ChangeEvent::FullRefresh(_))
    }
}
