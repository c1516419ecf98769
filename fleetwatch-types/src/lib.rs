//! # fleetwatch-types
//!
//! Core types for fleet state observation. This crate defines the universal
//! schema that the fleetwatch register and its observers share: the node
//! record, the ordered fleet snapshot, and the change events broadcast to
//! subscribers.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable `serde` and/or `minicbor` features as needed
//! - **Transport agnostic**: The same record shape serves HTTP responses,
//!   WebSocket pushes, or in-process channels
//! - **Versioned schema**: Snapshots include version info for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//! - `minicbor`: Compact binary serialization via CBOR
//! - `all`: Enable all serialization formats
//!
//! ## Example
//!
//! ```rust
//! use fleetwatch_types::{Metrics, Node, NodeStatus};
//!
//! let node = Node::new("PC-01", NodeStatus::Active, Metrics::new(25, 40, 20), "Row-1, Seat-1");
//!
//! assert_eq!(node.status, NodeStatus::Active);
//! assert!(node.is_consistent());
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version is included in serialized
//! snapshots to allow consumers to handle format evolution gracefully.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod event;
mod node;
mod snapshot;

pub use event::*;
pub use node::*;
pub use snapshot::*;

/// Wire schema of the snapshot format.
///
/// Bump on breaking changes to the node record or snapshot layout. Decoders
/// check it via [`FleetSnapshot::is_schema_compatible`] before trusting a
/// received snapshot.
pub const SCHEMA_VERSION: u32 = 1;
