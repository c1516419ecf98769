//! # fleetwatch-core
//!
//! The authoritative fleet-state register: a fixed pool of managed nodes,
//! each carrying a status and metric snapshot, mutated only through named
//! actions validated by a pure transition engine, with every commit fanned
//! out to subscribers as [`ChangeEvent`]s.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetwatch_core::{Action, Fleet};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Seed a fleet of 20 nodes (2 pre-placed in conflict) and start
//!     // background metric churn.
//!     let fleet = Fleet::builder()
//!         .churn_interval(Duration::from_secs(1))
//!         .build()?;
//!
//!     // Observers attach and immediately receive a full snapshot.
//!     let mut events = fleet.subscribe();
//!
//!     // Actions transition nodes; every commit reaches every subscriber.
//!     let receipt = fleet.apply_action("PC-01", Action::Assign)?;
//!     println!("{}", receipt.message);
//!
//!     let churn = fleet.start();
//!     while let Some(event) = events.recv().await {
//!         // render the event
//!         let _ = event;
//!     }
//!     churn.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Single writer**: all mutations serialize through the registry's write
//!   lock; observers never see a half-written node.
//! - **Snapshot reads**: `list()`/`get()` return immutable copies; no caller
//!   holds a reference into the live collection.
//! - **Best-effort fan-out**: a slow or vanished subscriber never blocks or
//!   fails a commit.

mod config;
mod error;
mod fleet;
mod registry;
mod sampler;
mod transition;

#[cfg(feature = "tokio")]
mod notify;

pub use config::FleetConfig;
pub use error::RegistryError;
pub use fleet::{Fleet, FleetBuilder};
pub use registry::{ActionReceipt, Registry};
pub use sampler::{FixedSampler, MetricSampler, RngSampler};
pub use transition::{
    decide, Action, Band, MetricEffect, Outcome, RemoteEffect, ShutdownPolicy, UnknownAction,
};
pub use transition::{AMBIENT_BAND, HIGH_BAND, LOW_BAND, SEED_BAND};

#[cfg(feature = "tokio")]
pub use fleet::ChurnHandle;
#[cfg(feature = "tokio")]
pub use notify::{Notifier, Subscription};

// Re-export types for convenience
pub use fleetwatch_types::{
    ChangeEvent, ConflictKind, FleetSnapshot, Metrics, Node, NodeStatus,
};
