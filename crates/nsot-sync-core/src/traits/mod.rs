//! Core traits for nsot-sync
//!
//! This module defines the seams every implementation plugs into.
//!
//! - [`Collector`]: Produce the desired-state document for this host
//! - [`InventoryClient`]: Look up, create and update remote resources
//! - [`Notifier`]: Report per-resource outcomes to the operator

pub mod collector;
pub mod inventory;
pub mod notifier;

pub use collector::{Collector, CollectorFactory};
pub use inventory::{InventoryClient, InventoryClientFactory, RemoteRecord};
pub use notifier::Notifier;
