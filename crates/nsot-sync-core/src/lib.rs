// # nsot-sync-core
//
// Core library for syncing a host's network identity into an NSoT inventory.
//
// ## Architecture Overview
//
// - **Collector**: Trait for producing the desired-state document of a host
// - **InventoryClient**: Trait for lookup/create/update against the inventory
// - **Notifier**: Injected capability for user-facing notices
// - **SyncEngine**: Pipeline driving collect → overlay → ensure → reconcile
// - **Reconciler**: Converges remote state to the desired-state document
// - **DriverRegistry**: Static registry mapping driver names to collectors
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Reconciliation is separate from collection and transport
// 2. **Sequential**: One remote call at a time, no background work, no retries
// 3. **Plugin-Based**: Collectors and clients are registered by name at startup
// 4. **Library-First**: The whole pipeline can be embedded without the CLI
// 5. **Idempotency**: Every write is preceded by an existence lookup

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod notify;
pub mod overlay;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{AttributeOverlays, CollectorConfig, InventoryConfig, PrefixMode, SyncConfig};
pub use engine::{ReconcileReport, Reconciler, SyncEngine, SyncOutcome};
pub use error::{Error, InventoryError, Result};
pub use model::{
    AttributeDefinition, Attributes, Collection, DesiredState, Device, DeviceRef, Filter,
    Interface, Network, NetworkState, Resource, ResourceKind,
};
pub use notify::{MemoryNotifier, Notice, NoticeLevel, TracingNotifier};
pub use registry::DriverRegistry;
pub use traits::{Collector, InventoryClient, Notifier};
