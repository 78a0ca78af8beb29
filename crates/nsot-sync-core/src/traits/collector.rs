// # Collector Trait
//
// Defines the interface for producing a host's desired-state document.
//
// ## Implementations
//
// - Local interfaces: `nsot-sync-simple` crate
// - Local interfaces plus facter facts: `nsot-sync-facter` crate
//
// ## Usage
//
// ```rust,ignore
// use nsot_sync_core::Collector;
//
// let collector = /* Collector implementation */;
// let document = collector.collect().await?;
// println!("{} resources", document.len());
// ```

use crate::config::CollectorConfig;
use crate::error::Result;
use crate::model::{AttributeDefinition, DesiredState};
use async_trait::async_trait;

/// Trait for collector implementations
///
/// A collector observes the host and describes what should exist in the
/// inventory. It never talks to the inventory itself.
///
/// # Contract
///
/// - `collect()` is called exactly once per invocation
/// - The returned document is complete; there are no partial documents
/// - Interfaces reference their device by hostname
#[async_trait]
pub trait Collector: Send + Sync {
    /// Build the desired-state document for this host
    async fn collect(&self) -> Result<DesiredState>;

    /// Attribute definitions this driver relies on
    ///
    /// These are ensured before any resource is written. A definition here
    /// takes precedence over the default one the overlay would emit for the
    /// same attribute.
    fn required_attributes(&self) -> Vec<AttributeDefinition> {
        Vec::new()
    }

    /// Driver name (for logging/debugging)
    fn collector_name(&self) -> &'static str;
}

/// Helper trait for constructing collectors from configuration
pub trait CollectorFactory: Send + Sync {
    /// Create a Collector instance from configuration
    fn create(&self, config: &CollectorConfig) -> Result<Box<dyn Collector>>;
}
