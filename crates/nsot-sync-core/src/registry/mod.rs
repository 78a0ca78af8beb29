//! Static driver registry
//!
//! Collectors and inventory clients are compiled in and registered by name
//! at startup, so the binary picks a driver from configuration without an
//! if-else chain over every known implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nsot_sync_core::registry::DriverRegistry;
//! use nsot_sync_core::config::CollectorConfig;
//!
//! let registry = DriverRegistry::new();
//! nsot_sync_simple::register(&registry);
//! nsot_sync_client::register(&registry);
//!
//! let collector = registry.create_collector(&CollectorConfig::simple())?;
//! ```
//!
//! ## Registration
//!
//! Driver crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &DriverRegistry) {
//!     registry.register_collector("simple", Box::new(SimpleFactory));
//! }
//! ```

use crate::config::{CollectorConfig, InventoryConfig};
use crate::error::{Error, Result};
use crate::traits::{Collector, CollectorFactory, InventoryClient, InventoryClientFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Name → factory maps for collectors and inventory clients
///
/// ## Thread Safety
///
/// Interior mutability with RwLock; registration takes `&self`.
#[derive(Default)]
pub struct DriverRegistry {
    collectors: RwLock<HashMap<String, Box<dyn CollectorFactory>>>,
    inventories: RwLock<HashMap<String, Box<dyn InventoryClientFactory>>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collector factory
    ///
    /// # Parameters
    ///
    /// - `name`: Driver name (e.g., "simple", "facter")
    /// - `factory`: Factory object for creating collector instances
    pub fn register_collector(&self, name: impl Into<String>, factory: Box<dyn CollectorFactory>) {
        let mut collectors = self
            .collectors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collectors.insert(name.into(), factory);
    }

    /// Register an inventory client factory
    pub fn register_inventory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn InventoryClientFactory>,
    ) {
        let mut inventories = self
            .inventories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        inventories.insert(name.into(), factory);
    }

    /// Create a collector from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Collector>)`: Created collector
    /// - `Err(Error)`: If the driver is not registered or creation fails
    pub fn create_collector(&self, config: &CollectorConfig) -> Result<Box<dyn Collector>> {
        let name = config.type_name();
        let collectors = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = collectors
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown collector driver: {}", name)))?;

        factory.create(config)
    }

    /// Create an inventory client from configuration
    pub fn create_inventory_client(
        &self,
        config: &InventoryConfig,
    ) -> Result<Box<dyn InventoryClient>> {
        let name = config.type_name();
        let inventories = self
            .inventories
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = inventories
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown inventory type: {}", name)))?;

        factory.create(config)
    }

    /// Registered collector names, sorted
    pub fn list_collectors(&self) -> Vec<String> {
        let collectors = self
            .collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = collectors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_collector(&self, name: &str) -> bool {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn has_inventory(&self, name: &str) -> bool {
        self.inventories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
