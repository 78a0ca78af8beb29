// # Inventory Client Trait
//
// Defines the interface for reading and writing the remote inventory.
//
// ## Implementations
//
// - NSoT REST API: `nsot-sync-client` crate
//
// ## Usage
//
// ```rust,ignore
// use nsot_sync_core::{Collection, Filter, InventoryClient};
//
// let client = /* InventoryClient implementation */;
// let filter = Filter::from([("hostname".to_string(), "router1".to_string())]);
// let matches = client.lookup(1, Collection::Devices, &filter).await?;
// ```

use crate::config::InventoryConfig;
use crate::error::{InventoryError, Result};
use crate::model::{Collection, Filter};
use async_trait::async_trait;
use serde_json::Value;

/// A resource as returned by the inventory
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    /// Remote identifier
    pub id: u64,
    /// Every field the service returned, including `id`
    pub fields: Value,
}

impl RemoteRecord {
    /// Build a record from a JSON object carrying a numeric `id`
    pub fn from_value(fields: Value) -> std::result::Result<Self, InventoryError> {
        let id = fields
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| InventoryError::unexpected(format!("record without numeric id: {fields}")))?;
        Ok(Self { id, fields })
    }
}

/// Trait for inventory client implementations
///
/// # Trust Level: Untrusted
///
/// Clients are transport adapters:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to the inventory only
/// - ✅ Translate responses into [`RemoteRecord`]s
/// - ✅ Map failures onto the [`InventoryError`] classes
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a rejected write is abandoned by the engine)
/// - ❌ Decide between create and update (owned by the `Reconciler`)
/// - ❌ Swallow failures; every failure must surface as one of
///   `Connectivity`, `Rejected` or `Unexpected`
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Find resources in a site collection matching every filter field
    async fn lookup(
        &self,
        site_id: u64,
        collection: Collection,
        filter: &Filter,
    ) -> std::result::Result<Vec<RemoteRecord>, InventoryError>;

    /// Insert a resource
    async fn create(
        &self,
        site_id: u64,
        collection: Collection,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError>;

    /// Partially update the resource with the given id
    async fn update(
        &self,
        site_id: u64,
        collection: Collection,
        id: u64,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError>;

    /// Get the client name (for logging/debugging)
    fn client_name(&self) -> &'static str;
}

/// Helper trait for constructing inventory clients from configuration
pub trait InventoryClientFactory: Send + Sync {
    /// Create an InventoryClient instance from configuration
    fn create(&self, config: &InventoryConfig) -> Result<Box<dyn InventoryClient>>;
}
