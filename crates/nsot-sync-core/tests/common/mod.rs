//! Test doubles and common utilities for engine contract tests
//!
//! `MockInventory` is a small in-memory NSoT: it stores records per
//! collection, answers filtered lookups, hands out ids, logs every call and
//! can be told to fail specific calls.

#![allow(dead_code)]

use nsot_sync_core::error::{Error, InventoryError, Result};
use nsot_sync_core::model::{
    AttributeDefinition, Collection, DesiredState, Device, Filter, Interface, Network,
};
use nsot_sync_core::traits::{Collector, InventoryClient, RemoteRecord};
use nsot_sync_core::{CollectorConfig, InventoryConfig, MemoryNotifier, SyncConfig, SyncEngine};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Kind of inventory call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lookup,
    Create,
    Update,
}

/// One recorded inventory call
#[derive(Debug, Clone)]
pub struct Call {
    pub op: Op,
    pub collection: Collection,
    pub site_id: u64,
    pub filter: Filter,
    pub id: Option<u64>,
    pub body: Option<Value>,
}

struct Failure {
    op: Op,
    collection: Collection,
    field: Option<(String, String)>,
    error: InventoryError,
}

#[derive(Default)]
struct State {
    records: HashMap<Collection, Vec<Value>>,
    next_id: u64,
    calls: Vec<Call>,
    failures: Vec<Failure>,
}

/// In-memory inventory; clones share the same state
#[derive(Clone, Default)]
pub struct MockInventory {
    state: Arc<Mutex<State>>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, returning its id
    pub fn seed(&self, collection: Collection, mut fields: Value) -> u64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        fields["id"] = Value::from(id);
        state.records.entry(collection).or_default().push(fields);
        id
    }

    /// Fail every matching call with `error`
    pub fn fail(&self, op: Op, collection: Collection, error: InventoryError) {
        self.state.lock().unwrap().failures.push(Failure {
            op,
            collection,
            field: None,
            error,
        });
    }

    /// Fail matching calls whose filter or body carries `key == value`
    pub fn fail_when(
        &self,
        op: Op,
        collection: Collection,
        key: &str,
        value: &str,
        error: InventoryError,
    ) {
        self.state.lock().unwrap().failures.push(Failure {
            op,
            collection,
            field: Some((key.to_string(), value.to_string())),
            error,
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_of(&self, op: Op, collection: Collection) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == op && call.collection == collection)
            .collect()
    }

    /// Writes (creates and updates) in call order
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.op != Op::Lookup)
            .collect()
    }

    pub fn records(&self, collection: Collection) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    fn record_call(&self, call: Call) -> std::result::Result<(), InventoryError> {
        let mut state = self.state.lock().unwrap();
        let failure = state.failures.iter().find(|failure| {
            failure.op == call.op
                && failure.collection == call.collection
                && failure.field.as_ref().is_none_or(|(key, value)| {
                    call.filter.get(key) == Some(value)
                        || call
                            .body
                            .as_ref()
                            .and_then(|body| body.get(key))
                            .is_some_and(|field| field_matches(field, value))
                })
        });
        let result = match failure {
            Some(failure) => Err(failure.error.clone()),
            None => Ok(()),
        };
        state.calls.push(call);
        result
    }
}

fn field_matches(field: &Value, expected: &str) -> bool {
    match field {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

#[async_trait::async_trait]
impl InventoryClient for MockInventory {
    async fn lookup(
        &self,
        site_id: u64,
        collection: Collection,
        filter: &Filter,
    ) -> std::result::Result<Vec<RemoteRecord>, InventoryError> {
        self.record_call(Call {
            op: Op::Lookup,
            collection,
            site_id,
            filter: filter.clone(),
            id: None,
            body: None,
        })?;

        self.records(collection)
            .into_iter()
            .filter(|record| {
                filter.iter().all(|(key, value)| {
                    record
                        .get(key)
                        .is_some_and(|field| field_matches(field, value))
                })
            })
            .map(RemoteRecord::from_value)
            .collect()
    }

    async fn create(
        &self,
        site_id: u64,
        collection: Collection,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError> {
        self.record_call(Call {
            op: Op::Create,
            collection,
            site_id,
            filter: Filter::new(),
            id: None,
            body: Some(body.clone()),
        })?;

        let id = self.seed(collection, body.clone());
        let mut fields = body.clone();
        fields["id"] = Value::from(id);
        RemoteRecord::from_value(fields)
    }

    async fn update(
        &self,
        site_id: u64,
        collection: Collection,
        id: u64,
        body: &Value,
    ) -> std::result::Result<RemoteRecord, InventoryError> {
        self.record_call(Call {
            op: Op::Update,
            collection,
            site_id,
            filter: Filter::new(),
            id: Some(id),
            body: Some(body.clone()),
        })?;

        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .entry(collection)
            .or_default()
            .iter_mut()
            .find(|record| record["id"] == Value::from(id))
            .ok_or_else(|| InventoryError::rejected(404, serde_json::json!("Not found")))?;
        if let (Value::Object(target), Value::Object(patch)) = (&mut *record, body) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        RemoteRecord::from_value(record.clone())
    }

    fn client_name(&self) -> &'static str {
        "mock"
    }
}

/// A collector returning a fixed document and schema
pub struct StaticCollector {
    document: DesiredState,
    schema: Vec<AttributeDefinition>,
}

impl StaticCollector {
    pub fn new(document: DesiredState) -> Self {
        Self {
            document,
            schema: Vec::new(),
        }
    }

    pub fn with_schema(mut self, schema: Vec<AttributeDefinition>) -> Self {
        self.schema = schema;
        self
    }
}

#[async_trait::async_trait]
impl Collector for StaticCollector {
    async fn collect(&self) -> Result<DesiredState> {
        Ok(self.document.clone())
    }

    fn required_attributes(&self) -> Vec<AttributeDefinition> {
        self.schema.clone()
    }

    fn collector_name(&self) -> &'static str {
        "static"
    }
}

/// A collector that always fails
pub struct FailingCollector;

#[async_trait::async_trait]
impl Collector for FailingCollector {
    async fn collect(&self) -> Result<DesiredState> {
        Err(Error::collector("interface enumeration failed"))
    }

    fn collector_name(&self) -> &'static str {
        "failing"
    }
}

/// Minimal valid configuration for site 1
pub fn minimal_config() -> SyncConfig {
    SyncConfig::new(
        CollectorConfig::simple(),
        InventoryConfig::nsot("http://nsot.invalid", "ops@example.com", "secret"),
    )
}

/// Single host: router1, eth0, 10.0.0.5/24
pub fn router1_document() -> DesiredState {
    DesiredState {
        devices: vec![Device::new("router1").unwrap()],
        networks: vec![Network::from_cidr("10.0.0.5/24").unwrap()],
        interfaces: vec![
            Interface::new("eth0", "router1")
                .unwrap()
                .with_mac_address("52:54:00:12:34:56")
                .with_description("eth0 on router1")
                .with_address("10.0.0.5/24")
                .unwrap(),
        ],
    }
}

/// Build an engine over shared doubles
pub fn engine(
    collector: impl Collector + 'static,
    inventory: &MockInventory,
    notifier: &MemoryNotifier,
    config: &SyncConfig,
) -> SyncEngine {
    SyncEngine::new(
        Box::new(collector),
        Box::new(inventory.clone()),
        Box::new(notifier.clone()),
        config,
    )
    .expect("engine construction succeeds")
}
