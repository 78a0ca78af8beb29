//! Contract Test: End-to-end Scenarios
//!
//! Constraints verified:
//! - A single host with one addressed interface lands as one device,
//!   one network and one interface, in that order, with the right labels
//! - An existing network is updated in place using its remote id
//! - Noop runs ensure attributes but never write resources

mod common;

use common::*;
use nsot_sync_core::model::{AttributeDefinition, Collection, ResourceKind};
use nsot_sync_core::{AttributeOverlays, MemoryNotifier, NoticeLevel, SyncOutcome};
use serde_json::json;

#[tokio::test]
async fn router1_eth0_lands_in_an_empty_site() {
    let inventory = MockInventory::new();
    let notifier = MemoryNotifier::new();

    let engine = engine(
        StaticCollector::new(router1_document()),
        &inventory,
        &notifier,
        &minimal_config(),
    );
    engine.run().await.expect("run succeeds");

    let successes: Vec<String> = notifier
        .at_level(NoticeLevel::Success)
        .into_iter()
        .map(|notice| notice.message)
        .collect();
    assert_eq!(
        successes,
        vec!["router1 created!", "10.0.0.5/24 created!", "router1:eth0 created!"]
    );

    let network = &inventory.records(Collection::Networks)[0];
    assert_eq!(network["network_address"], "10.0.0.5");
    assert_eq!(network["prefix_length"], 24);
    assert_eq!(network["state"], "assigned");

    let interface = &inventory.records(Collection::Interfaces)[0];
    assert_eq!(interface["addresses"], json!(["10.0.0.5/24"]));
    assert_eq!(interface["mac_address"], "52:54:00:12:34:56");
    assert_eq!(interface["type"], 6);
    assert_eq!(interface["description"], "eth0 on router1");
}

#[tokio::test]
async fn existing_network_is_updated_with_its_id() {
    let inventory = MockInventory::new();
    let notifier = MemoryNotifier::new();
    let network_id = inventory.seed(
        Collection::Networks,
        json!({"network_address": "10.0.0.5", "prefix_length": 24, "site_id": 1}),
    );

    let engine = engine(
        StaticCollector::new(router1_document()),
        &inventory,
        &notifier,
        &minimal_config(),
    );
    let SyncOutcome::Reconciled(report) = engine.run().await.expect("run succeeds") else {
        panic!("expected reconciliation");
    };

    assert_eq!(report.networks.updated, 1);
    assert_eq!(report.networks.created, 0);

    let updates = inventory.calls_of(Op::Update, Collection::Networks);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id, Some(network_id));
    assert_eq!(updates[0].body.as_ref().unwrap()["id"], network_id);
    assert!(notifier.messages().contains(&"10.0.0.5/24 updated!".to_string()));
}

#[tokio::test]
async fn noop_ensures_attributes_and_plans_only() {
    let inventory = MockInventory::new();
    let notifier = MemoryNotifier::new();

    let config = minimal_config()
        .with_noop(true)
        .with_overlays(AttributeOverlays::new().with(ResourceKind::Device, "rack", "r12"));
    let collector = StaticCollector::new(router1_document())
        .with_schema(vec![AttributeDefinition::new("os", ResourceKind::Device)]);

    let engine = engine(collector, &inventory, &notifier, &config);
    assert!(engine.is_noop());

    let SyncOutcome::Planned(document) = engine.run().await.expect("run succeeds") else {
        panic!("expected a planned document");
    };

    // Overlay is visible in the planned document
    assert_eq!(document.devices[0].attributes["rack"], "r12");
    assert_eq!(document.len(), 3);

    // Attributes were ensured, nothing else was touched
    assert_eq!(inventory.calls_of(Op::Create, Collection::Attributes).len(), 2);
    assert!(
        inventory
            .calls()
            .iter()
            .all(|call| call.collection == Collection::Attributes)
    );
}
