//! Attribute overlay
//!
//! Merges operator-supplied static attributes into every resource of a kind
//! and declares the attribute definitions those values need.

use crate::config::AttributeOverlays;
use crate::model::{AttributeDefinition, Attributes, DesiredState, ResourceKind};
use std::collections::HashSet;

/// Description given to definitions introduced by an overlay
pub const OVERLAY_DESCRIPTION: &str = "Added by nsot-sync";

/// Merge `overlays` into `document` in place
///
/// Overlay values overwrite same-named attributes already on a resource.
/// Returns one definition per attribute name and kind the overlay carries,
/// non-required and non-displayed.
pub fn apply(document: &mut DesiredState, overlays: &AttributeOverlays) -> Vec<AttributeDefinition> {
    for device in &mut document.devices {
        merge(&mut device.attributes, &overlays.device);
    }
    for network in &mut document.networks {
        merge(&mut network.attributes, &overlays.network);
    }
    for interface in &mut document.interfaces {
        merge(&mut interface.attributes, &overlays.interface);
    }

    ResourceKind::ALL
        .into_iter()
        .flat_map(|kind| {
            overlays.get(kind).keys().map(move |name| {
                AttributeDefinition::new(name.clone(), kind).with_description(OVERLAY_DESCRIPTION)
            })
        })
        .collect()
}

fn merge(target: &mut Attributes, overlay: &Attributes) {
    for (key, value) in overlay {
        target.insert(key.clone(), value.clone());
    }
}

/// Combine a driver's schema with overlay-declared definitions
///
/// A driver definition wins over an overlay definition for the same
/// (name, kind). Driver definitions come first; duplicates are dropped.
pub fn merge_schema(
    driver: Vec<AttributeDefinition>,
    declared: Vec<AttributeDefinition>,
) -> Vec<AttributeDefinition> {
    let mut seen = HashSet::new();
    driver
        .into_iter()
        .chain(declared)
        .filter(|def| seen.insert((def.name.clone(), def.resource_name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Device, Interface, Network};

    fn document() -> DesiredState {
        DesiredState {
            devices: vec![Device::new("router1").unwrap().with_attribute("a", "1")],
            networks: vec![Network::from_cidr("10.0.0.5/32").unwrap()],
            interfaces: vec![Interface::new("eth0", "router1").unwrap()],
        }
    }

    #[test]
    fn test_overlay_wins_on_conflict() {
        let mut doc = document();
        let overlays = AttributeOverlays::new()
            .with(ResourceKind::Device, "a", "2")
            .with(ResourceKind::Device, "b", "3");

        apply(&mut doc, &overlays);

        let attrs = &doc.devices[0].attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["a"], "2");
        assert_eq!(attrs["b"], "3");
    }

    #[test]
    fn test_overlay_targets_only_its_kind() {
        let mut doc = document();
        let overlays = AttributeOverlays::new().with(ResourceKind::Network, "vlan", "10");

        let defs = apply(&mut doc, &overlays);

        assert_eq!(doc.networks[0].attributes["vlan"], "10");
        assert!(!doc.devices[0].attributes.contains_key("vlan"));
        assert!(doc.interfaces[0].attributes.is_empty());

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "vlan");
        assert_eq!(defs[0].resource_name, ResourceKind::Network);
        assert!(!defs[0].required);
        assert!(!defs[0].display);
    }

    #[test]
    fn test_empty_overlay_is_noop() {
        let mut doc = document();
        let before = doc.clone();

        let defs = apply(&mut doc, &AttributeOverlays::new());

        assert_eq!(doc, before);
        assert!(defs.is_empty());
    }

    #[test]
    fn test_driver_schema_overrides_overlay_default() {
        let driver = vec![
            AttributeDefinition::new("os", ResourceKind::Device)
                .with_description("Operating system")
                .displayed(true),
        ];
        let declared = vec![
            AttributeDefinition::new("os", ResourceKind::Device),
            AttributeDefinition::new("os", ResourceKind::Interface),
            AttributeDefinition::new("rack", ResourceKind::Device),
        ];

        let merged = merge_schema(driver, declared);

        assert_eq!(merged.len(), 3);
        assert!(merged[0].display);
        assert_eq!(merged[0].description, "Operating system");
        assert_eq!(merged[1].resource_name, ResourceKind::Interface);
        assert_eq!(merged[2].name, "rack");
    }
}
