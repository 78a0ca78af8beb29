//! Resource model
//!
//! Explicit records for everything one invocation wants to exist in the
//! inventory. Constructors validate the fields the inventory keys on, so a
//! malformed resource never reaches the reconciler.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Free-form attributes attached to a resource
pub type Attributes = BTreeMap<String, String>;

/// Query parameters used to look a resource up remotely
pub type Filter = BTreeMap<String, String>;

/// Default NSoT interface type (ethernetCsmacd)
pub const DEFAULT_INTERFACE_TYPE: u32 = 6;

/// MAC address NSoT stores when none is known
pub const NULL_MAC_ADDRESS: &str = "00:00:00:00:00:00";

/// Kind of resource managed by the engine
///
/// Serialized with the names NSoT uses for `resource_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Device,
    Network,
    Interface,
}

impl ResourceKind {
    /// All kinds, in reconciliation order
    pub const ALL: [ResourceKind; 3] = [Self::Device, Self::Network, Self::Interface];

    /// Name used by NSoT (`resource_name`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "Device",
            Self::Network => "Network",
            Self::Interface => "Interface",
        }
    }

    /// Lowercase name used on the command line and in config
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Network => "network",
            Self::Interface => "interface",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote collection an inventory call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Devices,
    Networks,
    Interfaces,
    Attributes,
}

impl Collection {
    /// Path segment of the collection
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Devices => "devices",
            Self::Networks => "networks",
            Self::Interfaces => "interfaces",
            Self::Attributes => "attributes",
        }
    }

    /// Singular noun used in notices
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Devices => "device",
            Self::Networks => "network",
            Self::Interfaces => "interface",
            Self::Attributes => "attribute",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ResourceKind> for Collection {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Device => Self::Devices,
            ResourceKind::Network => Self::Networks,
            ResourceKind::Interface => Self::Interfaces,
        }
    }
}

/// A host known to the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Device {
    /// Create a device, rejecting an empty hostname
    pub fn new(hostname: impl Into<String>) -> Result<Self> {
        let hostname = hostname.into();
        if hostname.trim().is_empty() {
            return Err(Error::invalid_input("device hostname cannot be empty"));
        }
        Ok(Self {
            hostname,
            attributes: Attributes::new(),
        })
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Allocation state of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    #[default]
    Assigned,
    Allocated,
    Orphaned,
    Reserved,
}

/// An IP network or host address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub network_address: String,
    pub prefix_length: u8,
    pub is_ip: bool,
    #[serde(default)]
    pub state: NetworkState,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Network {
    /// Create a network from an address and prefix length
    ///
    /// A `%zone` suffix on the address is stripped. The prefix must fit the
    /// address family. `is_ip` is set when the prefix covers a single host.
    pub fn new(address: &str, prefix_length: u8) -> Result<Self> {
        let ip = parse_address(address)?;
        let max = max_prefix(&ip);
        if prefix_length > max {
            return Err(Error::invalid_input(format!(
                "prefix length {prefix_length} out of range for {ip} (max {max})"
            )));
        }

        Ok(Self {
            network_address: ip.to_string(),
            prefix_length,
            is_ip: prefix_length == max,
            state: NetworkState::Assigned,
            attributes: Attributes::new(),
        })
    }

    /// Create a single-host network (/32 or /128) for an address
    pub fn host(ip: IpAddr) -> Self {
        Self {
            network_address: ip.to_string(),
            prefix_length: max_prefix(&ip),
            is_ip: true,
            state: NetworkState::Assigned,
            attributes: Attributes::new(),
        }
    }

    /// Parse an `address/prefix` string
    pub fn from_cidr(cidr: &str) -> Result<Self> {
        let (address, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| Error::invalid_input(format!("missing prefix length in {cidr:?}")))?;
        let prefix_length = prefix
            .parse::<u8>()
            .map_err(|e| Error::invalid_input(format!("bad prefix length in {cidr:?}: {e}")))?;
        Self::new(address, prefix_length)
    }

    /// CIDR notation, used as the display label
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network_address, self.prefix_length)
    }
}

/// Parse an IP address, dropping any link-local zone suffix
pub fn parse_address(address: &str) -> Result<IpAddr> {
    let bare = address.split('%').next().unwrap_or(address);
    bare.parse::<IpAddr>()
        .map_err(|e| Error::invalid_input(format!("invalid IP address {address:?}: {e}")))
}

fn max_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Reference from an interface to its device
///
/// Collectors fill in the hostname; the reconciler swaps it for the remote id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceRef {
    Id(u64),
    Hostname(String),
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Hostname(name) => f.write_str(name),
        }
    }
}

impl From<&str> for DeviceRef {
    fn from(value: &str) -> Self {
        Self::Hostname(value.to_string())
    }
}

impl From<String> for DeviceRef {
    fn from(value: String) -> Self {
        Self::Hostname(value)
    }
}

impl From<u64> for DeviceRef {
    fn from(value: u64) -> Self {
        Self::Id(value)
    }
}

/// A network interface on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub device: DeviceRef,
    pub mac_address: String,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(rename = "type", default = "default_interface_type")]
    pub interface_type: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: Attributes,
}

fn default_interface_type() -> u32 {
    DEFAULT_INTERFACE_TYPE
}

impl Interface {
    /// Create an interface with no addresses and a null MAC
    pub fn new(name: impl Into<String>, device: impl Into<DeviceRef>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid_input("interface name cannot be empty"));
        }
        Ok(Self {
            name,
            device: device.into(),
            mac_address: NULL_MAC_ADDRESS.to_string(),
            addresses: Vec::new(),
            interface_type: DEFAULT_INTERFACE_TYPE,
            description: String::new(),
            attributes: Attributes::new(),
        })
    }

    pub fn with_mac_address(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = mac.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an `address/prefix` entry after validating it
    pub fn with_address(mut self, cidr: &str) -> Result<Self> {
        let network = Network::from_cidr(cidr)?;
        self.addresses.push(network.cidr());
        Ok(self)
    }

    /// `device:interface`, used as the display label
    pub fn label(&self) -> String {
        format!("{}:{}", self.device, self.name)
    }
}

/// An attribute schema entry in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub resource_name: ResourceKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multi: bool,
}

impl AttributeDefinition {
    /// Non-required, non-displayed, single-valued definition
    pub fn new(name: impl Into<String>, resource_name: ResourceKind) -> Self {
        Self {
            name: name.into(),
            resource_name,
            description: String::new(),
            display: false,
            required: false,
            multi: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn displayed(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// `Kind.name`, used as the display label
    pub fn label(&self) -> String {
        format!("{}.{}", self.resource_name, self.name)
    }

    /// Identity fields used to find an existing definition
    pub fn lookup_filter(&self) -> Filter {
        Filter::from([
            ("name".to_string(), self.name.clone()),
            ("resource_name".to_string(), self.resource_name.to_string()),
        ])
    }
}

/// Everything one invocation intends to exist remotely
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of resources across all kinds
    pub fn len(&self) -> usize {
        self.devices.len() + self.networks.len() + self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resource the reconciler knows how to look up and write
pub trait Resource: Serialize {
    /// Kind of this resource
    const KIND: ResourceKind;

    /// Label used in notices
    fn label(&self) -> String;

    /// Identity fields used for the existence lookup
    ///
    /// Attributes never participate: they are written, not matched on.
    fn lookup_filter(&self) -> Filter;
}

impl Resource for Device {
    const KIND: ResourceKind = ResourceKind::Device;

    fn label(&self) -> String {
        self.hostname.clone()
    }

    fn lookup_filter(&self) -> Filter {
        Filter::from([("hostname".to_string(), self.hostname.clone())])
    }
}

impl Resource for Network {
    const KIND: ResourceKind = ResourceKind::Network;

    fn label(&self) -> String {
        self.cidr()
    }

    fn lookup_filter(&self) -> Filter {
        Filter::from([
            ("network_address".to_string(), self.network_address.clone()),
            ("prefix_length".to_string(), self.prefix_length.to_string()),
        ])
    }
}

impl Resource for Interface {
    const KIND: ResourceKind = ResourceKind::Interface;

    fn label(&self) -> String {
        Interface::label(self)
    }

    fn lookup_filter(&self) -> Filter {
        Filter::from([
            ("device".to_string(), self.device.to_string()),
            ("name".to_string(), self.name.clone()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_strips_zone_suffix() {
        let net = Network::new("fe80::1%eth0", 128).unwrap();
        assert_eq!(net.network_address, "fe80::1");
        assert!(net.is_ip);
    }

    #[test]
    fn test_network_prefix_range() {
        assert!(Network::new("10.0.0.1", 32).is_ok());
        assert!(Network::new("10.0.0.1", 33).is_err());
        assert!(Network::new("2001:db8::1", 128).is_ok());
        assert!(Network::new("2001:db8::1", 129).is_err());
        assert!(Network::new("not-an-ip", 24).is_err());
    }

    #[test]
    fn test_network_from_cidr() {
        let net = Network::from_cidr("10.0.0.5/24").unwrap();
        assert_eq!(net.network_address, "10.0.0.5");
        assert_eq!(net.prefix_length, 24);
        assert!(!net.is_ip);
        assert_eq!(net.cidr(), "10.0.0.5/24");
        assert!(Network::from_cidr("10.0.0.5").is_err());
    }

    #[test]
    fn test_host_network_prefix() {
        let v4 = Network::host("192.168.1.10".parse().unwrap());
        assert_eq!(v4.prefix_length, 32);
        let v6 = Network::host("2001:db8::10".parse().unwrap());
        assert_eq!(v6.prefix_length, 128);
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(Device::new("").is_err());
        assert!(Device::new("   ").is_err());
        assert!(Interface::new("", "router1").is_err());
    }

    #[test]
    fn test_interface_serialization() {
        let intf = Interface::new("eth0", "router1")
            .unwrap()
            .with_address("10.0.0.5/24")
            .unwrap();
        let json = serde_json::to_value(&intf).unwrap();
        assert_eq!(json["type"], 6);
        assert_eq!(json["device"], "router1");
        assert_eq!(json["addresses"][0], "10.0.0.5/24");

        let resolved = Interface {
            device: DeviceRef::Id(7),
            ..intf
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["device"], 7);
        assert_eq!(resolved.label(), "7:eth0");
    }

    #[test]
    fn test_lookup_filter_excludes_attributes() {
        let device = Device::new("router1").unwrap().with_attribute("rack", "r1");
        let filter = device.lookup_filter();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter["hostname"], "router1");
    }

    #[test]
    fn test_resource_kind_names() {
        assert_eq!(
            serde_json::to_value(ResourceKind::Interface).unwrap(),
            "Interface"
        );
        assert_eq!(ResourceKind::Network.cli_name(), "network");
    }
}
