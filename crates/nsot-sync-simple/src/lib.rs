// # Simple Collector
//
// Describes the local host from its network interfaces alone: one device
// for the hostname, one interface per kept link, one network per address.
// No attributes are set and no attribute schema is published.
//
// ## Translation Rules
//
// - Links whose name starts with an ignored prefix (`lo`, `docker`, `fw0`
//   by default) are skipped
// - IPv4 and IPv6 addresses are kept; a `%zone` suffix is dropped
// - Host prefix mode gives every address a /32 or /128 network; interface
//   mode uses the prefix length configured on the link
// - The MAC comes from the link layer, `00:00:00:00:00:00` when unknown
// - Interfaces get type 6 and the description `"<name> on <hostname>"`
//
// Interface enumeration uses `pnet::datalink`, the hostname comes from
// `sysinfo`. Both are read once per `collect()`.

use async_trait::async_trait;
use nsot_sync_core::model::{DesiredState, Device, Interface, Network};
use nsot_sync_core::traits::{Collector, CollectorFactory};
use nsot_sync_core::{CollectorConfig, DriverRegistry, Error, PrefixMode, Result};
use pnet::datalink::{self, NetworkInterface};
use pnet::util::MacAddr;
use std::net::IpAddr;
use tracing::{debug, info};

/// A network link as seen on the host, independent of the OS API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    /// Hardware address, `None` when the link has none
    pub mac: Option<String>,
    /// Addresses with the prefix length configured on the link
    pub addresses: Vec<(IpAddr, u8)>,
}

impl From<&NetworkInterface> for HostInterface {
    fn from(link: &NetworkInterface) -> Self {
        Self {
            name: link.name.clone(),
            mac: link
                .mac
                .filter(|mac| *mac != MacAddr::zero())
                .map(|mac| mac.to_string()),
            addresses: link
                .ips
                .iter()
                .map(|network| (network.ip(), network.prefix()))
                .collect(),
        }
    }
}

/// Collector for the `simple` driver
#[derive(Debug, Clone)]
pub struct SimpleCollector {
    ignore_prefixes: Vec<String>,
    prefix_mode: PrefixMode,
}

impl SimpleCollector {
    pub fn new(ignore_prefixes: Vec<String>, prefix_mode: PrefixMode) -> Self {
        Self {
            ignore_prefixes,
            prefix_mode,
        }
    }

    /// Build from a `simple` or `facter` collector configuration
    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        match config {
            CollectorConfig::Simple {
                ignore_prefixes,
                prefix_mode,
            }
            | CollectorConfig::Facter {
                ignore_prefixes,
                prefix_mode,
                ..
            } => Ok(Self::new(ignore_prefixes.clone(), *prefix_mode)),
            _ => Err(Error::config("Invalid config for simple collector")),
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Translate host links into a desired-state document
    pub fn build(&self, hostname: &str, links: &[HostInterface]) -> Result<DesiredState> {
        let mut document = DesiredState::new();
        document.devices.push(Device::new(hostname)?);

        for link in links {
            if self.is_ignored(&link.name) {
                debug!("Skipping ignored interface {}", link.name);
                continue;
            }

            let mut interface = Interface::new(link.name.as_str(), hostname)?
                .with_description(format!("{} on {}", link.name, hostname));
            if let Some(mac) = &link.mac {
                interface = interface.with_mac_address(mac.as_str());
            }

            for (address, prefix) in &link.addresses {
                let network = match self.prefix_mode {
                    PrefixMode::Host => Network::host(*address),
                    PrefixMode::Interface => Network::new(&address.to_string(), *prefix)?,
                };
                interface = interface.with_address(&network.cidr())?;
                document.networks.push(network);
            }

            document.interfaces.push(interface);
        }

        Ok(document)
    }

    /// Read the hostname and links of the local machine
    pub fn local_links() -> Result<(String, Vec<HostInterface>)> {
        let hostname = sysinfo::System::host_name()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::collector("unable to determine local hostname"))?;

        let links = datalink::interfaces()
            .iter()
            .map(HostInterface::from)
            .collect();
        Ok((hostname, links))
    }
}

#[async_trait]
impl Collector for SimpleCollector {
    async fn collect(&self) -> Result<DesiredState> {
        let (hostname, links) = Self::local_links()?;
        info!("Found {} interfaces on {}", links.len(), hostname);
        self.build(&hostname, &links)
    }

    fn collector_name(&self) -> &'static str {
        "simple"
    }
}

/// Factory for creating simple collectors
pub struct SimpleFactory;

impl CollectorFactory for SimpleFactory {
    fn create(&self, config: &CollectorConfig) -> Result<Box<dyn Collector>> {
        Ok(Box::new(SimpleCollector::from_config(config)?))
    }
}

/// Register the simple collector with a registry
pub fn register(registry: &DriverRegistry) {
    registry.register_collector("simple", Box::new(SimpleFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsot_sync_core::model::{DEFAULT_INTERFACE_TYPE, NULL_MAC_ADDRESS};
    use pnet::ipnetwork::IpNetwork;

    fn link(name: &str, addresses: &[&str]) -> HostInterface {
        HostInterface {
            name: name.to_string(),
            mac: Some("52:54:00:12:34:56".to_string()),
            addresses: addresses
                .iter()
                .map(|cidr| {
                    let (ip, prefix) = cidr.split_once('/').unwrap();
                    (ip.parse().unwrap(), prefix.parse().unwrap())
                })
                .collect(),
        }
    }

    fn collector(mode: PrefixMode) -> SimpleCollector {
        let config = CollectorConfig::simple().with_prefix_mode(mode);
        SimpleCollector::from_config(&config).unwrap()
    }

    #[test]
    fn test_host_mode_one_host_network_per_address() {
        let links = vec![
            link("eth0", &["10.0.0.5/24", "10.0.0.6/24", "2001:db8::5/64"]),
            link("eth1", &["192.168.1.2/16"]),
        ];

        let doc = collector(PrefixMode::Host).build("web1", &links).unwrap();

        assert_eq!(doc.networks.len(), 4);
        for network in &doc.networks {
            let expected = if network.network_address.contains(':') { 128 } else { 32 };
            assert_eq!(network.prefix_length, expected);
            assert!(network.is_ip);
        }
        assert_eq!(
            doc.interfaces[0].addresses,
            vec!["10.0.0.5/32", "10.0.0.6/32", "2001:db8::5/128"]
        );
    }

    #[test]
    fn test_interface_mode_router1() {
        let links = vec![link("eth0", &["10.0.0.5/24"])];

        let doc = collector(PrefixMode::Interface).build("router1", &links).unwrap();

        assert_eq!(doc.devices.len(), 1);
        assert_eq!(doc.devices[0].hostname, "router1");

        assert_eq!(doc.networks.len(), 1);
        assert_eq!(doc.networks[0].cidr(), "10.0.0.5/24");
        assert!(!doc.networks[0].is_ip);

        let eth0 = &doc.interfaces[0];
        assert_eq!(eth0.name, "eth0");
        assert_eq!(eth0.device.to_string(), "router1");
        assert_eq!(eth0.addresses, vec!["10.0.0.5/24"]);
        assert_eq!(eth0.mac_address, "52:54:00:12:34:56");
        assert_eq!(eth0.interface_type, DEFAULT_INTERFACE_TYPE);
        assert_eq!(eth0.description, "eth0 on router1");
    }

    #[test]
    fn test_ignored_prefixes_skipped() {
        let links = vec![
            link("lo", &["127.0.0.1/8"]),
            link("docker0", &["172.17.0.1/16"]),
            link("fw0", &[]),
            link("eth0", &["10.0.0.5/24"]),
        ];

        let doc = collector(PrefixMode::Host).build("web1", &links).unwrap();

        assert_eq!(doc.interfaces.len(), 1);
        assert_eq!(doc.interfaces[0].name, "eth0");
        assert_eq!(doc.networks.len(), 1);
    }

    #[test]
    fn test_link_without_mac_or_addresses() {
        let links = vec![HostInterface {
            name: "tun0".to_string(),
            mac: None,
            addresses: Vec::new(),
        }];

        let doc = collector(PrefixMode::Host).build("web1", &links).unwrap();

        assert_eq!(doc.interfaces[0].mac_address, NULL_MAC_ADDRESS);
        assert!(doc.interfaces[0].addresses.is_empty());
        assert!(doc.networks.is_empty());
    }

    #[test]
    fn test_from_pnet_interface() {
        let pnet_link = NetworkInterface {
            name: "eth0".to_string(),
            description: String::new(),
            index: 2,
            mac: Some(MacAddr::new(0x52, 0x54, 0x00, 0x12, 0x34, 0x56)),
            ips: vec![
                "10.0.0.5/24".parse::<IpNetwork>().unwrap(),
                "fe80::1/64".parse::<IpNetwork>().unwrap(),
            ],
            flags: 0,
        };

        let link = HostInterface::from(&pnet_link);
        assert_eq!(link.mac.as_deref(), Some("52:54:00:12:34:56"));
        assert_eq!(link.addresses.len(), 2);
        assert_eq!(link.addresses[0], ("10.0.0.5".parse().unwrap(), 24));

        let zero = NetworkInterface {
            mac: Some(MacAddr::zero()),
            ..pnet_link
        };
        assert_eq!(HostInterface::from(&zero).mac, None);
    }

    #[test]
    fn test_empty_hostname_rejected() {
        assert!(collector(PrefixMode::Host).build("", &[]).is_err());
    }

    #[test]
    fn test_factory_rejects_custom_config() {
        let config = CollectorConfig::Custom {
            factory: "other".to_string(),
            config: serde_json::json!({}),
        };
        assert!(SimpleFactory.create(&config).is_err());
        assert!(SimpleFactory.create(&CollectorConfig::simple()).is_ok());
    }
}
