//! Configuration types for nsot-sync
//!
//! This module defines all configuration structures used throughout the crate.

use crate::model::{Attributes, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Main nsot-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Inventory site every resource is scoped to
    #[serde(default = "default_site_id")]
    pub site_id: u64,

    /// Collect, overlay and ensure attributes, then print instead of writing
    #[serde(default)]
    pub noop: bool,

    /// Which collector builds the desired state
    pub collector: CollectorConfig,

    /// Inventory connection settings
    pub inventory: InventoryConfig,

    /// Operator-supplied static attributes per resource kind
    #[serde(default)]
    pub overlays: AttributeOverlays,
}

impl SyncConfig {
    /// Create a configuration for a collector and inventory with defaults
    pub fn new(collector: CollectorConfig, inventory: InventoryConfig) -> Self {
        Self {
            site_id: default_site_id(),
            noop: false,
            collector,
            inventory,
            overlays: AttributeOverlays::default(),
        }
    }

    pub fn with_site_id(mut self, site_id: u64) -> Self {
        self.site_id = site_id;
        self
    }

    pub fn with_noop(mut self, noop: bool) -> Self {
        self.noop = noop;
        self
    }

    pub fn with_overlays(mut self, overlays: AttributeOverlays) -> Self {
        self.overlays = overlays;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.site_id == 0 {
            return Err(crate::Error::config("site id must be a positive integer"));
        }

        self.collector.validate()?;
        self.inventory.validate()?;
        self.overlays.validate()?;

        Ok(())
    }
}

fn default_site_id() -> u64 {
    1
}

/// Static attributes to merge into every resource of a kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOverlays {
    #[serde(default)]
    pub device: Attributes,
    #[serde(default)]
    pub network: Attributes,
    #[serde(default)]
    pub interface: Attributes,
}

impl AttributeOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attributes for one kind
    pub fn get(&self, kind: ResourceKind) -> &Attributes {
        match kind {
            ResourceKind::Device => &self.device,
            ResourceKind::Network => &self.network,
            ResourceKind::Interface => &self.interface,
        }
    }

    fn get_mut(&mut self, kind: ResourceKind) -> &mut Attributes {
        match kind {
            ResourceKind::Device => &mut self.device,
            ResourceKind::Network => &mut self.network,
            ResourceKind::Interface => &mut self.interface,
        }
    }

    pub fn insert(&mut self, kind: ResourceKind, key: impl Into<String>, value: impl Into<String>) {
        self.get_mut(kind).insert(key.into(), value.into());
    }

    pub fn with(mut self, kind: ResourceKind, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(kind, key, value);
        self
    }

    /// Add a `key=value` pair as given on the command line
    pub fn insert_pair(&mut self, kind: ResourceKind, pair: &str) -> Result<(), crate::Error> {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            crate::Error::config(format!(
                "{} attribute {pair:?} must look like key=value",
                kind.cli_name()
            ))
        })?;
        self.insert(kind, key.trim(), value.trim());
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.device.is_empty() && self.network.is_empty() && self.interface.is_empty()
    }

    /// Validate attribute names
    pub fn validate(&self) -> Result<(), crate::Error> {
        for kind in ResourceKind::ALL {
            if self.get(kind).keys().any(|key| key.is_empty()) {
                return Err(crate::Error::config(format!(
                    "{} attribute names cannot be empty",
                    kind.cli_name()
                )));
            }
        }
        Ok(())
    }
}

/// How the local collector picks a prefix length for each address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixMode {
    /// One host network per address (/32 or /128)
    #[default]
    Host,
    /// Use the prefix length configured on the interface
    Interface,
}

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectorConfig {
    /// Local interfaces only
    Simple {
        /// Interfaces whose name starts with one of these are skipped
        #[serde(default = "default_ignore_prefixes")]
        ignore_prefixes: Vec<String>,
        /// Prefix length policy
        #[serde(default)]
        prefix_mode: PrefixMode,
    },

    /// Local interfaces plus facts reported by `facter`
    Facter {
        /// Interfaces whose name starts with one of these are skipped
        #[serde(default = "default_ignore_prefixes")]
        ignore_prefixes: Vec<String>,
        /// Prefix length policy
        #[serde(default)]
        prefix_mode: PrefixMode,
        /// Command line that prints facts as JSON
        #[serde(default = "default_facter_command")]
        command: String,
        /// Device attribute name → candidate fact paths, first found wins
        #[serde(default = "default_facts")]
        facts: BTreeMap<String, Vec<String>>,
    },

    /// Custom collector
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl CollectorConfig {
    /// Default configuration for the `simple` driver
    pub fn simple() -> Self {
        Self::Simple {
            ignore_prefixes: default_ignore_prefixes(),
            prefix_mode: PrefixMode::default(),
        }
    }

    /// Default configuration for the `facter` driver
    pub fn facter() -> Self {
        Self::Facter {
            ignore_prefixes: default_ignore_prefixes(),
            prefix_mode: PrefixMode::default(),
            command: default_facter_command(),
            facts: default_facts(),
        }
    }

    /// Override the prefix mode of a built-in collector
    pub fn with_prefix_mode(mut self, mode: PrefixMode) -> Self {
        match &mut self {
            Self::Simple { prefix_mode, .. } | Self::Facter { prefix_mode, .. } => {
                *prefix_mode = mode;
            }
            Self::Custom { .. } => {}
        }
        self
    }

    /// Validate the collector configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CollectorConfig::Simple { .. } => Ok(()),
            CollectorConfig::Facter { command, facts, .. } => {
                if command.trim().is_empty() {
                    return Err(crate::Error::config("facter command cannot be empty"));
                }
                if facts.values().any(|paths| paths.is_empty()) {
                    return Err(crate::Error::config(
                        "every facter attribute needs at least one fact path",
                    ));
                }
                Ok(())
            }
            CollectorConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom collector factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom collector config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the driver name
    pub fn type_name(&self) -> &str {
        match self {
            CollectorConfig::Simple { .. } => "simple",
            CollectorConfig::Facter { .. } => "facter",
            CollectorConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::simple()
    }
}

fn default_ignore_prefixes() -> Vec<String> {
    ["lo", "docker", "fw0"].iter().map(|s| s.to_string()).collect()
}

fn default_facter_command() -> String {
    "facter -p --json".to_string()
}

fn default_facts() -> BTreeMap<String, Vec<String>> {
    [
        ("os", &["os.name", "operatingsystem"][..]),
        ("os_release", &["os.release.full", "operatingsystemrelease"][..]),
        ("kernel", &["kernelrelease"][..]),
        ("virtual", &["virtual"][..]),
        ("serial", &["dmi.product.serial_number", "serialnumber"][..]),
        ("model", &["dmi.product.name", "productname"][..]),
        ("vendor", &["dmi.manufacturer", "manufacturer"][..]),
    ]
    .into_iter()
    .map(|(name, paths)| {
        (
            name.to_string(),
            paths.iter().map(|p| p.to_string()).collect(),
        )
    })
    .collect()
}

/// How the client authenticates against NSoT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Exchange email + secret key for a session key
    #[default]
    AuthToken,
    /// Send the email in a trusted header (behind an auth proxy)
    AuthHeader,
}

/// Inventory connection configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryConfig {
    /// NSoT REST API
    Nsot {
        /// Base URL, e.g. "https://nsot.example.com"
        url: String,
        /// User email
        email: String,
        /// Secret key (required for `auth_token`)
        #[serde(default)]
        secret_key: Option<String>,
        /// Authentication method
        #[serde(default)]
        auth_method: AuthMethod,
        /// Header carrying the email for `auth_header`
        #[serde(default = "default_auth_header")]
        auth_header: String,
        /// Request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom inventory client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Custom Debug implementation that hides the secret key
impl fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryConfig::Nsot {
                url,
                email,
                secret_key,
                auth_method,
                auth_header,
                timeout_secs,
            } => f
                .debug_struct("Nsot")
                .field("url", url)
                .field("email", email)
                .field("secret_key", &secret_key.as_ref().map(|_| "<REDACTED>"))
                .field("auth_method", auth_method)
                .field("auth_header", auth_header)
                .field("timeout_secs", timeout_secs)
                .finish(),
            InventoryConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl InventoryConfig {
    /// NSoT configuration using token authentication
    pub fn nsot(url: impl Into<String>, email: impl Into<String>, secret_key: impl Into<String>) -> Self {
        InventoryConfig::Nsot {
            url: url.into(),
            email: email.into(),
            secret_key: Some(secret_key.into()),
            auth_method: AuthMethod::AuthToken,
            auth_header: default_auth_header(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Validate the inventory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            InventoryConfig::Nsot {
                url,
                email,
                secret_key,
                auth_method,
                auth_header,
                timeout_secs,
            } => {
                if url.is_empty() {
                    return Err(crate::Error::config("NSoT URL cannot be empty"));
                }
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(crate::Error::config(format!(
                        "NSoT URL must use HTTP or HTTPS scheme. Got: {url}"
                    )));
                }
                if email.is_empty() {
                    return Err(crate::Error::config("NSoT email cannot be empty"));
                }
                if *auth_method == AuthMethod::AuthToken
                    && secret_key.as_deref().is_none_or(str::is_empty)
                {
                    return Err(crate::Error::config(
                        "NSoT secret key is required for auth_token authentication",
                    ));
                }
                if *auth_method == AuthMethod::AuthHeader && auth_header.is_empty() {
                    return Err(crate::Error::config("NSoT auth header cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("NSoT timeout must be > 0"));
                }
                Ok(())
            }
            InventoryConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom inventory factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom inventory config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the client type name
    pub fn type_name(&self) -> &str {
        match self {
            InventoryConfig::Nsot { .. } => "nsot",
            InventoryConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_auth_header() -> String {
    "X-NSoT-Email".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}
