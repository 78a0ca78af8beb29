// # Facter Collector
//
// Runs the simple collection, then enriches the device with facts reported
// by `facter`.
//
// ## Fact Lookup
//
// Each device attribute maps to a list of candidate fact paths; the first
// one present wins. A path is looked up as a dotted path into structured
// facts (`os.release.full`) and then as a flat key (`operatingsystemrelease`),
// so both facter 2 and facter 3+ output work.
//
// ## Schema
//
// Every configured attribute is published as a displayed, non-required
// Device attribute, so the engine ensures it before any device is written.

use async_trait::async_trait;
use nsot_sync_core::model::{AttributeDefinition, Attributes, DesiredState, ResourceKind};
use nsot_sync_core::traits::{Collector, CollectorFactory};
use nsot_sync_core::{CollectorConfig, DriverRegistry, Error, Result};
use nsot_sync_simple::SimpleCollector;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Collector for the `facter` driver
#[derive(Debug, Clone)]
pub struct FacterCollector {
    local: SimpleCollector,
    command: String,
    facts: BTreeMap<String, Vec<String>>,
}

impl FacterCollector {
    pub fn new(local: SimpleCollector, command: impl Into<String>, facts: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            local,
            command: command.into(),
            facts,
        }
    }

    pub fn from_config(config: &CollectorConfig) -> Result<Self> {
        match config {
            CollectorConfig::Facter { command, facts, .. } => Ok(Self::new(
                SimpleCollector::from_config(config)?,
                command.clone(),
                facts.clone(),
            )),
            _ => Err(Error::config("Invalid config for facter collector")),
        }
    }

    /// Run the facter command and parse its JSON output
    ///
    /// Anything on stderr is logged as an error but does not fail the run;
    /// output that is not JSON does.
    pub async fn run_facter(&self) -> Result<Value> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::config("facter command cannot be empty"))?;

        debug!("Running {}", self.command);
        let output = Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|e| Error::collector(format!("failed to run `{}`: {}", self.command, e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            error!("{}: {}", program, stderr.trim());
        }
        if !output.status.success() {
            warn!("`{}` exited with {}", self.command, output.status);
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::collector(format!("`{}` did not print JSON: {}", self.command, e))
        })
    }

    /// Device attributes for every configured fact that is present
    pub fn device_attributes(&self, facts: &Value) -> Attributes {
        let mut attributes = Attributes::new();
        for (name, paths) in &self.facts {
            match paths.iter().find_map(|path| lookup_fact(facts, path)) {
                Some(value) => {
                    attributes.insert(name.clone(), value);
                }
                None => debug!("No fact found for attribute {} (tried {:?})", name, paths),
            }
        }
        attributes
    }

    /// Copy fact attributes onto every device of the document
    pub fn enrich(&self, document: &mut DesiredState, facts: &Value) {
        let attributes = self.device_attributes(facts);
        for device in &mut document.devices {
            device
                .attributes
                .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
}

/// Find a fact by dotted path, falling back to a flat key
///
/// Strings are returned as-is, numbers and booleans as their JSON text.
/// Null, objects and arrays do not count as a value.
pub fn lookup_fact(facts: &Value, path: &str) -> Option<String> {
    let nested = path
        .split('.')
        .try_fold(facts, |node, segment| node.get(segment));

    nested
        .and_then(fact_text)
        .or_else(|| facts.get(path).and_then(fact_text))
}

fn fact_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Collector for FacterCollector {
    async fn collect(&self) -> Result<DesiredState> {
        let mut document = self.local.collect().await?;
        let facts = self.run_facter().await?;
        self.enrich(&mut document, &facts);
        info!("Applied {} fact attributes", self.device_attributes(&facts).len());
        Ok(document)
    }

    fn required_attributes(&self) -> Vec<AttributeDefinition> {
        self.facts
            .iter()
            .map(|(name, paths)| {
                AttributeDefinition::new(name.clone(), ResourceKind::Device)
                    .with_description(format!("Facter: {}", paths.join(", ")))
                    .displayed(true)
            })
            .collect()
    }

    fn collector_name(&self) -> &'static str {
        "facter"
    }
}

/// Factory for creating facter collectors
pub struct FacterFactory;

impl CollectorFactory for FacterFactory {
    fn create(&self, config: &CollectorConfig) -> Result<Box<dyn Collector>> {
        Ok(Box::new(FacterCollector::from_config(config)?))
    }
}

/// Register the facter collector with a registry
pub fn register(registry: &DriverRegistry) {
    registry.register_collector("facter", Box::new(FacterFactory));
}
