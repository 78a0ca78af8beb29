//! Reconciler
//!
//! Converges the inventory towards a [`DesiredState`]. Devices are written
//! first, then networks, then interfaces, so an interface never reaches the
//! inventory before the device it points at.
//!
//! Every resource goes through the same three steps:
//!
//! ```text
//! lookup(identity filter) ──► 0 matches ──► create(body + site_id)
//!                         └─► N matches ──► update(first id, body + id + site_id)
//! ```

use super::classify::{self, Classification};
use crate::error::{InventoryError, Result};
use crate::model::{Collection, DesiredState, DeviceRef, Filter, Interface, Resource, ResourceKind};
use crate::notify::Notice;
use crate::traits::{InventoryClient, Notifier};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};

/// What happened to one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    /// Rejected with a known, expected reason
    Skipped,
    /// Rejected, unexpected response, or unusable local data
    Failed,
}

/// Counts for one resource kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl KindReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.created + self.updated
    }

    pub fn attempted(&self) -> usize {
        self.succeeded() + self.skipped + self.failed
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub devices: KindReport,
    pub networks: KindReport,
    pub interfaces: KindReport,
}

impl ReconcileReport {
    pub fn kind(&self, kind: ResourceKind) -> &KindReport {
        match kind {
            ResourceKind::Device => &self.devices,
            ResourceKind::Network => &self.networks,
            ResourceKind::Interface => &self.interfaces,
        }
    }

    fn kind_mut(&mut self, kind: ResourceKind) -> &mut KindReport {
        match kind {
            ResourceKind::Device => &mut self.devices,
            ResourceKind::Network => &mut self.networks,
            ResourceKind::Interface => &mut self.interfaces,
        }
    }

    pub fn succeeded(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.kind(*kind).succeeded())
            .sum()
    }

    pub fn attempted(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.kind(*kind).attempted())
            .sum()
    }

    /// Resources were attempted and not one of them was written
    pub fn is_total_failure(&self) -> bool {
        self.attempted() > 0 && self.succeeded() == 0
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = ResourceKind::ALL
            .iter()
            .map(|kind| {
                let r = self.kind(*kind);
                format!(
                    "{}: {} created, {} updated, {} skipped, {} failed",
                    Collection::from(*kind),
                    r.created,
                    r.updated,
                    r.skipped,
                    r.failed
                )
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Writes a desired-state document into one site
pub struct Reconciler<'a> {
    client: &'a dyn InventoryClient,
    notifier: &'a dyn Notifier,
    site_id: u64,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a dyn InventoryClient, notifier: &'a dyn Notifier, site_id: u64) -> Self {
        Self {
            client,
            notifier,
            site_id,
        }
    }

    /// Reconcile every resource in the document
    ///
    /// Returns `Err` only when the inventory becomes unreachable; the pass
    /// stops at that point without issuing further calls.
    pub async fn reconcile(&self, document: DesiredState) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        info!(
            "Reconciling {} devices, {} networks, {} interfaces in site {}",
            document.devices.len(),
            document.networks.len(),
            document.interfaces.len(),
            self.site_id
        );

        for device in &document.devices {
            let outcome = self.reconcile_one(device, device.label()).await?;
            report.kind_mut(ResourceKind::Device).record(outcome);
        }

        for network in &document.networks {
            let outcome = self.reconcile_one(network, network.label()).await?;
            report.kind_mut(ResourceKind::Network).record(outcome);
        }

        for interface in document.interfaces {
            // Keep the hostname in the label after the device is resolved
            let label = Resource::label(&interface);
            let outcome = match self.resolve_device(interface).await? {
                Resolution::Resolved(resolved) => self.reconcile_one(&resolved, label).await?,
                Resolution::Abandoned(outcome) => outcome,
            };
            report.kind_mut(ResourceKind::Interface).record(outcome);
        }

        info!("Reconcile finished: {}", report);
        Ok(report)
    }

    /// Lookup, then create or update a single resource
    async fn reconcile_one<R: Resource + Sync>(&self, resource: &R, label: String) -> Result<Outcome> {
        let collection = Collection::from(R::KIND);

        let matches = match self
            .client
            .lookup(self.site_id, collection, &resource.lookup_filter())
            .await
        {
            Ok(matches) => matches,
            Err(err) => return self.fail(collection, &label, err),
        };

        let existing = matches.first().map(|record| record.id);
        let mut body = serde_json::to_value(resource)?;
        match &mut body {
            Value::Object(fields) => {
                fields.insert("site_id".to_string(), Value::from(self.site_id));
                if let Some(id) = existing {
                    fields.insert("id".to_string(), Value::from(id));
                }
            }
            _ => {
                return self.fail(
                    collection,
                    &label,
                    InventoryError::unexpected("resource did not serialize to an object"),
                );
            }
        }

        match existing {
            None => {
                debug!("{} {} not found, creating", collection.noun(), label);
                match self.client.create(self.site_id, collection, &body).await {
                    Ok(_) => {
                        self.notifier.notify(Notice::success(format!("{label} created!")));
                        Ok(Outcome::Created)
                    }
                    Err(err) => self.fail(collection, &label, err),
                }
            }
            Some(id) => {
                debug!(
                    "{} {} found as id {} ({} matches), updating",
                    collection.noun(),
                    label,
                    id,
                    matches.len()
                );
                match self.client.update(self.site_id, collection, id, &body).await {
                    Ok(_) => {
                        self.notifier.notify(Notice::success(format!("{label} updated!")));
                        Ok(Outcome::Updated)
                    }
                    Err(err) => self.fail(collection, &label, err),
                }
            }
        }
    }

    /// Swap an interface's device hostname for the device's remote id
    ///
    /// Unknown hostnames fall back to a numeric reading of the reference.
    /// An interface whose reference cannot be resolved is abandoned with the
    /// outcome of the failed lookup, or `Failed` for an unknown hostname.
    async fn resolve_device(&self, mut interface: Interface) -> Result<Resolution> {
        let DeviceRef::Hostname(hostname) = &interface.device else {
            return Ok(Resolution::Resolved(interface));
        };

        let filter = Filter::from([("hostname".to_string(), hostname.clone())]);
        let matches = match self
            .client
            .lookup(self.site_id, Collection::Devices, &filter)
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                let outcome = self.fail(Collection::Interfaces, &interface.label(), err)?;
                return Ok(Resolution::Abandoned(outcome));
            }
        };

        let resolved = match matches.first() {
            Some(device) => device.id,
            None => match hostname.parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    self.notifier.notify(Notice::error(format!(
                        "interface {}: device {:?} not found in site {}",
                        interface.label(),
                        hostname,
                        self.site_id
                    )));
                    return Ok(Resolution::Abandoned(Outcome::Failed));
                }
            },
        };

        interface.device = DeviceRef::Id(resolved);
        Ok(Resolution::Resolved(interface))
    }

    fn fail(&self, collection: Collection, label: &str, err: InventoryError) -> Result<Outcome> {
        Ok(match classify::route(self.notifier, collection, label, err)? {
            Classification::ExpectedPrecondition { .. } => Outcome::Skipped,
            _ => Outcome::Failed,
        })
    }
}

/// Result of swapping an interface's device reference for an id
enum Resolution {
    Resolved(Interface),
    Abandoned(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let mut report = ReconcileReport::default();
        assert!(!report.is_total_failure());

        report.kind_mut(ResourceKind::Network).record(Outcome::Failed);
        report.kind_mut(ResourceKind::Interface).record(Outcome::Skipped);
        assert_eq!(report.attempted(), 2);
        assert!(report.is_total_failure());

        report.kind_mut(ResourceKind::Device).record(Outcome::Created);
        assert_eq!(report.succeeded(), 1);
        assert!(!report.is_total_failure());
    }

    #[test]
    fn test_report_display() {
        let mut report = ReconcileReport::default();
        report.kind_mut(ResourceKind::Device).record(Outcome::Updated);
        let text = report.to_string();
        assert!(text.starts_with("devices: 0 created, 1 updated"));
        assert!(text.contains("interfaces: 0 created"));
    }
}
