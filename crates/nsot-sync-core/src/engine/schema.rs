//! Attribute schema ensurer
//!
//! Makes sure every attribute definition a run depends on exists remotely
//! before any resource carrying that attribute is written. Existing
//! definitions are left alone, never updated.

use super::classify::{self, Classification};
use crate::error::Result;
use crate::model::{AttributeDefinition, Collection};
use crate::notify::Notice;
use crate::traits::{InventoryClient, Notifier};
use serde_json::Value;
use tracing::debug;

/// Per-definition counts of one `ensure` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureReport {
    pub created: usize,
    pub present: usize,
    pub failed: usize,
}

/// Creates missing attribute definitions in one site
pub struct SchemaEnsurer<'a> {
    client: &'a dyn InventoryClient,
    notifier: &'a dyn Notifier,
    site_id: u64,
}

impl<'a> SchemaEnsurer<'a> {
    pub fn new(client: &'a dyn InventoryClient, notifier: &'a dyn Notifier, site_id: u64) -> Self {
        Self {
            client,
            notifier,
            site_id,
        }
    }

    /// Ensure each definition exists
    ///
    /// Every definition is attempted. Rejections are reported and counted;
    /// only an unreachable inventory stops the pass early.
    pub async fn ensure(&self, definitions: &[AttributeDefinition]) -> Result<EnsureReport> {
        let mut report = EnsureReport::default();

        for definition in definitions {
            let label = definition.label();

            match self.exists(definition).await {
                Ok(true) => {
                    self.notifier
                        .notify(Notice::info(format!("attribute {label} already present")));
                    report.present += 1;
                    continue;
                }
                Ok(false) => {}
                Err(err) => {
                    classify::route(self.notifier, Collection::Attributes, &label, err)?;
                    report.failed += 1;
                    continue;
                }
            }

            let body = self.body(definition)?;
            match self
                .client
                .create(self.site_id, Collection::Attributes, &body)
                .await
            {
                Ok(record) => {
                    debug!("attribute {} created with id {}", label, record.id);
                    self.notifier
                        .notify(Notice::success(format!("attribute {label} created!")));
                    report.created += 1;
                }
                Err(err) => {
                    match classify::route(self.notifier, Collection::Attributes, &label, err)? {
                        Classification::ExpectedPrecondition { .. } => report.present += 1,
                        _ => report.failed += 1,
                    }
                }
            }
        }

        Ok(report)
    }

    async fn exists(
        &self,
        definition: &AttributeDefinition,
    ) -> std::result::Result<bool, crate::error::InventoryError> {
        let matches = self
            .client
            .lookup(self.site_id, Collection::Attributes, &definition.lookup_filter())
            .await?;
        Ok(!matches.is_empty())
    }

    fn body(&self, definition: &AttributeDefinition) -> Result<Value> {
        let mut body = serde_json::to_value(definition)?;
        if let Value::Object(map) = &mut body {
            map.insert("site_id".to_string(), Value::from(self.site_id));
        }
        Ok(body)
    }
}
