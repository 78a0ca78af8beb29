//! Sync engine
//!
//! The SyncEngine is responsible for:
//! - Collecting the host's desired state via a Collector
//! - Overlaying operator attributes and declaring their definitions
//! - Ensuring every needed attribute definition exists remotely
//! - Reconciling devices, networks and interfaces (unless noop)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Collector  │─── DesiredState ───┐
//! └─────────────┘                    │
//!                                    ▼
//!                            ┌──────────────┐
//!                            │  SyncEngine  │
//!                            └──────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌───────────────┐          ┌──────────────┐           ┌─────────────┐
//! │ SchemaEnsurer │          │  Reconciler  │           │  Notifier   │
//! │ (attributes)  │          │ (resources)  │           │  (notices)  │
//! └───────────────┘          └──────────────┘           └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Collect the desired-state document
//! 2. Apply overlays, merge the driver schema with overlay definitions
//! 3. Ensure attribute definitions (also in noop mode)
//! 4. Noop: return the document; otherwise reconcile it

pub mod classify;
pub mod reconcile;
pub mod schema;

pub use classify::{Classification, classify};
pub use reconcile::{KindReport, Outcome, ReconcileReport, Reconciler};
pub use schema::{EnsureReport, SchemaEnsurer};

use crate::config::{AttributeOverlays, SyncConfig};
use crate::error::Result;
use crate::model::DesiredState;
use crate::overlay;
use crate::traits::{Collector, InventoryClient, Notifier};
use tracing::{debug, info};

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Noop run: the document that would have been reconciled
    Planned(DesiredState),
    /// The document was reconciled
    Reconciled(ReconcileReport),
}

/// Drives one invocation from collection to reconciliation
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run()`] once
/// 3. Drop
///
/// Remote calls are awaited one at a time; the engine never spawns tasks.
pub struct SyncEngine {
    collector: Box<dyn Collector>,
    client: Box<dyn InventoryClient>,
    notifier: Box<dyn Notifier>,
    site_id: u64,
    noop: bool,
    overlays: AttributeOverlays,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `collector`: Produces the desired-state document
    /// - `client`: Inventory transport
    /// - `notifier`: Receives user-facing notices
    /// - `config`: Site, noop flag and overlays (validated here)
    pub fn new(
        collector: Box<dyn Collector>,
        client: Box<dyn InventoryClient>,
        notifier: Box<dyn Notifier>,
        config: &SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            collector,
            client,
            notifier,
            site_id: config.site_id,
            noop: config.noop,
            overlays: config.overlays.clone(),
        })
    }

    /// Run the pipeline once
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: The run completed, possibly with per-resource failures
    /// - `Err(Error)`: Collection failed or the inventory was unreachable
    pub async fn run(&self) -> Result<SyncOutcome> {
        info!(
            "Collecting with {} for site {}",
            self.collector.collector_name(),
            self.site_id
        );
        let mut document = self.collector.collect().await?;
        debug!("Collected {} resources", document.len());

        let declared = overlay::apply(&mut document, &self.overlays);
        let schema = overlay::merge_schema(self.collector.required_attributes(), declared);

        let ensurer = SchemaEnsurer::new(self.client.as_ref(), self.notifier.as_ref(), self.site_id);
        let ensured = ensurer.ensure(&schema).await?;
        debug!(
            "Attributes: {} created, {} present, {} failed",
            ensured.created, ensured.present, ensured.failed
        );

        if self.noop {
            info!("Noop mode, skipping reconciliation");
            return Ok(SyncOutcome::Planned(document));
        }

        let reconciler = Reconciler::new(self.client.as_ref(), self.notifier.as_ref(), self.site_id);
        let report = reconciler.reconcile(document).await?;
        Ok(SyncOutcome::Reconciled(report))
    }

    pub fn site_id(&self) -> u64 {
        self.site_id
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }
}
