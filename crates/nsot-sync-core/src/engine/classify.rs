//! Shared error classification
//!
//! Every failed remote call on every write path goes through [`route`], the
//! single place deciding between stopping the invocation, skipping the
//! resource quietly, and skipping it loudly.
//!
//! | Bucket                | Trigger                         | Action                  |
//! |-----------------------|---------------------------------|-------------------------|
//! | Fatal                 | connectivity failure            | abort the invocation    |
//! | Expected-precondition | a known quirk in [`QUIRKS`]     | warning, continue       |
//! | Rejected              | any other rejection/unexpected  | error with payload      |

use crate::error::{Error, InventoryError, Result};
use crate::model::Collection;
use crate::notify::Notice;
use crate::traits::Notifier;
use tracing::debug;

/// Outcome of classifying a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The inventory is unreachable; nothing else can succeed
    Fatal,
    /// A known, environmental rejection; the resource is skipped with a warning
    ExpectedPrecondition {
        /// Why this rejection is expected
        reason: &'static str,
    },
    /// Any other failure; the resource is abandoned
    Rejected,
}

/// A known inventory behavior that is not a defect in the resource
#[derive(Debug)]
pub struct Quirk {
    /// Only match this HTTP status
    pub status: Option<u16>,
    /// Only match calls against this collection
    pub collection: Option<Collection>,
    /// Only match when the error message contains this (case-insensitive)
    pub needle: Option<&'static str>,
    /// Explanation shown in the warning
    pub reason: &'static str,
}

impl Quirk {
    fn matches(&self, collection: Collection, status: u16, message: &str) -> bool {
        self.status.is_none_or(|s| s == status)
            && self.collection.is_none_or(|c| c == collection)
            && self
                .needle
                .is_none_or(|needle| message.to_lowercase().contains(needle))
    }
}

/// Rejections demoted to warnings
pub const QUIRKS: &[Quirk] = &[
    Quirk {
        status: None,
        collection: None,
        needle: Some("no base network"),
        reason: "no base network configured for this address family/site",
    },
    Quirk {
        status: None,
        collection: None,
        needle: Some("parent network"),
        reason: "no base network configured for this address family/site",
    },
    // NSoT answers a duplicate attribute create with an opaque HTTP 500
    // (dropbox/nsot#142).
    Quirk {
        status: Some(500),
        collection: Some(Collection::Attributes),
        needle: None,
        reason: "attribute create returned HTTP 500, likely a duplicate",
    },
];

/// Put a failed call into one of the three buckets
pub fn classify(collection: Collection, err: &InventoryError) -> Classification {
    match err {
        InventoryError::Connectivity(_) => Classification::Fatal,
        InventoryError::Rejected { status, .. } => {
            let message = err.message();
            QUIRKS
                .iter()
                .find(|quirk| quirk.matches(collection, *status, &message))
                .map_or(Classification::Rejected, |quirk| {
                    Classification::ExpectedPrecondition {
                        reason: quirk.reason,
                    }
                })
        }
        InventoryError::Unexpected(_) => Classification::Rejected,
    }
}

/// Classify a failure and report it
///
/// Fatal failures are reported and returned as [`Error::Unreachable`];
/// everything else is reported and returned as a classification so the
/// caller can move on to the next resource.
pub fn route(
    notifier: &dyn Notifier,
    collection: Collection,
    label: &str,
    err: InventoryError,
) -> Result<Classification> {
    let classification = classify(collection, &err);
    debug!("{} {} failed: {:?} ({:?})", collection.noun(), label, err, classification);

    match classification {
        Classification::Fatal => {
            notifier.notify(Notice::error(format!(
                "{} {}: inventory unreachable: {}",
                collection.noun(),
                label,
                err.message()
            )));
            return Err(Error::unreachable(err.message()));
        }
        Classification::ExpectedPrecondition { reason } => {
            notifier.notify(Notice::warning(format!(
                "{} {}: {} ({})",
                collection.noun(),
                label,
                reason,
                err.message()
            )));
        }
        Classification::Rejected => {
            let detail = match &err {
                InventoryError::Rejected { status, payload } => {
                    format!("HTTP {status}: {payload}")
                }
                other => other.to_string(),
            };
            notifier.notify(Notice::error(format!(
                "{} {}: {}",
                collection.noun(),
                label,
                detail
            )));
        }
    }

    Ok(classification)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemoryNotifier, NoticeLevel};
    use serde_json::json;

    fn nsot_error(status: u16, message: &str) -> InventoryError {
        InventoryError::rejected(status, json!({"error": {"code": status, "message": message}}))
    }

    #[test]
    fn test_connectivity_is_fatal() {
        let err = InventoryError::connectivity("connection refused");
        assert_eq!(classify(Collection::Devices, &err), Classification::Fatal);
    }

    #[test]
    fn test_missing_base_network_is_expected() {
        let err = nsot_error(400, "No base network found for 10.0.0.5/32");
        assert!(matches!(
            classify(Collection::Networks, &err),
            Classification::ExpectedPrecondition { .. }
        ));

        let err = nsot_error(400, "No suitable parent network found");
        assert!(matches!(
            classify(Collection::Interfaces, &err),
            Classification::ExpectedPrecondition { .. }
        ));
    }

    #[test]
    fn test_duplicate_attribute_500_is_expected_only_for_attributes() {
        let err = InventoryError::rejected(500, json!("Internal Server Error"));
        assert!(matches!(
            classify(Collection::Attributes, &err),
            Classification::ExpectedPrecondition { .. }
        ));
        assert_eq!(classify(Collection::Devices, &err), Classification::Rejected);
    }

    #[test]
    fn test_other_rejections_are_generic() {
        let err = nsot_error(409, "Duplicate hostname");
        assert_eq!(classify(Collection::Devices, &err), Classification::Rejected);

        let err = InventoryError::unexpected("not JSON");
        assert_eq!(classify(Collection::Devices, &err), Classification::Rejected);
    }

    #[test]
    fn test_route_reports_and_propagates() {
        let notifier = MemoryNotifier::new();

        let result = route(
            &notifier,
            Collection::Devices,
            "router1",
            nsot_error(400, "hostname is invalid"),
        );
        assert_eq!(result.unwrap(), Classification::Rejected);

        let result = route(
            &notifier,
            Collection::Networks,
            "10.0.0.5/32",
            nsot_error(400, "No base network found"),
        );
        assert!(matches!(
            result.unwrap(),
            Classification::ExpectedPrecondition { .. }
        ));

        let result = route(
            &notifier,
            Collection::Interfaces,
            "router1:eth0",
            InventoryError::connectivity("timed out"),
        );
        assert!(result.unwrap_err().is_fatal());

        let notices = notifier.notices();
        assert_eq!(notices.len(), 3);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("device router1"));
        assert!(notices[0].message.contains("hostname is invalid"));
        assert_eq!(notices[1].level, NoticeLevel::Warning);
        assert_eq!(notices[2].level, NoticeLevel::Error);
    }
}
