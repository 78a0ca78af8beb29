// # Memory Notifier
//
// Records every notice in order. Clones share the same buffer, so a test can
// keep one handle and give the other to the engine.

use std::sync::{Arc, Mutex};

use super::{Notice, NoticeLevel};
use crate::traits::Notifier;

/// In-memory notifier
///
/// # Example
///
/// ```rust
/// use nsot_sync_core::notify::{MemoryNotifier, Notice};
/// use nsot_sync_core::traits::Notifier;
///
/// let notifier = MemoryNotifier::new();
/// notifier.notify(Notice::success("router1 created!"));
/// assert_eq!(notifier.messages(), vec!["router1 created!".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryNotifier {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotifier {
    /// Create a new empty notifier
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices recorded so far
    pub fn notices(&self) -> Vec<Notice> {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Messages of all notices recorded so far
    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.message).collect()
    }

    /// Notices of one level
    pub fn at_level(&self, level: NoticeLevel) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    /// Number of notices recorded
    pub fn len(&self) -> usize {
        self.inner.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.push(notice);
        }
    }
}
