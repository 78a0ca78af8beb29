//! Injected notice sink
//!
//! The engine never logs user-facing outcomes through global state; it hands
//! them to whatever [`Notifier`] it was built with.

use crate::notify::Notice;

/// Receives one notice per resource outcome
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}
