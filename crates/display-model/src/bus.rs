//! Listener registration and isolated delivery.
//!
//! Property listeners, widget-level "any property" listeners and container
//! children listeners all live in a [`ListenerList`]. Delivery takes a
//! snapshot of the list so listeners may add or remove registrations while
//! being notified, and no lock is held while a listener runs.

#![allow(missing_docs)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by every listener registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registration-ordered list of listeners.
///
/// Shared by the model and by runtime PV subscriptions.
pub struct ListenerList<F: ?Sized> {
    entries: Mutex<Vec<(ListenerId, Arc<F>)>>,
}

impl<F: ?Sized> Default for ListenerList<F> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> ListenerList<F> {
    pub fn add(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId::next();
        self.entries.lock().push((id, listener));
        id
    }

    /// Returns `false` when the id was not registered here.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry, _)| *entry != id);
        entries.len() != before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Call `deliver` for every listener, in registration order.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// are still notified.
    pub fn notify(&self, context: &str, mut deliver: impl FnMut(&F)) {
        for listener in self.snapshot() {
            let outcome = catch_unwind(AssertUnwindSafe(|| deliver(&listener)));
            if let Err(payload) = outcome {
                warn!(
                    "listener for {context} panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// Best-effort text from a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
