//! Change marker shared between model listeners and `update_changes`.

use std::sync::atomic::{AtomicBool, Ordering};

/// Set by listeners on any thread, consumed on the UI thread.
#[derive(Debug)]
pub struct DirtyFlag(AtomicBool);

impl DirtyFlag {
    /// New flag, initially dirty so the first update draws everything.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Returns `true` if the flag was clean before.
    pub fn mark(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    pub fn check_and_clear(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

impl Default for DirtyFlag {
    fn default() -> Self {
        Self::new()
    }
}
