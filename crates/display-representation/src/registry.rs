//! Widget kind to representation factory table.
//!
//! Each toolkit keeps its table in a [`RegistryCell`] static. The cell is
//! filled once, guarded against concurrent initialization, and can be torn
//! down explicitly so a process can shut a toolkit down cleanly.

#![allow(missing_docs)]

use std::sync::Arc;

use display_model::{Widget, WidgetKind};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::RepresentationError;
use crate::representation::WidgetRepresentation;
use crate::throttle::UpdateScheduler;

/// Creates the representation of one widget. `init` is called separately.
pub type RepresentationFactory<P> = fn(&Widget, UpdateScheduler) -> Arc<dyn WidgetRepresentation<P>>;

pub struct RepresentationRegistry<P> {
    factories: IndexMap<WidgetKind, RepresentationFactory<P>>,
}

impl<P> RepresentationRegistry<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register `factory` for `kind`, replacing an earlier registration.
    pub fn register(&mut self, kind: WidgetKind, factory: RepresentationFactory<P>) -> &mut Self {
        self.factories.insert(kind, factory);
        self
    }

    #[must_use]
    pub fn factory(&self, kind: WidgetKind) -> Option<RepresentationFactory<P>> {
        self.factories.get(&kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = WidgetKind> + '_ {
        self.factories.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<P> Default for RepresentationRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> std::fmt::Debug for RepresentationRegistry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Process-scoped slot for a toolkit's registry.
pub struct RegistryCell<P> {
    slot: Mutex<Option<Arc<RepresentationRegistry<P>>>>,
}

impl<P> RegistryCell<P> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_mutex(None),
        }
    }

    /// Fill the cell. Fails if it is already filled.
    pub fn initialize(
        &self,
        register: impl FnOnce(&mut RepresentationRegistry<P>),
    ) -> Result<Arc<RepresentationRegistry<P>>, RepresentationError> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(RepresentationError::AlreadyInitialized);
        }
        let registry = Arc::new(build(register));
        *slot = Some(Arc::clone(&registry));
        Ok(registry)
    }

    /// The registry, filling the cell on first use.
    pub fn get_or_initialize(
        &self,
        register: impl FnOnce(&mut RepresentationRegistry<P>),
    ) -> Arc<RepresentationRegistry<P>> {
        let mut slot = self.slot.lock();
        if let Some(registry) = slot.as_ref() {
            return Arc::clone(registry);
        }
        let registry = Arc::new(build(register));
        *slot = Some(Arc::clone(&registry));
        registry
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<RepresentationRegistry<P>>> {
        self.slot.lock().clone()
    }

    /// Empty the cell. Returns `false` if it was not initialized.
    pub fn teardown(&self) -> bool {
        let registry = self.slot.lock().take();
        registry.is_some()
    }
}

fn build<P>(register: impl FnOnce(&mut RepresentationRegistry<P>)) -> RepresentationRegistry<P> {
    let mut registry = RepresentationRegistry::new();
    register(&mut registry);
    debug!("representation registry with {} kind(s)", registry.len());
    registry
}

impl<P> Default for RegistryCell<P> {
    fn default() -> Self {
        Self::new()
    }
}
