//! Representation contract and the per-toolkit representation driver.
//!
//! A toolkit supplies a [`RepresentationRegistry`] mapping widget kinds to
//! factories. [`ToolkitRepresentation::represent_model`] walks a display,
//! creates and initializes one representation per widget, and routes user
//! interaction back out through [`ToolkitListener`]s.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use display_model::value::ActionInfo;
use display_model::{ListenerId, ListenerList, Widget};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RepresentationError;
use crate::executor::UiExecutor;
use crate::registry::RepresentationRegistry;
use crate::throttle::{UpdateScheduler, UpdateTarget, UpdateThrottle};

/// Toolkit item for one model widget. `P` is the toolkit's parent handle.
pub trait WidgetRepresentation<P>: UpdateTarget {
    fn widget(&self) -> &Widget;

    /// Create the toolkit item under `parent`. Containers return the parent
    /// for their children, other widgets return `parent` itself.
    fn init(&self, parent: &P) -> Result<P, RepresentationError>;

    /// Remove the toolkit item and detach model listeners.
    fn dispose(&self) {}
}

/// User interaction reported by representations.
pub trait ToolkitListener: Send + Sync {
    fn handle_action(&self, _widget: &Widget, _action: &ActionInfo) {}

    fn handle_click(&self, _widget: &Widget) {}

    fn handle_write(&self, _widget: &Widget, _value: &str) {}
}

/// Represents display models in one toolkit.
pub struct ToolkitRepresentation<P> {
    registry: Arc<RepresentationRegistry<P>>,
    executor: Arc<dyn UiExecutor>,
    throttle: UpdateThrottle,
    listeners: ListenerList<dyn ToolkitListener>,
    represented: Mutex<Vec<Arc<dyn WidgetRepresentation<P>>>>,
}

impl<P> ToolkitRepresentation<P> {
    pub fn new(
        registry: Arc<RepresentationRegistry<P>>,
        executor: Arc<dyn UiExecutor>,
        update_interval: Duration,
    ) -> Result<Self, RepresentationError> {
        let throttle = UpdateThrottle::new(update_interval, Arc::clone(&executor))?;
        Ok(Self {
            registry,
            executor,
            throttle,
            listeners: ListenerList::default(),
            represented: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn executor(&self) -> &Arc<dyn UiExecutor> {
        &self.executor
    }

    #[must_use]
    pub fn scheduler(&self) -> UpdateScheduler {
        self.throttle.scheduler()
    }

    pub fn schedule_update(&self, target: Arc<dyn UpdateTarget>) {
        self.throttle.schedule_update(target);
    }

    /// Represent every widget below `model`; the display root itself has no
    /// toolkit item. Widgets that fail are logged and skipped along with
    /// their children. Returns the number of widgets represented.
    pub fn represent_model(&self, parent: &P, model: &Widget) -> usize {
        let mut count = 0;
        for child in model.children().iter() {
            count += self.represent_tree(parent, child);
        }
        debug!("represented {count} widget(s) of {model:?}");
        count
    }

    fn represent_tree(&self, parent: &P, widget: &Widget) -> usize {
        let child_parent = match self.represent_widget(parent, widget) {
            Ok(child_parent) => child_parent,
            Err(err) => {
                warn!("cannot represent {widget:?}: {err}");
                return 0;
            }
        };
        let mut count = 1;
        for child in widget.children().iter() {
            count += self.represent_tree(&child_parent, child);
        }
        count
    }

    fn represent_widget(&self, parent: &P, widget: &Widget) -> Result<P, RepresentationError> {
        let factory = self
            .registry
            .factory(widget.kind())
            .ok_or_else(|| RepresentationError::NoRepresentation(widget.type_name().into()))?;
        let representation = factory(widget, self.throttle.scheduler());
        let child_parent = representation.init(parent)?;
        self.represented.lock().push(representation);
        Ok(child_parent)
    }

    #[must_use]
    pub fn representation_count(&self) -> usize {
        self.represented.lock().len()
    }

    /// Dispose all representations, children first.
    pub fn dispose_representation(&self) {
        let represented = std::mem::take(&mut *self.represented.lock());
        for representation in represented.into_iter().rev() {
            representation.dispose();
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ToolkitListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn fire_action(&self, widget: &Widget, action: &ActionInfo) {
        let context = format!("action '{}' of {widget:?}", action.description());
        self.listeners
            .notify(&context, |listener| listener.handle_action(widget, action));
    }

    pub fn fire_click(&self, widget: &Widget) {
        let context = format!("click on {widget:?}");
        self.listeners
            .notify(&context, |listener| listener.handle_click(widget));
    }

    pub fn fire_write(&self, widget: &Widget, value: &str) {
        let context = format!("write '{value}' for {widget:?}");
        self.listeners
            .notify(&context, |listener| listener.handle_write(widget, value));
    }

    /// Dispose representations and stop the throttle.
    pub fn shutdown(&self) {
        self.dispose_representation();
        self.throttle.shutdown();
    }
}

impl<P> std::fmt::Debug for ToolkitRepresentation<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolkitRepresentation")
            .field("registry", &self.registry)
            .field("represented", &self.representation_count())
            .field("throttle", &self.throttle)
            .finish()
    }
}
