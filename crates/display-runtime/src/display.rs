//! Runtime of a whole display.

#![allow(missing_docs)]

use std::sync::Arc;

use display_model::value::ActionInfo;
use display_model::Widget;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::runtime::{RuntimeContext, RuntimeState, WidgetRuntime};

/// Starts a runtime for every widget of a display and stops them in reverse
/// order.
pub struct DisplayRuntime {
    display: Widget,
    context: RuntimeContext,
    runtimes: Mutex<IndexMap<usize, Arc<WidgetRuntime>>>,
}

impl DisplayRuntime {
    #[must_use]
    pub fn new(display: Widget, context: RuntimeContext) -> Self {
        Self {
            display,
            context,
            runtimes: Mutex::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn display(&self) -> &Widget {
        &self.display
    }

    /// Start the display and every descendant. Widgets whose runtime fails
    /// are logged and skipped. Returns the number of running widgets.
    pub fn start(&self) -> usize {
        if self.is_running() {
            return self.runtimes.lock().len();
        }
        // Listeners fired while starting may query this runtime, so the map
        // is filled without holding its lock.
        let mut runtimes = IndexMap::new();
        let mut widgets = vec![self.display.clone()];
        widgets.extend(self.display.descendants());
        for widget in widgets {
            let runtime = Arc::new(WidgetRuntime::new(widget.clone(), self.context.clone()));
            let started = runtime.initialize().and_then(|()| runtime.start());
            match started {
                Ok(()) => {
                    runtimes.insert(widget.id(), runtime);
                }
                Err(err) => warn!("{widget:?}: {err}"),
            }
        }
        let count = runtimes.len();
        info!("started {count} widget(s), {} PV(s)", self.context.pool().len());
        *self.runtimes.lock() = runtimes;
        count
    }

    /// Stop and dispose all runtimes, children before parents.
    pub fn stop(&self) {
        let drained: Vec<_> = self.runtimes.lock().drain(..).collect();
        if drained.is_empty() {
            return;
        }
        for (_, runtime) in drained.into_iter().rev() {
            runtime.dispose();
        }
        info!("stopped display {:?}", self.display);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.runtimes.lock().is_empty()
    }

    #[must_use]
    pub fn runtime_for(&self, widget: &Widget) -> Option<Arc<WidgetRuntime>> {
        self.runtimes.lock().get(&widget.id()).cloned()
    }

    /// State of the widget's runtime, `None` when it has none.
    #[must_use]
    pub fn state_of(&self, widget: &Widget) -> Option<RuntimeState> {
        self.runtime_for(widget).map(|runtime| runtime.state())
    }

    pub fn write_primary_pv(&self, widget: &Widget, text: &str) -> Result<(), RuntimeError> {
        self.require(widget)?.write_primary_pv(text)
    }

    pub fn execute_action(&self, widget: &Widget, action: &ActionInfo) -> Result<(), RuntimeError> {
        self.require(widget)?.execute_action(action)
    }

    fn require(&self, widget: &Widget) -> Result<Arc<WidgetRuntime>, RuntimeError> {
        self.runtime_for(widget)
            .ok_or_else(|| RuntimeError::NotRunning(widget.name().into()))
    }
}

impl Drop for DisplayRuntime {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DisplayRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayRuntime")
            .field("display", &self.display)
            .field("widgets", &self.runtimes.lock().len())
            .finish()
    }
}
