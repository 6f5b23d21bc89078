//! Per-widget runtime lifecycle.
//!
//! A [`WidgetRuntime`] moves through `Created -> Initialized -> Started ->
//! Stopped -> Disposed`. Starting runs the behaviors the widget kind
//! declares (PV binding, image cursor and ROI bindings, scripts); stopping
//! reverses every subscription they made.

#![allow(missing_docs)]

mod actions;
mod behavior;
mod image;
mod pv_binding;
mod scripts;

use std::fmt;
use std::sync::Arc;

use display_model::value::{ActionInfo, OpenTarget};
use display_model::{ListenerId, Macros, Property, VType, Widget};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::RuntimeError;
use crate::pv::{PvPool, RuntimePv};
use crate::script::{ScriptFuture, ScriptSupport};

pub use actions::{RuntimeAction, RuntimeActionKind};
use behavior::RuntimeBehavior;

/// Lifecycle states, in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeState {
    Created,
    Initialized,
    Started,
    Stopped,
    Disposed,
}

impl RuntimeState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Disposed => "disposed",
        }
    }
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens the display named by an "open display" action.
pub trait DisplayOpener: Send + Sync {
    fn open_display(
        &self,
        widget: &Widget,
        file: &str,
        target: OpenTarget,
        macros: &Macros,
    ) -> Result<(), RuntimeError>;
}

/// Collaborators shared by all runtimes of a display.
#[derive(Clone)]
pub struct RuntimeContext {
    pool: Arc<PvPool>,
    scripts: Option<Arc<dyn ScriptSupport>>,
    opener: Option<Arc<dyn DisplayOpener>>,
}

impl RuntimeContext {
    #[must_use]
    pub fn new(pool: Arc<PvPool>) -> Self {
        Self {
            pool,
            scripts: None,
            opener: None,
        }
    }

    #[must_use]
    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptSupport>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    #[must_use]
    pub fn with_opener(mut self, opener: Arc<dyn DisplayOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<PvPool> {
        &self.pool
    }

    #[must_use]
    pub fn scripts(&self) -> Option<&Arc<dyn ScriptSupport>> {
        self.scripts.as_ref()
    }

    #[must_use]
    pub fn opener(&self) -> Option<&Arc<dyn DisplayOpener>> {
        self.opener.as_ref()
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("pool", &self.pool)
            .field("scripts", &self.scripts.is_some())
            .field("opener", &self.opener.is_some())
            .finish()
    }
}

/// PV held by a behavior together with its listener, if any.
pub(crate) struct PvSubscription {
    pv: RuntimePv,
    listener: Option<ListenerId>,
}

impl PvSubscription {
    pub(crate) fn new(pv: RuntimePv, listener: Option<ListenerId>) -> Self {
        Self { pv, listener }
    }

    pub(crate) fn pv(&self) -> &RuntimePv {
        &self.pv
    }

    pub(crate) fn set_listener(&mut self, listener: ListenerId) {
        self.listener = Some(listener);
    }

    /// Detach the listener and return the PV to the pool.
    pub(crate) fn release(self, pool: &PvPool) {
        if let Some(id) = self.listener {
            self.pv.remove_listener(id);
        }
        if let Err(err) = pool.release_pv(&self.pv) {
            warn!("{err}");
        }
    }
}

/// Listener registered on a widget property.
pub(crate) struct PropertySubscription {
    property: Arc<Property>,
    listener: ListenerId,
}

impl PropertySubscription {
    pub(crate) fn new(property: Arc<Property>, listener: ListenerId) -> Self {
        Self { property, listener }
    }

    pub(crate) fn release(self) {
        self.property.remove_listener(self.listener);
    }
}

/// Connect `name` through the pool, logging failures.
pub(crate) fn connect_logged(widget: &Widget, pool: &PvPool, name: &str) -> Option<RuntimePv> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    debug!("{widget:?}: connecting {name}");
    match pool.get_pv(name) {
        Ok(pv) => Some(pv),
        Err(err) => {
            warn!("{widget:?}: {err}");
            None
        }
    }
}

pub(crate) fn write_logged(pv: &RuntimePv, value: &VType) {
    if let Err(err) = pv.write(value) {
        warn!("error writing {value} to {pv}: {err}");
    }
}

/// Live state of one widget.
pub struct WidgetRuntime {
    widget: Widget,
    context: RuntimeContext,
    state: RwLock<RuntimeState>,
    /// Also serializes lifecycle transitions.
    behaviors: Mutex<Vec<Box<dyn RuntimeBehavior>>>,
    primary: RwLock<Option<RuntimePv>>,
    actions: RwLock<Vec<RuntimeAction>>,
    futures: Mutex<Vec<ScriptFuture>>,
}

impl WidgetRuntime {
    #[must_use]
    pub fn new(widget: Widget, context: RuntimeContext) -> Self {
        Self {
            widget,
            context,
            state: RwLock::new(RuntimeState::Created),
            behaviors: Mutex::new(Vec::new()),
            primary: RwLock::new(None),
            actions: RwLock::new(Vec::new()),
            futures: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    #[must_use]
    pub fn state(&self) -> RuntimeState {
        *self.state.read()
    }

    /// Build behaviors and runtime actions. Does not connect anything.
    pub fn initialize(&self) -> Result<(), RuntimeError> {
        let mut behaviors = self.behaviors.lock();
        self.transition(RuntimeState::Created, RuntimeState::Initialized)?;
        *behaviors = behavior::behaviors_for(self.widget.kind());
        *self.actions.write() = actions::runtime_actions_for(self.widget.kind());
        Ok(())
    }

    /// Connect PVs and attach listeners.
    ///
    /// Failed bindings are logged and left out; the others still start.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let mut behaviors = self.behaviors.lock();
        self.transition(RuntimeState::Initialized, RuntimeState::Started)?;
        debug!("{:?}: start", self.widget);
        for behavior in behaviors.iter_mut() {
            behavior.start(&self.widget, &self.context);
        }
        *self.primary.write() = behaviors.iter().find_map(|behavior| behavior.primary_pv());
        Ok(())
    }

    /// Undo everything `start` did. Calling it again, or on a runtime that
    /// never started, does nothing.
    pub fn stop(&self) {
        let mut behaviors = self.behaviors.lock();
        self.stop_locked(&mut behaviors);
    }

    /// Stop if needed and drop all behaviors. Final.
    pub fn dispose(&self) {
        let mut behaviors = self.behaviors.lock();
        self.stop_locked(&mut behaviors);
        behaviors.clear();
        self.actions.write().clear();
        *self.state.write() = RuntimeState::Disposed;
    }

    fn stop_locked(&self, behaviors: &mut [Box<dyn RuntimeBehavior>]) {
        {
            let mut state = self.state.write();
            if *state != RuntimeState::Started {
                return;
            }
            *state = RuntimeState::Stopped;
        }
        debug!("{:?}: stop", self.widget);
        self.primary.write().take();
        for future in self.futures.lock().drain(..) {
            future.cancel();
        }
        for behavior in behaviors.iter_mut().rev() {
            behavior.stop(&self.widget, &self.context);
        }
    }

    fn transition(&self, from: RuntimeState, to: RuntimeState) -> Result<(), RuntimeError> {
        let mut state = self.state.write();
        if *state != from {
            return Err(RuntimeError::InvalidTransition {
                widget: self.widget.name().into(),
                from: state.as_str(),
                to: to.as_str(),
            });
        }
        *state = to;
        Ok(())
    }

    /// The widget's `pv_name` PV while started.
    #[must_use]
    pub fn primary_pv(&self) -> Option<RuntimePv> {
        self.primary.read().clone()
    }

    /// Write user-entered text to the primary PV.
    pub fn write_primary_pv(&self, text: &str) -> Result<(), RuntimeError> {
        let pv = self
            .primary_pv()
            .ok_or_else(|| RuntimeError::NoPv(self.widget.name().into()))?;
        pv.write(&VType::parse(text))?;
        Ok(())
    }

    /// Context actions offered while the display runs.
    #[must_use]
    pub fn runtime_actions(&self) -> Vec<RuntimeAction> {
        self.actions.read().clone()
    }

    /// Invoke one of the widget's configured actions.
    pub fn execute_action(&self, action: &ActionInfo) -> Result<(), RuntimeError> {
        let future = actions::execute(&self.widget, &self.context, action)?;
        if let Some(future) = future {
            let mut futures = self.futures.lock();
            futures.retain(|pending| !pending.is_done());
            futures.push(future);
        }
        Ok(())
    }
}

impl fmt::Debug for WidgetRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRuntime")
            .field("widget", &self.widget)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for WidgetRuntime {
    fn drop(&mut self) {
        self.dispose();
    }
}
