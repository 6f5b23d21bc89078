//! Undo/redo log for editor changes.
//!
//! Actions are applied through [`UndoableActionManager::execute`] or recorded
//! after the fact with [`UndoableActionManager::add`]. Consecutive mergeable
//! property changes on the same property within the merge window collapse
//! into one entry, so a drag undoes in a single step.

#![allow(missing_docs)]

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::bus::{ListenerId, ListenerList};
use crate::config::EditorConfig;
use crate::error::DisplayError;
use crate::property::Property;
use crate::value::Value;
use crate::widget::Widget;

/// Reversible editor operation.
pub trait UndoableAction: Send + Sync {
    fn description(&self) -> String;

    fn run(&mut self);

    fn undo(&mut self);

    /// Absorb `next` into this action. Returns `true` when merged.
    fn merge(&mut self, _next: &dyn UndoableAction) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Change of one property value.
pub struct SetPropertyAction {
    property: Arc<Property>,
    old: Value,
    new: Value,
    mergeable: bool,
}

impl SetPropertyAction {
    /// Capture the property's current value as the undo target.
    pub fn new(property: Arc<Property>, new: Value) -> Result<Self, DisplayError> {
        property.check_kind(&new)?;
        let old = property.persisted_value();
        Ok(Self {
            property,
            old,
            new,
            mergeable: false,
        })
    }

    /// Allow merging with the previous entry for the same property.
    #[must_use]
    pub fn mergeable(mut self) -> Self {
        self.mergeable = true;
        self
    }

    #[must_use]
    pub fn property(&self) -> &Arc<Property> {
        &self.property
    }

    fn apply(&self, value: &Value) {
        let result = match value {
            Value::Text(spec) if self.property.is_macroized() => {
                self.property.set_specification(spec)
            }
            value => self.property.set_value(value.clone()),
        };
        if let Err(err) = result {
            warn!("cannot apply '{}': {err}", self.property.name());
        }
    }
}

impl UndoableAction for SetPropertyAction {
    fn description(&self) -> String {
        format!("Set {}", self.property.name())
    }

    fn run(&mut self) {
        self.apply(&self.new);
    }

    fn undo(&mut self) {
        self.apply(&self.old);
    }

    fn merge(&mut self, next: &dyn UndoableAction) -> bool {
        let Some(next) = next.as_any().downcast_ref::<SetPropertyAction>() else {
            return false;
        };
        if !(self.mergeable && next.mergeable && Arc::ptr_eq(&self.property, &next.property)) {
            return false;
        }
        self.new = next.new.clone();
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Several actions undone and redone as one step.
pub struct CompoundAction {
    description: String,
    actions: Vec<Box<dyn UndoableAction>>,
}

impl CompoundAction {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, action: impl UndoableAction + 'static) {
        self.actions.push(Box::new(action));
    }

    #[must_use]
    pub fn with(mut self, action: impl UndoableAction + 'static) -> Self {
        self.push(action);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl UndoableAction for CompoundAction {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn run(&mut self) {
        for action in &mut self.actions {
            action.run();
        }
    }

    fn undo(&mut self) {
        for action in self.actions.iter_mut().rev() {
            action.undo();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Insert a widget into a container.
pub struct AddWidgetAction {
    parent: Widget,
    child: Widget,
    index: usize,
}

impl AddWidgetAction {
    /// `index` past the end appends.
    #[must_use]
    pub fn new(parent: Widget, child: Widget, index: usize) -> Self {
        Self {
            parent,
            child,
            index,
        }
    }
}

impl UndoableAction for AddWidgetAction {
    fn description(&self) -> String {
        format!("Add {}", self.child.type_name())
    }

    fn run(&mut self) {
        if let Err(err) = self.parent.add_child_at(self.index, self.child.clone()) {
            warn!("cannot add {:?}: {err}", self.child);
        }
    }

    fn undo(&mut self) {
        match self.parent.remove_child(&self.child) {
            Ok(index) => self.index = index,
            Err(err) => warn!("cannot remove {:?}: {err}", self.child),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a widget from its container, restoring its position on undo.
pub struct RemoveWidgetAction {
    parent: Widget,
    child: Widget,
    index: Option<usize>,
}

impl RemoveWidgetAction {
    #[must_use]
    pub fn new(parent: Widget, child: Widget) -> Self {
        Self {
            parent,
            child,
            index: None,
        }
    }
}

impl UndoableAction for RemoveWidgetAction {
    fn description(&self) -> String {
        format!("Remove {}", self.child.type_name())
    }

    fn run(&mut self) {
        match self.parent.remove_child(&self.child) {
            Ok(index) => self.index = Some(index),
            Err(err) => warn!("cannot remove {:?}: {err}", self.child),
        }
    }

    fn undo(&mut self) {
        let Some(index) = self.index.take() else {
            return;
        };
        if let Err(err) = self.parent.add_child_at(index, self.child.clone()) {
            warn!("cannot restore {:?}: {err}", self.child);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `(can_undo, can_redo)` listener.
pub type UndoListener = dyn Fn(bool, bool) + Send + Sync;

struct UndoEntry {
    action: Box<dyn UndoableAction>,
    touched: Instant,
}

/// Linear undo and redo stacks.
pub struct UndoableActionManager {
    undo: Vec<UndoEntry>,
    redo: Vec<Box<dyn UndoableAction>>,
    limit: usize,
    merge_window: Duration,
    listeners: ListenerList<UndoListener>,
}

impl Default for UndoableActionManager {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl UndoableActionManager {
    /// A `limit` of zero keeps a single entry.
    #[must_use]
    pub fn new(limit: usize, merge_window: Duration) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
            merge_window,
            listeners: ListenerList::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.undo_limit, config.undo_merge_window)
    }

    /// Apply `action` and record it.
    pub fn execute(&mut self, mut action: impl UndoableAction + 'static) {
        action.run();
        self.add(action);
    }

    /// Record an action whose effect has already been applied.
    pub fn add(&mut self, action: impl UndoableAction + 'static) {
        self.record(Box::new(action), Instant::now());
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    #[must_use]
    pub fn undo_description(&self) -> Option<String> {
        self.undo.last().map(|entry| entry.action.description())
    }

    #[must_use]
    pub fn redo_description(&self) -> Option<String> {
        self.redo.last().map(|action| action.description())
    }

    /// Reverse the most recent action. Returns `false` when there is none.
    pub fn undo(&mut self) -> bool {
        let Some(mut entry) = self.undo.pop() else {
            return false;
        };
        debug!("undo '{}'", entry.action.description());
        entry.action.undo();
        self.redo.push(entry.action);
        self.fire();
        true
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self) -> bool {
        let Some(mut action) = self.redo.pop() else {
            return false;
        };
        debug!("redo '{}'", action.description());
        action.run();
        self.undo.push(UndoEntry {
            action,
            touched: Instant::now(),
        });
        self.fire();
        true
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.fire();
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(bool, bool) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn record(&mut self, action: Box<dyn UndoableAction>, now: Instant) {
        self.redo.clear();
        if let Some(last) = self.undo.last_mut() {
            if now.duration_since(last.touched) < self.merge_window && last.action.merge(&*action) {
                last.touched = now;
                self.fire();
                return;
            }
        }
        self.undo.push(UndoEntry {
            action,
            touched: now,
        });
        if self.undo.len() > self.limit {
            let excess = self.undo.len() - self.limit;
            self.undo.drain(..excess);
        }
        self.fire();
    }

    fn fire(&self) {
        let (can_undo, can_redo) = (self.can_undo(), self.can_redo());
        self.listeners
            .notify("undo", |listener| listener(can_undo, can_redo));
    }
}
