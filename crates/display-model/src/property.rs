//! Observable widget properties.
//!
//! A [`Property`] is the untyped cell owned by a widget. It stores a
//! [`Value`], applies the descriptor's restriction before storing, and
//! notifies its own listeners followed by the widget-level listeners after
//! every accepted change. [`WidgetProperty`] is the typed view over the same
//! cell.
//!
//! Macroized text properties keep the specification as written and resolve
//! the value lazily against the widget's effective macros. Changing the
//! specification reports `old -> None`; the next read resolves and reports
//! `None -> resolved`.

#![allow(missing_docs)]

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::bus::{ListenerId, ListenerList};
use crate::error::DisplayError;
use crate::macros::{contains_macros, Macros};
use crate::value::{PropertyType, Value};
use crate::widget::{Widget, WidgetInner};

/// Grouping of properties for editors; RUNTIME properties are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyCategory {
    Widget,
    Position,
    Display,
    Behavior,
    Runtime,
}

impl PropertyCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Widget => "WIDGET",
            Self::Position => "POSITION",
            Self::Display => "DISPLAY",
            Self::Behavior => "BEHAVIOR",
            Self::Runtime => "RUNTIME",
        }
    }
}

/// Limits applied to incoming values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Restriction {
    None,
    IntRange { min: i32, max: i32 },
    DoubleRange { min: f64, max: f64 },
}

/// Typed name of a property, used for lookups on a widget.
pub struct PropertyKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PropertyKey<T> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for PropertyKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PropertyKey<T> {}

impl<T> fmt::Debug for PropertyKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKey({})", self.name)
    }
}

/// Static description of a property: name, category, default and limits.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: SmolStr,
    description: SmolStr,
    category: PropertyCategory,
    readonly: bool,
    macroized: bool,
    restriction: Restriction,
    default: Value,
}

impl PropertyDescriptor {
    pub fn new<T: PropertyType>(
        key: PropertyKey<T>,
        category: PropertyCategory,
        description: &str,
        default: T,
    ) -> Self {
        Self {
            name: SmolStr::new(key.name()),
            description: SmolStr::new(description),
            category,
            readonly: false,
            macroized: false,
            restriction: Restriction::None,
            default: default.into_value(),
        }
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Only meaningful for text properties.
    #[must_use]
    pub fn macroized(mut self) -> Self {
        self.macroized = matches!(self.default, Value::Text(_));
        self
    }

    #[must_use]
    pub fn int_range(mut self, min: i32, max: i32) -> Self {
        self.restriction = Restriction::IntRange { min, max };
        self
    }

    #[must_use]
    pub fn double_range(mut self, min: f64, max: f64) -> Self {
        self.restriction = Restriction::DoubleRange { min, max };
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn category(&self) -> PropertyCategory {
        self.category
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    #[must_use]
    pub fn is_macroized(&self) -> bool {
        self.macroized
    }

    #[must_use]
    pub fn restriction(&self) -> Restriction {
        self.restriction
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        &self.default
    }
}

/// Untyped listener: `(property, old, new)`. `None` marks an unresolved
/// macroized value.
pub type PropertyListener = dyn Fn(&Property, Option<&Value>, Option<&Value>) + Send + Sync;

#[derive(Debug)]
struct PropertyState {
    /// `None` only while a macroized value awaits resolution.
    value: Option<Value>,
    specification: Option<String>,
}

/// Untyped property cell owned by a widget.
pub struct Property {
    descriptor: PropertyDescriptor,
    widget: Weak<WidgetInner>,
    state: RwLock<PropertyState>,
    listeners: ListenerList<PropertyListener>,
}

impl Property {
    pub(crate) fn new(descriptor: PropertyDescriptor, widget: Weak<WidgetInner>) -> Self {
        let state = match (&descriptor.default, descriptor.macroized) {
            (Value::Text(spec), true) => PropertyState {
                value: (!contains_macros(spec)).then(|| descriptor.default.clone()),
                specification: Some(spec.clone()),
            },
            _ => PropertyState {
                value: Some(descriptor.default.clone()),
                specification: None,
            },
        };
        Self {
            descriptor,
            widget,
            state: RwLock::new(state),
            listeners: ListenerList::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    #[must_use]
    pub fn description(&self) -> &str {
        self.descriptor.description()
    }

    #[must_use]
    pub fn category(&self) -> PropertyCategory {
        self.descriptor.category()
    }

    #[must_use]
    pub fn descriptor(&self) -> &PropertyDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.descriptor.is_readonly()
    }

    #[must_use]
    pub fn is_macroized(&self) -> bool {
        self.descriptor.is_macroized()
    }

    #[must_use]
    pub fn is_runtime(&self) -> bool {
        self.category() == PropertyCategory::Runtime
    }

    /// Owning widget, absent once the widget has been dropped.
    #[must_use]
    pub fn widget(&self) -> Option<Widget> {
        self.widget.upgrade().map(Widget::from_inner)
    }

    #[must_use]
    pub fn default_value(&self) -> &Value {
        self.descriptor.default_value()
    }

    /// Current value. An unresolved macroized value is resolved here, which
    /// notifies listeners with `None -> resolved`.
    #[must_use]
    pub fn value(&self) -> Value {
        let specification = {
            let state = self.state.read();
            if let Some(value) = &state.value {
                return value.clone();
            }
            state.specification.clone().unwrap_or_default()
        };
        let macros = self
            .widget()
            .map(|widget| widget.effective_macros())
            .unwrap_or_default();
        let resolved = Value::Text(macros.resolve(&specification));
        let stored = {
            let mut state = self.state.write();
            if state.value.is_none() && state.specification.as_ref() == Some(&specification) {
                state.value = Some(resolved.clone());
                true
            } else {
                false
            }
        };
        if stored {
            self.fire(None, Some(&resolved));
        }
        resolved
    }

    /// Value without triggering macro resolution; `None` while unresolved.
    #[must_use]
    pub fn peek_value(&self) -> Option<Value> {
        self.state.read().value.clone()
    }

    /// Macro specification of a macroized property, otherwise `None`.
    #[must_use]
    pub fn specification(&self) -> Option<String> {
        self.state.read().specification.clone()
    }

    /// Text persisted or edited for this property: the specification when
    /// macroized, the value otherwise.
    #[must_use]
    pub fn persisted_value(&self) -> Value {
        match self.specification() {
            Some(spec) => Value::Text(spec),
            None => self.value(),
        }
    }

    #[must_use]
    pub fn is_default_value(&self) -> bool {
        let state = self.state.read();
        match (&state.specification, &self.descriptor.default) {
            (Some(spec), Value::Text(default)) => spec == default,
            _ => state.value.as_ref() == Some(&self.descriptor.default),
        }
    }

    /// Set from an untyped value.
    ///
    /// A readonly property ignores the call. Values of the wrong kind, NaN
    /// and out-of-range enum indices are rejected with the current value
    /// kept. On a macroized property the text becomes both the
    /// specification and the value, without resolution.
    pub fn set_value(&self, value: Value) -> Result<(), DisplayError> {
        self.check_kind(&value)?;
        if let Some(reason) = refusal(&value) {
            return Err(DisplayError::InvalidValue {
                property: self.descriptor.name.clone(),
                reason: reason.into(),
            });
        }
        self.store(value);
        Ok(())
    }

    /// Replace the macro specification; the value is resolved on next read.
    pub fn set_specification(&self, specification: &str) -> Result<(), DisplayError> {
        if !self.is_macroized() {
            return Err(DisplayError::NotMacroized(self.descriptor.name.clone()));
        }
        if !self.is_readonly() {
            self.respecify(specification);
        }
        Ok(())
    }

    fn respecify(&self, specification: &str) {
        let old = {
            let mut state = self.state.write();
            if state.specification.as_deref() == Some(specification) && state.value.is_none() {
                return;
            }
            state.specification = Some(specification.to_string());
            state.value.take()
        };
        self.fire(old.as_ref(), None);
    }

    /// Restore the default value, or default specification when macroized.
    pub fn reset(&self) {
        match (&self.descriptor.default, self.is_macroized()) {
            (Value::Text(spec), true) => {
                if !self.is_readonly() {
                    self.respecify(spec);
                }
            }
            (default, _) => self.store(default.clone()),
        }
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Property, Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn check_kind(&self, value: &Value) -> Result<(), DisplayError> {
        if same_kind(&self.descriptor.default, value) {
            Ok(())
        } else {
            Err(DisplayError::TypeMismatch {
                property: self.descriptor.name.clone(),
                expected: self.descriptor.default.type_name(),
                found: value.type_name(),
            })
        }
    }

    pub(crate) fn store(&self, requested: Value) {
        if self.is_readonly() {
            return;
        }
        let (old, new) = {
            let mut state = self.state.write();
            let new = if self.is_macroized() {
                if let Value::Text(text) = &requested {
                    state.specification = Some(text.clone());
                }
                requested
            } else {
                restrict_value(self.descriptor.restriction, state.value.as_ref(), requested)
            };
            (state.value.replace(new.clone()), new)
        };
        self.fire(old.as_ref(), Some(&new));
    }

    fn fire(&self, old: Option<&Value>, new: Option<&Value>) {
        if old == new {
            return;
        }
        self.listeners
            .notify(self.name(), |listener| listener(self, old, new));
        if let Some(widget) = self.widget.upgrade() {
            widget.property_changed(self, old, new);
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Property")
            .field("name", &self.descriptor.name)
            .field("value", &state.value)
            .field("specification", &state.specification)
            .finish()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek_value() {
            Some(value) => write!(f, "'{}' = {value}", self.name()),
            None => write!(f, "'{}' = <unresolved>", self.name()),
        }
    }
}

fn same_kind(expected: &Value, found: &Value) -> bool {
    match (expected, found) {
        (Value::Enum(expected), Value::Enum(found)) => expected.kind == found.kind,
        _ => std::mem::discriminant(expected) == std::mem::discriminant(found),
    }
}

/// Why `value` can never be stored, whatever the restriction.
fn refusal(value: &Value) -> Option<&'static str> {
    match value {
        Value::Double(value) if value.is_nan() => Some("NaN"),
        Value::Enum(value) if value.index >= value.labels.len() => Some("enum index out of range"),
        _ => None,
    }
}

/// Clamp numbers into range, refuse NaN and out-of-range enum indices by
/// keeping the current value.
fn restrict_value(restriction: Restriction, current: Option<&Value>, requested: Value) -> Value {
    let refuse = |requested: Value| current.cloned().unwrap_or(requested);
    match (restriction, requested) {
        (_, Value::Double(value)) if value.is_nan() => refuse(Value::Double(value)),
        (Restriction::IntRange { min, max }, Value::Int(value)) => Value::Int(value.clamp(min, max)),
        (Restriction::DoubleRange { min, max }, Value::Double(value)) => {
            Value::Double(value.clamp(min, max))
        }
        (_, Value::Enum(value)) if value.index >= value.labels.len() => refuse(Value::Enum(value)),
        (_, requested) => requested,
    }
}

/// Typed view of a widget property.
pub struct WidgetProperty<T> {
    inner: Arc<Property>,
    default: T,
}

impl<T: PropertyType> WidgetProperty<T> {
    /// `None` when the stored kind does not convert to `T`.
    pub(crate) fn wrap(inner: Arc<Property>) -> Option<Self> {
        let default = T::from_value(inner.default_value())?;
        Some(Self { inner, default })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    #[must_use]
    pub fn value(&self) -> T {
        T::from_value(&self.inner.value()).unwrap_or_else(|| self.default.clone())
    }

    /// Readonly properties ignore the call. Refused values keep the current
    /// value without reporting; [`Property::set_value`] returns the error.
    pub fn set_value(&self, value: T) {
        self.inner.store(value.into_value());
    }

    #[must_use]
    pub fn default_value(&self) -> T {
        self.default.clone()
    }

    #[must_use]
    pub fn is_default_value(&self) -> bool {
        self.inner.is_default_value()
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        self.inner.is_readonly()
    }

    #[must_use]
    pub fn widget(&self) -> Option<Widget> {
        self.inner.widget()
    }

    /// Typed listener receiving `(property, old, new)`.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&WidgetProperty<T>, Option<T>, Option<T>) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        let default = self.default.clone();
        self.inner.add_listener(move |_, old, new| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let property = WidgetProperty {
                inner,
                default: default.clone(),
            };
            listener(
                &property,
                old.and_then(T::from_value),
                new.and_then(T::from_value),
            );
        })
    }

    /// Listener receiving untyped values.
    pub fn add_untyped_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Property, Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.inner.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.remove_listener(id)
    }

    #[must_use]
    pub fn untyped(&self) -> &Arc<Property> {
        &self.inner
    }
}

impl WidgetProperty<String> {
    /// Specification of a macroized property, the plain value otherwise.
    #[must_use]
    pub fn specification(&self) -> String {
        self.inner
            .specification()
            .unwrap_or_else(|| self.value())
    }

    pub fn set_specification(&self, specification: &str) -> Result<(), DisplayError> {
        self.inner.set_specification(specification)
    }
}

impl<T: PropertyType> Clone for WidgetProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default: self.default.clone(),
        }
    }
}

impl<T> fmt::Debug for WidgetProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

/// Convenience for code holding an untyped cell and wanting the macros.
#[must_use]
pub fn macros_value(property: &Property) -> Macros {
    match property.value() {
        Value::Macros(macros) => macros,
        _ => Macros::default(),
    }
}
