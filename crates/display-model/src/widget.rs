//! Widgets and the display tree.

#![allow(missing_docs)]

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::bus::{ListenerId, ListenerList};
use crate::error::DisplayError;
use crate::macros::Macros;
use crate::property::{macros_value, Property, PropertyKey, PropertyListener, WidgetProperty};
use crate::value::{PropertyType, Value};
use crate::widgets::{keys, WidgetKind};

/// Change in a container's child list.
#[derive(Debug, Clone)]
pub enum ChildrenEvent {
    Added { child: Widget, index: usize },
    Removed { child: Widget, index: usize },
}

pub type ChildrenListener = dyn Fn(&Widget, &ChildrenEvent) + Send + Sync;

pub(crate) struct WidgetInner {
    kind: WidgetKind,
    properties: IndexMap<SmolStr, Arc<Property>>,
    parent: RwLock<Weak<WidgetInner>>,
    /// Copy-on-write snapshot, `None` for kinds that cannot hold children.
    children: Option<RwLock<Arc<Vec<Widget>>>>,
    property_listeners: ListenerList<PropertyListener>,
    children_listeners: ListenerList<ChildrenListener>,
}

impl WidgetInner {
    pub(crate) fn property_changed(
        &self,
        property: &Property,
        old: Option<&Value>,
        new: Option<&Value>,
    ) {
        self.property_listeners
            .notify(property.name(), |listener| listener(property, old, new));
    }
}

/// Shared handle to a widget. Clones refer to the same widget.
#[derive(Clone)]
pub struct Widget {
    inner: Arc<WidgetInner>,
}

/// Non-owning widget handle.
#[derive(Clone, Default)]
pub struct WeakWidget {
    inner: Weak<WidgetInner>,
}

impl WeakWidget {
    #[must_use]
    pub fn upgrade(&self) -> Option<Widget> {
        self.inner.upgrade().map(Widget::from_inner)
    }
}

impl fmt::Debug for WeakWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(widget) => write!(f, "WeakWidget({widget:?})"),
            None => f.write_str("WeakWidget(<dropped>)"),
        }
    }
}

impl Widget {
    /// Create a widget of the given kind with every property at its default.
    #[must_use]
    pub fn new(kind: WidgetKind) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<WidgetInner>| {
            let properties = kind
                .property_descriptors()
                .into_iter()
                .map(|descriptor| {
                    let name = SmolStr::new(descriptor.name());
                    (name, Arc::new(Property::new(descriptor, weak.clone())))
                })
                .collect();
            WidgetInner {
                kind,
                properties,
                parent: RwLock::new(Weak::new()),
                children: kind
                    .is_container()
                    .then(|| RwLock::new(Arc::new(Vec::new()))),
                property_listeners: ListenerList::default(),
                children_listeners: ListenerList::default(),
            }
        });
        Self { inner }
    }

    /// Create a widget from its type name, accepting legacy aliases.
    pub fn create(type_name: &str) -> Result<Self, DisplayError> {
        WidgetKind::from_type_name(type_name)
            .map(Self::new)
            .ok_or_else(|| DisplayError::UnknownWidgetType(type_name.into()))
    }

    pub(crate) fn from_inner(inner: Arc<WidgetInner>) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn kind(&self) -> WidgetKind {
        self.inner.kind
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.kind.type_name()
    }

    /// Resolved value of the `name` property.
    #[must_use]
    pub fn name(&self) -> String {
        self.property_value(keys::NAME).unwrap_or_default()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakWidget {
        WeakWidget {
            inner: Arc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Widget) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Identity usable as a map key while the widget is alive.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.inner.properties.contains_key(name)
    }

    pub fn property_by_name(&self, name: &str) -> Result<Arc<Property>, DisplayError> {
        self.inner
            .properties
            .get(name)
            .cloned()
            .ok_or_else(|| DisplayError::NoSuchProperty {
                widget: self.type_name().into(),
                property: name.into(),
            })
    }

    /// Typed handle for a property.
    pub fn property<T: PropertyType>(
        &self,
        key: PropertyKey<T>,
    ) -> Result<WidgetProperty<T>, DisplayError> {
        let property = self.property_by_name(key.name())?;
        let found = property.default_value().type_name();
        WidgetProperty::wrap(property).ok_or_else(|| DisplayError::TypeMismatch {
            property: key.name().into(),
            expected: std::any::type_name::<T>(),
            found,
        })
    }

    /// Typed handle if the widget has the property, `None` otherwise.
    #[must_use]
    pub fn checked_property<T: PropertyType>(
        &self,
        key: PropertyKey<T>,
    ) -> Option<WidgetProperty<T>> {
        self.property(key).ok()
    }

    pub fn property_value<T: PropertyType>(&self, key: PropertyKey<T>) -> Result<T, DisplayError> {
        Ok(self.property(key)?.value())
    }

    /// Refused values (NaN, enum index out of range) return
    /// [`DisplayError::InvalidValue`] and leave the property unchanged.
    pub fn set_property_value<T: PropertyType>(
        &self,
        key: PropertyKey<T>,
        value: T,
    ) -> Result<(), DisplayError> {
        self.property(key)?.untyped().set_value(value.into_value())
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.inner.properties.values()
    }

    /// Properties shown in an editor panel: everything except RUNTIME.
    pub fn editor_properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.properties().filter(|property| !property.is_runtime())
    }

    /// Listener for changes of any property of this widget, called after the
    /// property's own listeners.
    pub fn add_property_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Property, Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.inner.property_listeners.add(Arc::new(listener))
    }

    pub fn remove_property_listener(&self, id: ListenerId) -> bool {
        self.inner.property_listeners.remove(id)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Widget> {
        self.inner.parent.read().upgrade().map(Widget::from_inner)
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        self.inner.children.is_some()
    }

    /// Snapshot of the children; empty for non-containers.
    #[must_use]
    pub fn children(&self) -> Arc<Vec<Widget>> {
        match &self.inner.children {
            Some(children) => Arc::clone(&children.read()),
            None => Arc::new(Vec::new()),
        }
    }

    pub fn add_child(&self, child: Widget) -> Result<(), DisplayError> {
        self.add_child_at(usize::MAX, child)
    }

    /// Insert `child` at `index`, appending when the index is past the end.
    pub fn add_child_at(&self, index: usize, child: Widget) -> Result<(), DisplayError> {
        let slot = self.children_slot()?;
        if child.parent().is_some() {
            return Err(DisplayError::AlreadyHasParent(child.name().into()));
        }
        if child.ptr_eq(self) || child.is_ancestor_of(self) {
            return Err(DisplayError::AlreadyHasParent(child.name().into()));
        }
        let index = {
            let mut children = slot.write();
            let mut updated = Vec::clone(&children);
            let index = index.min(updated.len());
            updated.insert(index, child.clone());
            *children = Arc::new(updated);
            index
        };
        *child.inner.parent.write() = Arc::downgrade(&self.inner);
        self.fire_children(&ChildrenEvent::Added { child, index });
        Ok(())
    }

    /// Remove `child`, returning its former index.
    pub fn remove_child(&self, child: &Widget) -> Result<usize, DisplayError> {
        let slot = self.children_slot()?;
        let removed = {
            let mut children = slot.write();
            let position = children.iter().position(|entry| entry.ptr_eq(child));
            if let Some(index) = position {
                let mut updated = Vec::clone(&children);
                updated.remove(index);
                *children = Arc::new(updated);
            }
            position
        };
        let Some(index) = removed else {
            return Err(DisplayError::NotAChild(child.name().into()));
        };
        *child.inner.parent.write() = Weak::new();
        self.fire_children(&ChildrenEvent::Removed {
            child: child.clone(),
            index,
        });
        Ok(index)
    }

    pub fn add_children_listener<F>(&self, listener: F) -> Result<ListenerId, DisplayError>
    where
        F: Fn(&Widget, &ChildrenEvent) + Send + Sync + 'static,
    {
        self.children_slot()?;
        Ok(self.inner.children_listeners.add(Arc::new(listener)))
    }

    pub fn remove_children_listener(&self, id: ListenerId) -> bool {
        self.inner.children_listeners.remove(id)
    }

    /// Macros visible to this widget: the parent's effective macros with
    /// this widget's own `macros` property layered on top.
    #[must_use]
    pub fn effective_macros(&self) -> Macros {
        let base = self
            .parent()
            .map(|parent| parent.effective_macros())
            .unwrap_or_default();
        match self.inner.properties.get(keys::MACROS.name()) {
            Some(own) => Macros::merge(&base, &macros_value(own)),
            None => base,
        }
    }

    /// Root of the tree if it is a display.
    #[must_use]
    pub fn top_display_model(&self) -> Option<Widget> {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        (current.kind() == WidgetKind::Display).then_some(current)
    }

    /// Depth-first search of the descendants by resolved name.
    #[must_use]
    pub fn find_widget_by_name(&self, name: &str) -> Option<Widget> {
        for child in self.children().iter() {
            if child.name() == name {
                return Some(child.clone());
            }
            if let Some(found) = child.find_widget_by_name(name) {
                return Some(found);
            }
        }
        None
    }

    /// This widget followed by all descendants, depth first.
    #[must_use]
    pub fn descendants(&self) -> Vec<Widget> {
        let mut widgets = vec![self.clone()];
        for child in self.children().iter() {
            widgets.extend(child.descendants());
        }
        widgets
    }

    fn is_ancestor_of(&self, widget: &Widget) -> bool {
        let mut current = widget.parent();
        while let Some(parent) = current {
            if parent.ptr_eq(self) {
                return true;
            }
            current = parent.parent();
        }
        false
    }

    fn children_slot(&self) -> Result<&RwLock<Arc<Vec<Widget>>>, DisplayError> {
        self.inner
            .children
            .as_ref()
            .ok_or_else(|| DisplayError::NotAContainer(self.name().into()))
    }

    fn fire_children(&self, event: &ChildrenEvent) {
        self.inner
            .children_listeners
            .notify("children", |listener| listener(self, event));
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Widget {}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .inner
            .properties
            .get(keys::NAME.name())
            .and_then(|property| property.specification())
            .unwrap_or_default();
        write!(f, "Widget({} '{name}')", self.type_name())
    }
}

impl fmt::Display for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.type_name(), self.name())
    }
}
