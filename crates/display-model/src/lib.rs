//! `display-model` - widget property model for control-system displays.
//!
//! Widgets own a fixed, ordered set of observable properties. Text
//! properties may hold `$(NAME)` macro references that resolve against the
//! macros inherited through the container tree. Edits can be recorded in an
//! undo log, and a display tree round-trips through the XML file format.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Listener registration and delivery.
pub mod bus;
/// `display.toml` configuration.
pub mod config;
/// Model errors.
pub mod error;
/// Macro maps and substitution.
pub mod macros;
/// XML persistence.
pub mod persist;
/// Observable properties.
pub mod property;
/// Undo/redo log.
pub mod undo;
/// Property values.
pub mod value;
/// Widgets and the display tree.
pub mod widget;
/// Widget kinds and property keys.
pub mod widgets;

pub use bus::{ListenerId, ListenerList};
pub use config::DisplayConfig;
pub use error::DisplayError;
pub use macros::{MacroValueProvider, Macros};
pub use property::{
    Property, PropertyCategory, PropertyDescriptor, PropertyKey, Restriction, WidgetProperty,
};
pub use value::{PropertyType, Value, VType};
pub use widget::{ChildrenEvent, WeakWidget, Widget};
pub use widgets::{keys, WidgetKind};
