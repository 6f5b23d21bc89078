//! Model errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by the widget model, persistence and configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Property lookup by name on a widget that lacks it.
    #[error("widget '{widget}' has no property '{property}'")]
    NoSuchProperty { widget: SmolStr, property: SmolStr },

    /// Value or typed handle does not match the declared property kind.
    #[error("property '{property}' holds {expected}, got {found}")]
    TypeMismatch {
        property: SmolStr,
        expected: &'static str,
        found: &'static str,
    },

    /// Property does not carry a macro specification.
    #[error("property '{0}' does not support macros")]
    NotMacroized(SmolStr),

    /// Macro name is not a valid identifier.
    #[error("invalid macro name '{0}'")]
    InvalidMacroName(SmolStr),

    /// Persisted value cannot be decoded for a property.
    #[error("invalid value for '{property}': {reason}")]
    InvalidValue { property: SmolStr, reason: SmolStr },

    /// No widget kind is registered for the type name.
    #[error("unknown widget type '{0}'")]
    UnknownWidgetType(SmolStr),

    /// Child operations on a widget that cannot hold children.
    #[error("widget '{0}' is not a container")]
    NotAContainer(SmolStr),

    /// Attempt to add a widget that is already attached elsewhere.
    #[error("widget '{0}' already has a parent")]
    AlreadyHasParent(SmolStr),

    /// Attempt to remove a widget that is not a child.
    #[error("widget '{0}' is not a child of this container")]
    NotAChild(SmolStr),

    /// Malformed display document.
    #[error("invalid display XML: {0}")]
    Xml(SmolStr),

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// File system error while loading or saving.
    #[error("i/o error: {0}")]
    Io(SmolStr),
}

impl From<std::io::Error> for DisplayError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string().into())
    }
}

impl From<roxmltree::Error> for DisplayError {
    fn from(value: roxmltree::Error) -> Self {
        Self::Xml(value.to_string().into())
    }
}
