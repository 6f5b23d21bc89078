//! Representation errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while representing a display in a toolkit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepresentationError {
    /// No factory registered for the widget type.
    #[error("no representation for widget type '{0}'")]
    NoRepresentation(SmolStr),

    /// Toolkit item for a widget could not be created.
    #[error("cannot represent '{widget}': {reason}")]
    Init { widget: SmolStr, reason: SmolStr },

    /// Registry initialized twice without teardown.
    #[error("representation registry already initialized")]
    AlreadyInitialized,

    /// Worker thread could not be started.
    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(SmolStr),
}
