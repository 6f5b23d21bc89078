//! Runtime and PV errors.

#![allow(missing_docs)]

use display_model::DisplayError;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors reported by PV connectors and the PV pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PvError {
    /// Connector could not establish the channel.
    #[error("cannot connect PV '{name}': {reason}")]
    Connect { name: SmolStr, reason: SmolStr },

    /// Write rejected by the data source.
    #[error("cannot write PV '{name}': {reason}")]
    Write { name: SmolStr, reason: SmolStr },

    /// PV was released and its channel closed.
    #[error("PV '{0}' is disconnected")]
    Disconnected(SmolStr),

    /// Release of a PV handle the pool does not track.
    #[error("PV '{0}' is not held by the pool")]
    NotInPool(SmolStr),
}

/// Errors raised by widget runtimes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Lifecycle call out of order.
    #[error("runtime of '{widget}' cannot go from {from} to {to}")]
    InvalidTransition {
        widget: SmolStr,
        from: &'static str,
        to: &'static str,
    },

    #[error(transparent)]
    Pv(#[from] PvError),

    #[error(transparent)]
    Model(#[from] DisplayError),

    /// Script compilation or submission failed.
    #[error("script '{name}': {reason}")]
    Script { name: SmolStr, reason: SmolStr },

    /// Script requested but no script support is configured.
    #[error("no script support configured for '{0}'")]
    NoScriptSupport(SmolStr),

    /// Open-display action without a display opener.
    #[error("no display opener configured for '{0}'")]
    NoDisplayOpener(SmolStr),

    /// Widget has no primary PV to write.
    #[error("widget '{0}' has no PV")]
    NoPv(SmolStr),

    /// Widget has no started runtime.
    #[error("widget '{0}' is not running")]
    NotRunning(SmolStr),

    /// Process-wide PV pool installed twice.
    #[error("PV pool already installed")]
    PoolAlreadyInstalled,
}
