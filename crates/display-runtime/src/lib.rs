//! `display-runtime` - live behavior of a loaded display.
//!
//! PVs are shared through a reference-counted pool and bound to widget
//! properties by per-widget runtimes. Scripts and display opening are
//! provided by the embedding application through small traits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Runtime of a whole display.
pub mod display;
/// Runtime and PV errors.
pub mod error;
/// PV contract, pool and in-memory connector.
pub mod pv;
/// Per-widget runtime lifecycle.
pub mod runtime;
/// Script execution contract.
pub mod script;

pub use display::DisplayRuntime;
pub use error::{PvError, RuntimeError};
pub use pv::{
    install_pool, pool, teardown_pool, LocalPvConnector, PvChannel, PvConnector, PvPool,
    PvUpdates, RuntimePv,
};
pub use runtime::{
    DisplayOpener, RuntimeAction, RuntimeActionKind, RuntimeContext, RuntimeState, WidgetRuntime,
};
pub use script::{Script, ScriptCompletion, ScriptFuture, ScriptResult, ScriptSupport};
