//! `display-representation` - bridge between the widget model and a UI
//! toolkit.
//!
//! Model changes arrive on arbitrary threads. Representations mark
//! themselves dirty and ask the [`UpdateThrottle`] for a refresh; the
//! throttle batches those requests and runs them on the toolkit's
//! [`UiExecutor`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Headless text toolkit.
pub mod console;
/// Dirty flag.
pub mod dirty;
/// Representation errors.
pub mod error;
/// UI execution context.
pub mod executor;
/// Representation factory registry.
pub mod registry;
/// Representation contract and toolkit driver.
pub mod representation;
/// Update throttle.
pub mod throttle;

pub use console::{
    console_registry, console_toolkit, teardown_console_registry, ConsoleOutput, ConsoleParent,
};
pub use dirty::DirtyFlag;
pub use error::RepresentationError;
pub use executor::{submit, InlineExecutor, UiExecutor, UiTask, UiThread};
pub use registry::{RegistryCell, RepresentationFactory, RepresentationRegistry};
pub use representation::{ToolkitListener, ToolkitRepresentation, WidgetRepresentation};
pub use throttle::{UpdateScheduler, UpdateTarget, UpdateThrottle};
