//! XML persistence for display files.
//!
//! A file holds a `<display version="2.0.0">` root whose child elements are
//! the display's properties, followed by `<widget type=".." version="..">`
//! elements. Each widget element carries one child element per property
//! that differs from its default; containers nest further widgets.

#![allow(missing_docs)]

mod configurator;
mod file;
mod reader;
mod value_xml;
mod writer;
mod xml_writer;

pub mod xml_tags;

pub use configurator::{LoadIssue, WidgetConfigurator, XmlVersion};
pub use file::{load_display, save_display};
pub use reader::{read_display, ModelReader};
pub use writer::write_display;
