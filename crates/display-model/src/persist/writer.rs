//! Serialize a widget tree to display XML.

use crate::persist::configurator::XmlVersion;
use crate::persist::value_xml::write_value;
use crate::persist::xml_tags as tags;
use crate::persist::xml_writer::XmlWriter;
use crate::widget::Widget;
use crate::widgets::WidgetKind;

/// Write `root` as a display document.
///
/// Only properties that differ from their default are written; RUNTIME
/// properties never are. A root that is not a display is written as the
/// single widget of an otherwise empty display.
#[must_use]
pub fn write_display(root: &Widget) -> String {
    let version = XmlVersion::CURRENT.to_string();
    let mut writer = XmlWriter::new();
    writer.start(tags::DISPLAY, &[(tags::VERSION, version.as_str())]);
    if root.kind() == WidgetKind::Display {
        write_properties(&mut writer, root);
        write_children(&mut writer, root, &version);
    } else {
        write_widget(&mut writer, root, &version);
    }
    writer.end(tags::DISPLAY);
    writer.finish()
}

fn write_widget(writer: &mut XmlWriter, widget: &Widget, version: &str) {
    writer.start(
        tags::WIDGET,
        &[(tags::TYPE, widget.type_name()), (tags::VERSION, version)],
    );
    write_properties(writer, widget);
    write_children(writer, widget, version);
    writer.end(tags::WIDGET);
}

fn write_properties(writer: &mut XmlWriter, widget: &Widget) {
    for property in widget.properties() {
        if property.is_runtime() || property.name() == tags::TYPE || property.is_default_value() {
            continue;
        }
        write_value(writer, property.name(), &property.persisted_value());
    }
}

fn write_children(writer: &mut XmlWriter, widget: &Widget, version: &str) {
    for child in widget.children().iter() {
        write_widget(writer, child, version);
    }
}
