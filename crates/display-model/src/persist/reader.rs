//! Read a display file into a widget tree.

use roxmltree::{Document, Node};
use tracing::warn;

use crate::error::DisplayError;
use crate::persist::configurator::{LoadIssue, WidgetConfigurator, XmlVersion};
use crate::persist::xml_tags as tags;
use crate::widget::Widget;
use crate::widgets::WidgetKind;

/// Reads display XML, collecting the problems it recovered from.
#[derive(Debug, Default)]
pub struct ModelReader {
    issues: Vec<LoadIssue>,
}

impl ModelReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `xml` into a display widget.
    ///
    /// Fails only when the document is not well-formed XML or not a display.
    /// Unknown widget types and undecodable property values are skipped.
    pub fn read(&mut self, xml: &str) -> Result<Widget, DisplayError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        if root.tag_name().name() != tags::DISPLAY {
            return Err(DisplayError::Xml(
                format!("expected <{}> root, found <{}>", tags::DISPLAY, root.tag_name().name())
                    .into(),
            ));
        }
        let version = element_version(root, XmlVersion::CURRENT)?;
        let display = Widget::new(WidgetKind::Display);
        WidgetConfigurator::new(version).configure_from_xml(&display, root, &mut self.issues);
        self.read_children(&display, root, version)?;
        Ok(display)
    }

    #[must_use]
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    fn read_children(
        &mut self,
        parent: &Widget,
        element: Node<'_, '_>,
        version: XmlVersion,
    ) -> Result<(), DisplayError> {
        for node in element
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == tags::WIDGET)
        {
            let Some(type_name) = node
                .attribute(tags::TYPE)
                .or_else(|| node.attribute(tags::LEGACY_TYPE))
            else {
                self.skip(parent, "widget without type".to_string());
                continue;
            };
            let widget = match Widget::create(type_name) {
                Ok(widget) => widget,
                Err(err) => {
                    self.skip(parent, err.to_string());
                    continue;
                }
            };
            let widget_version = match element_version(node, version) {
                Ok(widget_version) => widget_version,
                Err(err) => {
                    self.skip(parent, err.to_string());
                    continue;
                }
            };
            WidgetConfigurator::new(widget_version).configure_from_xml(
                &widget,
                node,
                &mut self.issues,
            );
            if widget.is_container() {
                self.read_children(&widget, node, widget_version)?;
            }
            parent.add_child(widget)?;
        }
        Ok(())
    }

    fn skip(&mut self, parent: &Widget, message: String) {
        warn!("{parent:?}: skipping child, {message}");
        self.issues.push(LoadIssue {
            widget: format!("{parent:?}").into(),
            message,
        });
    }
}

/// Parse display XML, ignoring recovered problems.
pub fn read_display(xml: &str) -> Result<Widget, DisplayError> {
    ModelReader::new().read(xml)
}

fn element_version(node: Node<'_, '_>, inherited: XmlVersion) -> Result<XmlVersion, DisplayError> {
    node.attribute(tags::VERSION)
        .map_or(Ok(inherited), XmlVersion::parse)
}
