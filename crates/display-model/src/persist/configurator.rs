//! Apply persisted property elements to a widget.

use std::fmt;

use roxmltree::Node;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::DisplayError;
use crate::persist::value_xml::read_value;
use crate::persist::xml_tags as tags;
use crate::value::Value;
use crate::widget::Widget;

/// `major.minor.patch` version carried by display and widget elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XmlVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl XmlVersion {
    pub const CURRENT: XmlVersion = XmlVersion::new(2, 0, 0);

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `2`, `2.1` or `2.1.3`.
    pub fn parse(text: &str) -> Result<Self, DisplayError> {
        let invalid = || DisplayError::Xml(format!("invalid version '{text}'").into());
        let mut parts = text.trim().split('.');
        let mut next = |required: bool| -> Result<u32, DisplayError> {
            match parts.next() {
                Some(part) => part.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let version = Self::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }

    /// Files older than the current major version use legacy names.
    #[must_use]
    pub fn is_legacy(self) -> bool {
        self.major < Self::CURRENT.major
    }
}

impl fmt::Display for XmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Property elements renamed since the legacy format.
const LEGACY_PROPERTY_NAMES: &[(&str, &str)] = &[
    ("opi_file", "file"),
    ("widget_name", "name"),
    ("tool_tip", "tooltip"),
];

/// Problem found while loading that did not stop the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub widget: SmolStr,
    pub message: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.widget, self.message)
    }
}

/// Configures widgets from the XML written by a given file version.
#[derive(Debug, Clone, Copy)]
pub struct WidgetConfigurator {
    version: XmlVersion,
}

impl WidgetConfigurator {
    #[must_use]
    pub fn new(version: XmlVersion) -> Self {
        Self { version }
    }

    #[must_use]
    pub fn version(&self) -> XmlVersion {
        self.version
    }

    /// For each child element naming a property, read that property.
    ///
    /// Unknown elements are skipped. A value that fails to decode leaves the
    /// property at its default and is recorded in `issues`.
    pub fn configure_from_xml(
        &self,
        widget: &Widget,
        element: Node<'_, '_>,
        issues: &mut Vec<LoadIssue>,
    ) {
        for child in element.children().filter(Node::is_element) {
            let tag = child.tag_name().name();
            if tag == tags::WIDGET {
                continue;
            }
            let name = self.property_name(tag);
            let Ok(property) = widget.property_by_name(name) else {
                debug!("{widget:?}: skipping unknown element <{tag}>");
                continue;
            };
            if property.is_runtime() || property.is_readonly() {
                continue;
            }
            let result =
                read_value(child, name, property.default_value()).and_then(|value| match value {
                    Value::Text(spec) if property.is_macroized() => {
                        property.set_specification(&spec)
                    }
                    value => property.set_value(value),
                });
            if let Err(err) = result {
                warn!("{widget:?}: {err}");
                issues.push(LoadIssue {
                    widget: format!("{widget:?}").into(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn property_name<'a>(&self, tag: &'a str) -> &'a str {
        if !self.version.is_legacy() {
            return tag;
        }
        LEGACY_PROPERTY_NAMES
            .iter()
            .find(|(legacy, _)| *legacy == tag)
            .map_or(tag, |(_, current)| *current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!(XmlVersion::parse("2.0.0"), Ok(XmlVersion::new(2, 0, 0)));
        assert_eq!(XmlVersion::parse("1.0"), Ok(XmlVersion::new(1, 0, 0)));
        assert!(XmlVersion::parse("two").is_err());
        assert!(XmlVersion::parse("1.2.3.4").is_err());
        assert!(XmlVersion::new(1, 0, 0).is_legacy());
        assert!(!XmlVersion::CURRENT.is_legacy());
    }
}
