//! Widget kinds and their property sets.
//!
//! Kinds form a closed set. Each entry of the kind table names the type
//! used in display files, the legacy type names accepted when reading older
//! files, and the function that declares the kind's properties.

#![allow(missing_docs)]

pub mod keys;

use std::fmt;

use crate::macros::Macros;
use crate::property::{PropertyCategory, PropertyDescriptor};
use crate::value::{
    ColorMap, FormatOption, HorizontalAlignment, Orientation, WidgetColor, WidgetFont,
};

use crate::property::PropertyCategory::{Behavior, Display, Position, Runtime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetKind {
    Display,
    Group,
    Label,
    TextUpdate,
    ActionButton,
    Led,
    ProgressBar,
    LinearMeter,
    Image,
    Embedded,
}

/// Broad grouping used by editors to organize the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetCategory {
    Structure,
    Graphic,
    Monitor,
    Control,
    Plot,
}

struct KindInfo {
    kind: WidgetKind,
    type_name: &'static str,
    description: &'static str,
    category: WidgetCategory,
    aliases: &'static [&'static str],
    container: bool,
    pv_based: bool,
    size: (i32, i32),
    define: fn(&mut Vec<PropertyDescriptor>),
}

const KINDS: &[KindInfo] = &[
    KindInfo {
        kind: WidgetKind::Display,
        type_name: "display",
        description: "Display root",
        category: WidgetCategory::Structure,
        aliases: &[],
        container: true,
        pv_based: false,
        size: (800, 600),
        define: define_display,
    },
    KindInfo {
        kind: WidgetKind::Group,
        type_name: "group",
        description: "Group of widgets",
        category: WidgetCategory::Structure,
        aliases: &["org.csstudio.opibuilder.widgets.groupingContainer"],
        container: true,
        pv_based: false,
        size: (300, 200),
        define: define_group,
    },
    KindInfo {
        kind: WidgetKind::Label,
        type_name: "label",
        description: "Static text",
        category: WidgetCategory::Graphic,
        aliases: &["org.csstudio.opibuilder.widgets.Label"],
        container: false,
        pv_based: false,
        size: (100, 20),
        define: define_label,
    },
    KindInfo {
        kind: WidgetKind::TextUpdate,
        type_name: "textupdate",
        description: "Displays the value of a PV as text",
        category: WidgetCategory::Monitor,
        aliases: &["org.csstudio.opibuilder.widgets.TextUpdate"],
        container: false,
        pv_based: true,
        size: (100, 20),
        define: define_text_update,
    },
    KindInfo {
        kind: WidgetKind::ActionButton,
        type_name: "action_button",
        description: "Button that invokes actions",
        category: WidgetCategory::Control,
        aliases: &["org.csstudio.opibuilder.widgets.ActionButton"],
        container: false,
        pv_based: true,
        size: (100, 30),
        define: define_action_button,
    },
    KindInfo {
        kind: WidgetKind::Led,
        type_name: "led",
        description: "On/off indicator",
        category: WidgetCategory::Monitor,
        aliases: &["org.csstudio.opibuilder.widgets.LED"],
        container: false,
        pv_based: true,
        size: (20, 20),
        define: define_led,
    },
    KindInfo {
        kind: WidgetKind::ProgressBar,
        type_name: "progressbar",
        description: "Bar graph",
        category: WidgetCategory::Monitor,
        aliases: &["org.csstudio.opibuilder.widgets.progressbar"],
        container: false,
        pv_based: true,
        size: (100, 20),
        define: define_progress_bar,
    },
    KindInfo {
        kind: WidgetKind::LinearMeter,
        type_name: "linear-meter",
        description: "Linear meter with needle",
        category: WidgetCategory::Monitor,
        aliases: &["org.csstudio.opibuilder.widgets.linearmeter"],
        container: false,
        pv_based: true,
        size: (180, 60),
        define: define_linear_meter,
    },
    KindInfo {
        kind: WidgetKind::Image,
        type_name: "image",
        description: "Image display with cursor readout and regions of interest",
        category: WidgetCategory::Plot,
        aliases: &["org.csstudio.opibuilder.widgets.intensityGraph"],
        container: false,
        pv_based: true,
        size: (400, 300),
        define: define_image,
    },
    KindInfo {
        kind: WidgetKind::Embedded,
        type_name: "embedded",
        description: "Embedded display file",
        category: WidgetCategory::Structure,
        aliases: &["org.csstudio.opibuilder.widgets.linkingContainer"],
        container: false,
        pv_based: false,
        size: (400, 300),
        define: define_embedded,
    },
];

impl WidgetKind {
    pub const ALL: [WidgetKind; 10] = [
        WidgetKind::Display,
        WidgetKind::Group,
        WidgetKind::Label,
        WidgetKind::TextUpdate,
        WidgetKind::ActionButton,
        WidgetKind::Led,
        WidgetKind::ProgressBar,
        WidgetKind::LinearMeter,
        WidgetKind::Image,
        WidgetKind::Embedded,
    ];

    /// Look up a kind by current or legacy type name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        KINDS
            .iter()
            .find(|info| info.type_name == name || info.aliases.contains(&name))
            .map(|info| info.kind)
    }

    #[must_use]
    pub fn type_name(self) -> &'static str {
        self.info().type_name
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        self.info().description
    }

    #[must_use]
    pub fn category(self) -> WidgetCategory {
        self.info().category
    }

    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        self.info().aliases
    }

    #[must_use]
    pub fn is_container(self) -> bool {
        self.info().container
    }

    /// Kinds with a primary `pv_name` and the `pv_value`/`connected` runtime properties.
    #[must_use]
    pub fn is_pv_based(self) -> bool {
        self.info().pv_based
    }

    /// Property set of the kind, in declaration order.
    #[must_use]
    pub fn property_descriptors(self) -> Vec<PropertyDescriptor> {
        let info = self.info();
        let mut properties = Vec::new();
        define_common(info, &mut properties);
        (info.define)(&mut properties);
        if info.pv_based {
            define_pv(&mut properties);
        }
        properties
    }

    fn info(self) -> &'static KindInfo {
        // The table holds every variant in declaration order.
        &KINDS[self as usize]
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

const BLACK: WidgetColor = WidgetColor::rgb(0, 0, 0);
const WHITE: WidgetColor = WidgetColor::rgb(255, 255, 255);
const BACKGROUND: WidgetColor = WidgetColor::rgb(240, 240, 240);

fn define_common(info: &KindInfo, properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(
            keys::TYPE,
            PropertyCategory::Widget,
            "Type",
            info.type_name.to_string(),
        )
        .readonly(),
        PropertyDescriptor::new(keys::NAME, PropertyCategory::Widget, "Name", String::new()).macroized(),
        PropertyDescriptor::new(keys::X, Position, "X", 0).int_range(0, i32::MAX),
        PropertyDescriptor::new(keys::Y, Position, "Y", 0).int_range(0, i32::MAX),
        PropertyDescriptor::new(keys::WIDTH, Position, "Width", info.size.0).int_range(1, i32::MAX),
        PropertyDescriptor::new(keys::HEIGHT, Position, "Height", info.size.1)
            .int_range(1, i32::MAX),
        PropertyDescriptor::new(keys::VISIBLE, Display, "Visible", true),
        PropertyDescriptor::new(keys::ACTIONS, Behavior, "Actions", Vec::new()),
        PropertyDescriptor::new(keys::SCRIPTS, Behavior, "Scripts", Vec::new()),
        PropertyDescriptor::new(keys::TOOLTIP, Behavior, "Tool tip", String::new()).macroized(),
    ]);
}

fn define_pv(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::PV_NAME, PropertyCategory::Widget, "PV Name", String::new())
            .macroized(),
        PropertyDescriptor::new(keys::PV_VALUE, Runtime, "Value", None),
        PropertyDescriptor::new(keys::CONNECTED, Runtime, "Connected", false),
    ]);
}

fn macros_and_background(properties: &mut Vec<PropertyDescriptor>, background: WidgetColor) {
    properties.extend([
        PropertyDescriptor::new(keys::MACROS, PropertyCategory::Widget, "Macros", Macros::new()),
        PropertyDescriptor::new(keys::BACKGROUND_COLOR, Display, "Background Color", background),
    ]);
}

fn define_display(properties: &mut Vec<PropertyDescriptor>) {
    macros_and_background(properties, BACKGROUND);
}

fn define_group(properties: &mut Vec<PropertyDescriptor>) {
    macros_and_background(properties, WHITE);
}

fn text_style(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::FOREGROUND_COLOR, Display, "Foreground Color", BLACK),
        PropertyDescriptor::new(keys::BACKGROUND_COLOR, Display, "Background Color", BACKGROUND),
        PropertyDescriptor::new(keys::FONT, Display, "Font", WidgetFont::default()),
        PropertyDescriptor::new(
            keys::HORIZONTAL_ALIGNMENT,
            Display,
            "Horizontal Alignment",
            HorizontalAlignment::Left,
        ),
    ]);
}

fn define_label(properties: &mut Vec<PropertyDescriptor>) {
    properties.push(
        PropertyDescriptor::new(keys::TEXT, PropertyCategory::Widget, "Text", "Label".to_string())
            .macroized(),
    );
    text_style(properties);
    properties.push(PropertyDescriptor::new(
        keys::TRANSPARENT,
        Display,
        "Transparent",
        true,
    ));
}

fn define_text_update(properties: &mut Vec<PropertyDescriptor>) {
    text_style(properties);
    properties.extend([
        PropertyDescriptor::new(keys::FORMAT, Display, "Format", FormatOption::Default),
        PropertyDescriptor::new(keys::PRECISION, Display, "Precision", 2).int_range(-1, 15),
        PropertyDescriptor::new(keys::SHOW_UNITS, Display, "Show Units", true),
    ]);
}

fn define_action_button(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(
            keys::TEXT,
            PropertyCategory::Widget,
            "Text",
            "$(actions)".to_string(),
        )
        .macroized(),
        PropertyDescriptor::new(keys::FOREGROUND_COLOR, Display, "Foreground Color", BLACK),
        PropertyDescriptor::new(keys::BACKGROUND_COLOR, Display, "Background Color", BACKGROUND),
        PropertyDescriptor::new(keys::FONT, Display, "Font", WidgetFont::default()),
        PropertyDescriptor::new(keys::ENABLED, Behavior, "Enabled", true),
    ]);
}

fn define_led(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::BIT, PropertyCategory::Widget, "Bit", -1).int_range(-1, 31),
        PropertyDescriptor::new(
            keys::OFF_COLOR,
            Display,
            "Off Color",
            WidgetColor::rgb(60, 100, 60),
        ),
        PropertyDescriptor::new(
            keys::ON_COLOR,
            Display,
            "On Color",
            WidgetColor::rgb(0, 255, 0),
        ),
        PropertyDescriptor::new(keys::OFF_LABEL, Display, "Off Label", String::new()),
        PropertyDescriptor::new(keys::ON_LABEL, Display, "On Label", String::new()),
    ]);
}

fn limits(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::LIMITS_FROM_PV, Behavior, "Limits from PV", true),
        PropertyDescriptor::new(keys::MINIMUM, Behavior, "Minimum", 0.0),
        PropertyDescriptor::new(keys::MAXIMUM, Behavior, "Maximum", 100.0),
    ]);
}

fn define_progress_bar(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(
            keys::FILL_COLOR,
            Display,
            "Fill Color",
            WidgetColor::rgb(60, 255, 60),
        ),
        PropertyDescriptor::new(keys::BACKGROUND_COLOR, Display, "Background Color", BACKGROUND),
        PropertyDescriptor::new(keys::HORIZONTAL, Display, "Horizontal", true),
    ]);
    limits(properties);
}

fn define_linear_meter(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::FOREGROUND_COLOR, Display, "Foreground Color", BLACK),
        PropertyDescriptor::new(keys::BACKGROUND_COLOR, Display, "Background Color", BACKGROUND),
        PropertyDescriptor::new(
            keys::ORIENTATION,
            Display,
            "Orientation",
            Orientation::Horizontal,
        ),
    ]);
    limits(properties);
}

fn define_image(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::SHOW_TOOLBAR, Display, "Show Toolbar", false),
        PropertyDescriptor::new(keys::COLOR_MAP, Display, "Color Map", ColorMap::Viridis),
        PropertyDescriptor::new(keys::DATA_WIDTH, Behavior, "Data Width", 100)
            .int_range(1, i32::MAX),
        PropertyDescriptor::new(keys::DATA_HEIGHT, Behavior, "Data Height", 100)
            .int_range(1, i32::MAX),
        PropertyDescriptor::new(keys::AUTOSCALE, Behavior, "Auto-scale", true),
        PropertyDescriptor::new(keys::MINIMUM, Behavior, "Minimum", 0.0),
        PropertyDescriptor::new(keys::MAXIMUM, Behavior, "Maximum", 255.0),
        PropertyDescriptor::new(keys::CURSOR_INFO_PV, PropertyCategory::Widget, "Cursor Info PV", String::new())
            .macroized(),
        PropertyDescriptor::new(keys::CURSOR_X_PV, PropertyCategory::Widget, "Cursor X PV", String::new())
            .macroized(),
        PropertyDescriptor::new(keys::CURSOR_Y_PV, PropertyCategory::Widget, "Cursor Y PV", String::new())
            .macroized(),
        PropertyDescriptor::new(keys::ROIS, Behavior, "Regions of Interest", Vec::new()),
        PropertyDescriptor::new(keys::CURSOR_INFO, Runtime, "Cursor Info", None),
        PropertyDescriptor::new(keys::CURSOR_CROSSHAIR, Runtime, "Crosshair Location", Vec::new()),
    ]);
}

fn define_embedded(properties: &mut Vec<PropertyDescriptor>) {
    properties.extend([
        PropertyDescriptor::new(keys::FILE, PropertyCategory::Widget, "File", String::new()).macroized(),
        PropertyDescriptor::new(keys::MACROS, PropertyCategory::Widget, "Macros", Macros::new()),
    ]);
}
