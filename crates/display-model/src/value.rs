//! Property value storage and the typed edges around it.
//!
//! Every property stores a [`Value`]; typed handles convert through
//! [`PropertyType`] so callers work with `i32`, `String`, [`WidgetColor`]
//! and friends while listeners and persistence stay uniform.

#![allow(missing_docs)]

use std::fmt;

use crate::macros::Macros;

/// Type-erased property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Double(f64),
    Text(String),
    Color(WidgetColor),
    Font(WidgetFont),
    Macros(Macros),
    Enum(EnumValue),
    Points(Vec<Point>),
    Scripts(Vec<ScriptInfo>),
    Actions(Vec<ActionInfo>),
    Rois(Vec<RoiInfo>),
    /// Live data delivered by the runtime, absent until the first update.
    Pv(Option<VType>),
    DoubleArray(Vec<f64>),
}

impl Value {
    /// Name of the value variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Color(_) => "color",
            Self::Font(_) => "font",
            Self::Macros(_) => "macros",
            Self::Enum(value) => value.kind,
            Self::Points(_) => "points",
            Self::Scripts(_) => "scripts",
            Self::Actions(_) => "actions",
            Self::Rois(_) => "rois",
            Self::Pv(_) => "pv value",
            Self::DoubleArray(_) => "double array",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Color(value) => write!(f, "{value}"),
            Self::Font(value) => write!(f, "{value}"),
            Self::Macros(value) => write!(f, "{value}"),
            Self::Enum(value) => f.write_str(value.label()),
            Self::Points(points) => write!(f, "{} points", points.len()),
            Self::Scripts(scripts) => write!(f, "{} scripts", scripts.len()),
            Self::Actions(actions) => write!(f, "{} actions", actions.len()),
            Self::Rois(rois) => write!(f, "{} ROIs", rois.len()),
            Self::Pv(Some(value)) => write!(f, "{value}"),
            Self::Pv(None) => f.write_str("<no value>"),
            Self::DoubleArray(values) => write!(f, "{values:?}"),
        }
    }
}

/// Conversion between a Rust type and the stored [`Value`].
pub trait PropertyType: Clone + PartialEq + Send + Sync + 'static {
    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! simple_property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

simple_property_type!(bool, Bool);
simple_property_type!(i32, Int);
simple_property_type!(f64, Double);
simple_property_type!(String, Text);
simple_property_type!(WidgetColor, Color);
simple_property_type!(WidgetFont, Font);
simple_property_type!(Macros, Macros);
simple_property_type!(Vec<Point>, Points);
simple_property_type!(Vec<ScriptInfo>, Scripts);
simple_property_type!(Vec<ActionInfo>, Actions);
simple_property_type!(Vec<RoiInfo>, Rois);
simple_property_type!(Option<VType>, Pv);
simple_property_type!(Vec<f64>, DoubleArray);

/// Stored form of an enumerated property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub kind: &'static str,
    pub labels: &'static [&'static str],
    pub index: usize,
}

impl EnumValue {
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.labels.get(self.index).copied().unwrap_or("?")
    }
}

/// Enumerations usable as property values.
pub trait PropertyEnum: Copy + PartialEq + Send + Sync + 'static {
    const KIND: &'static str;
    const LABELS: &'static [&'static str];

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;
}

/// Declare an enum that can be stored in a widget property.
#[macro_export]
macro_rules! property_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $kind:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $crate::value::PropertyEnum for $name {
            const KIND: &'static str = $kind;
            const LABELS: &'static [&'static str] = &[$($label),+];

            fn index(self) -> usize {
                const VARIANTS: &[$name] = &[$($name::$variant),+];
                VARIANTS.iter().position(|candidate| *candidate == self).unwrap_or(0)
            }

            fn from_index(index: usize) -> Option<Self> {
                const VARIANTS: &[$name] = &[$($name::$variant),+];
                VARIANTS.get(index).copied()
            }
        }

        impl $crate::value::PropertyType for $name {
            fn into_value(self) -> $crate::value::Value {
                $crate::value::Value::Enum($crate::value::EnumValue {
                    kind: <$name as $crate::value::PropertyEnum>::KIND,
                    labels: <$name as $crate::value::PropertyEnum>::LABELS,
                    index: $crate::value::PropertyEnum::index(self),
                })
            }

            fn from_value(value: &$crate::value::Value) -> Option<Self> {
                match value {
                    $crate::value::Value::Enum(inner)
                        if inner.kind == <$name as $crate::value::PropertyEnum>::KIND =>
                    {
                        <$name as $crate::value::PropertyEnum>::from_index(inner.index)
                    }
                    _ => None,
                }
            }
        }
    };
}

property_enum! {
    /// Horizontal text alignment.
    pub enum HorizontalAlignment: "horizontal alignment" {
        Left => "Left",
        Center => "Center",
        Right => "Right",
    }
}

property_enum! {
    /// Number format for text updates.
    pub enum FormatOption: "format" {
        Default => "Default",
        Decimal => "Decimal",
        Exponential => "Exponential",
        Engineering => "Engineering",
        Hexadecimal => "Hexadecimal",
        String => "String",
    }
}

property_enum! {
    /// Meter orientation.
    pub enum Orientation: "orientation" {
        Horizontal => "Horizontal",
        Vertical => "Vertical",
    }
}

property_enum! {
    /// Image color map.
    pub enum ColorMap: "color map" {
        Gray => "Gray",
        Jet => "Jet",
        Spectrum => "Spectrum",
        Hot => "Hot",
        Viridis => "Viridis",
    }
}

/// RGBA color, optionally carrying a palette name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetColor {
    pub name: Option<String>,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl WidgetColor {
    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            name: None,
            red,
            green,
            blue,
            alpha: 255,
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, red: u8, green: u8, blue: u8) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::rgb(red, green, blue)
        }
    }
}

impl fmt::Display for WidgetColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None if self.alpha == 255 => {
                write!(f, "RGB({},{},{})", self.red, self.green, self.blue)
            }
            None => write!(
                f,
                "RGBA({},{},{},{})",
                self.red, self.green, self.blue, self.alpha
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::Bold => "BOLD",
            Self::Italic => "ITALIC",
            Self::BoldItalic => "BOLD_ITALIC",
        }
    }

    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "REGULAR" => Some(Self::Regular),
            "BOLD" => Some(Self::Bold),
            "ITALIC" => Some(Self::Italic),
            "BOLD_ITALIC" => Some(Self::BoldItalic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetFont {
    pub family: String,
    pub style: FontStyle,
    pub size: f64,
}

impl WidgetFont {
    #[must_use]
    pub fn new(family: impl Into<String>, style: FontStyle, size: f64) -> Self {
        Self {
            family: family.into(),
            style,
            size,
        }
    }
}

impl Default for WidgetFont {
    fn default() -> Self {
        Self::new("Liberation Sans", FontStyle::Regular, 14.0)
    }
}

impl fmt::Display for WidgetFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.family, self.style.as_str(), self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// PV used by a script, optionally triggering its execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPv {
    pub name: String,
    pub trigger: bool,
}

impl ScriptPv {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: true,
        }
    }

    #[must_use]
    pub fn passive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trigger: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInfo {
    pub file: String,
    pub pvs: Vec<ScriptPv>,
}

impl ScriptInfo {
    #[must_use]
    pub fn new(file: impl Into<String>, pvs: Vec<ScriptPv>) -> Self {
        Self {
            file: file.into(),
            pvs,
        }
    }
}

/// Where an "open display" action shows the new display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenTarget {
    Replace,
    Tab,
    Window,
}

impl OpenTarget {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Tab => "tab",
            Self::Window => "window",
        }
    }

    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "tab" => Some(Self::Tab),
            "window" => Some(Self::Window),
            _ => None,
        }
    }
}

/// User-invocable widget action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionInfo {
    OpenDisplay {
        description: String,
        file: String,
        target: OpenTarget,
        macros: Macros,
    },
    WritePv {
        description: String,
        pv_name: String,
        value: String,
    },
    ExecuteScript {
        description: String,
        file: String,
    },
}

impl ActionInfo {
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::OpenDisplay { description, .. }
            | Self::WritePv { description, .. }
            | Self::ExecuteScript { description, .. } => description,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::OpenDisplay { .. } => "open_display",
            Self::WritePv { .. } => "write_pv",
            Self::ExecuteScript { .. } => "execute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoiCoordinate {
    X,
    Y,
    Width,
    Height,
}

impl RoiCoordinate {
    pub const ALL: [Self; 4] = [Self::X, Self::Y, Self::Width, Self::Height];
}

/// Region of interest on an image widget, each coordinate optionally tied to a PV.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiInfo {
    pub name: String,
    pub color: WidgetColor,
    pub visible: bool,
    pub x_pv: String,
    pub y_pv: String,
    pub width_pv: String,
    pub height_pv: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RoiInfo {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: WidgetColor::rgb(255, 0, 0),
            visible: true,
            x_pv: String::new(),
            y_pv: String::new(),
            width_pv: String::new(),
            height_pv: String::new(),
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        }
    }

    #[must_use]
    pub fn coordinate(&self, coordinate: RoiCoordinate) -> f64 {
        match coordinate {
            RoiCoordinate::X => self.x,
            RoiCoordinate::Y => self.y,
            RoiCoordinate::Width => self.width,
            RoiCoordinate::Height => self.height,
        }
    }

    pub fn set_coordinate(&mut self, coordinate: RoiCoordinate, value: f64) {
        match coordinate {
            RoiCoordinate::X => self.x = value,
            RoiCoordinate::Y => self.y = value,
            RoiCoordinate::Width => self.width = value,
            RoiCoordinate::Height => self.height = value,
        }
    }

    pub fn set_pv_name(&mut self, coordinate: RoiCoordinate, name: String) {
        match coordinate {
            RoiCoordinate::X => self.x_pv = name,
            RoiCoordinate::Y => self.y_pv = name,
            RoiCoordinate::Width => self.width_pv = name,
            RoiCoordinate::Height => self.height_pv = name,
        }
    }

    #[must_use]
    pub fn pv_name(&self, coordinate: RoiCoordinate) -> &str {
        match coordinate {
            RoiCoordinate::X => &self.x_pv,
            RoiCoordinate::Y => &self.y_pv,
            RoiCoordinate::Width => &self.width_pv,
            RoiCoordinate::Height => &self.height_pv,
        }
    }
}

/// Value of a live data point.
#[derive(Debug, Clone, PartialEq)]
pub enum VType {
    Double(f64),
    Long(i64),
    Text(String),
    Enum { index: usize, labels: Vec<String> },
    DoubleArray(Vec<f64>),
}

impl VType {
    /// Numeric view of the value, if it has one.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            Self::Long(value) => Some(*value as f64),
            Self::Enum { index, .. } => Some(*index as f64),
            Self::Text(text) => text.trim().parse().ok(),
            Self::DoubleArray(values) => values.first().copied(),
        }
    }

    /// Parse user text into the most specific value type.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Long(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Self::Double(value);
        }
        Self::Text(text.to_string())
    }
}

impl fmt::Display for VType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(value) => write!(f, "{value}"),
            Self::Long(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Enum { index, labels } => match labels.get(*index) {
                Some(label) => f.write_str(label),
                None => write!(f, "{index}"),
            },
            Self::DoubleArray(values) => write!(f, "{values:?}"),
        }
    }
}
