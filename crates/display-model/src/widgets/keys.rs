//! Property keys shared across widget kinds.

use crate::macros::Macros;
use crate::property::PropertyKey;
use crate::value::{
    ActionInfo, ColorMap, FormatOption, HorizontalAlignment, Orientation, RoiInfo, ScriptInfo,
    VType, WidgetColor, WidgetFont,
};

pub const TYPE: PropertyKey<String> = PropertyKey::new("type");
pub const NAME: PropertyKey<String> = PropertyKey::new("name");
pub const MACROS: PropertyKey<Macros> = PropertyKey::new("macros");
pub const X: PropertyKey<i32> = PropertyKey::new("x");
pub const Y: PropertyKey<i32> = PropertyKey::new("y");
pub const WIDTH: PropertyKey<i32> = PropertyKey::new("width");
pub const HEIGHT: PropertyKey<i32> = PropertyKey::new("height");
pub const VISIBLE: PropertyKey<bool> = PropertyKey::new("visible");
pub const ACTIONS: PropertyKey<Vec<ActionInfo>> = PropertyKey::new("actions");
pub const SCRIPTS: PropertyKey<Vec<ScriptInfo>> = PropertyKey::new("scripts");
pub const TOOLTIP: PropertyKey<String> = PropertyKey::new("tooltip");

pub const TEXT: PropertyKey<String> = PropertyKey::new("text");
pub const FILE: PropertyKey<String> = PropertyKey::new("file");
pub const FOREGROUND_COLOR: PropertyKey<WidgetColor> = PropertyKey::new("foreground_color");
pub const BACKGROUND_COLOR: PropertyKey<WidgetColor> = PropertyKey::new("background_color");
pub const FILL_COLOR: PropertyKey<WidgetColor> = PropertyKey::new("fill_color");
pub const TRANSPARENT: PropertyKey<bool> = PropertyKey::new("transparent");
pub const FONT: PropertyKey<WidgetFont> = PropertyKey::new("font");
pub const HORIZONTAL_ALIGNMENT: PropertyKey<HorizontalAlignment> =
    PropertyKey::new("horizontal_alignment");
pub const FORMAT: PropertyKey<FormatOption> = PropertyKey::new("format");
pub const PRECISION: PropertyKey<i32> = PropertyKey::new("precision");
pub const SHOW_UNITS: PropertyKey<bool> = PropertyKey::new("show_units");
pub const ENABLED: PropertyKey<bool> = PropertyKey::new("enabled");

pub const BIT: PropertyKey<i32> = PropertyKey::new("bit");
pub const OFF_COLOR: PropertyKey<WidgetColor> = PropertyKey::new("off_color");
pub const ON_COLOR: PropertyKey<WidgetColor> = PropertyKey::new("on_color");
pub const OFF_LABEL: PropertyKey<String> = PropertyKey::new("off_label");
pub const ON_LABEL: PropertyKey<String> = PropertyKey::new("on_label");

pub const LIMITS_FROM_PV: PropertyKey<bool> = PropertyKey::new("limits_from_pv");
pub const MINIMUM: PropertyKey<f64> = PropertyKey::new("minimum");
pub const MAXIMUM: PropertyKey<f64> = PropertyKey::new("maximum");
pub const HORIZONTAL: PropertyKey<bool> = PropertyKey::new("horizontal");
pub const ORIENTATION: PropertyKey<Orientation> = PropertyKey::new("orientation");

pub const PV_NAME: PropertyKey<String> = PropertyKey::new("pv_name");
pub const PV_VALUE: PropertyKey<Option<VType>> = PropertyKey::new("pv_value");
pub const CONNECTED: PropertyKey<bool> = PropertyKey::new("connected");

pub const COLOR_MAP: PropertyKey<ColorMap> = PropertyKey::new("color_map");
pub const DATA_WIDTH: PropertyKey<i32> = PropertyKey::new("data_width");
pub const DATA_HEIGHT: PropertyKey<i32> = PropertyKey::new("data_height");
pub const AUTOSCALE: PropertyKey<bool> = PropertyKey::new("autoscale");
pub const SHOW_TOOLBAR: PropertyKey<bool> = PropertyKey::new("show_toolbar");
pub const CURSOR_INFO_PV: PropertyKey<String> = PropertyKey::new("cursor_info_pv");
pub const CURSOR_X_PV: PropertyKey<String> = PropertyKey::new("x_pv");
pub const CURSOR_Y_PV: PropertyKey<String> = PropertyKey::new("y_pv");
pub const ROIS: PropertyKey<Vec<RoiInfo>> = PropertyKey::new("rois");
pub const CURSOR_INFO: PropertyKey<Option<VType>> = PropertyKey::new("cursor_info");
/// `[x, y]` of the crosshair, empty when not shown.
pub const CURSOR_CROSSHAIR: PropertyKey<Vec<f64>> = PropertyKey::new("cursor_crosshair");
