//! Element and attribute names used in display files.

pub const DISPLAY: &str = "display";
pub const WIDGET: &str = "widget";
pub const VERSION: &str = "version";
pub const TYPE: &str = "type";
pub const LEGACY_TYPE: &str = "typeId";

pub const ACTION: &str = "action";
pub const COLOR: &str = "color";
pub const DESCRIPTION: &str = "description";
pub const FILE: &str = "file";
pub const MACROS: &str = "macros";
pub const NAME: &str = "name";
pub const PV: &str = "pv";
pub const PV_NAME: &str = "pv_name";
pub const SCRIPT: &str = "script";
pub const TARGET: &str = "target";
pub const TRIGGER: &str = "trigger";
pub const VALUE: &str = "value";

pub const LEGACY_SCRIPT: &str = "path";
pub const LEGACY_SCRIPT_FILE: &str = "pathString";
pub const LEGACY_TRIGGER: &str = "trig";

pub const RED: &str = "red";
pub const GREEN: &str = "green";
pub const BLUE: &str = "blue";
pub const ALPHA: &str = "alpha";

pub const FONT: &str = "font";
pub const FAMILY: &str = "family";
pub const STYLE: &str = "style";
pub const SIZE: &str = "size";

pub const POINT: &str = "point";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";

pub const ROI: &str = "roi";
pub const VISIBLE: &str = "visible";
