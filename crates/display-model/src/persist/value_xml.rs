//! Element encodings for each value kind.

use roxmltree::Node;
use tracing::warn;

use crate::error::DisplayError;
use crate::macros::Macros;
use crate::persist::xml_tags as tags;
use crate::persist::xml_writer::XmlWriter;
use crate::value::{
    ActionInfo, EnumValue, FontStyle, OpenTarget, Point, RoiCoordinate, RoiInfo, ScriptInfo,
    ScriptPv, Value, WidgetColor, WidgetFont,
};

/// Write `value` as the element `name`.
pub(crate) fn write_value(writer: &mut XmlWriter, name: &str, value: &Value) {
    match value {
        Value::Bool(value) => writer.text(name, &[], &value.to_string()),
        Value::Int(value) => writer.text(name, &[], &value.to_string()),
        Value::Double(value) => writer.text(name, &[], &value.to_string()),
        Value::Text(value) => writer.text(name, &[], value),
        Value::Enum(value) => writer.text(name, &[], &value.index.to_string()),
        Value::Color(color) => {
            writer.start(name, &[]);
            write_color(writer, color);
            writer.end(name);
        }
        Value::Font(font) => {
            writer.start(name, &[]);
            let size = font.size.to_string();
            writer.empty(
                tags::FONT,
                &[
                    (tags::FAMILY, font.family.as_str()),
                    (tags::STYLE, font.style.as_str()),
                    (tags::SIZE, size.as_str()),
                ],
            );
            writer.end(name);
        }
        Value::Macros(macros) => write_macros(writer, name, macros),
        Value::Points(points) => {
            writer.start(name, &[]);
            for point in points {
                let x = point.x.to_string();
                let y = point.y.to_string();
                writer.empty(tags::POINT, &[(tags::X, x.as_str()), (tags::Y, y.as_str())]);
            }
            writer.end(name);
        }
        Value::Scripts(scripts) => {
            writer.start(name, &[]);
            for script in scripts {
                write_script(writer, script);
            }
            writer.end(name);
        }
        Value::Actions(actions) => {
            writer.start(name, &[]);
            for action in actions {
                write_action(writer, action);
            }
            writer.end(name);
        }
        Value::Rois(rois) => {
            writer.start(name, &[]);
            for roi in rois {
                write_roi(writer, roi);
            }
            writer.end(name);
        }
        Value::DoubleArray(values) => {
            writer.start(name, &[]);
            for value in values {
                writer.text(tags::VALUE, &[], &value.to_string());
            }
            writer.end(name);
        }
        Value::Pv(_) => {}
    }
}

fn write_color(writer: &mut XmlWriter, color: &WidgetColor) {
    let red = color.red.to_string();
    let green = color.green.to_string();
    let blue = color.blue.to_string();
    let alpha = color.alpha.to_string();
    let mut attributes = Vec::with_capacity(5);
    if let Some(name) = &color.name {
        attributes.push((tags::NAME, name.as_str()));
    }
    attributes.extend([
        (tags::RED, red.as_str()),
        (tags::GREEN, green.as_str()),
        (tags::BLUE, blue.as_str()),
        (tags::ALPHA, alpha.as_str()),
    ]);
    writer.empty(tags::COLOR, &attributes);
}

fn write_macros(writer: &mut XmlWriter, name: &str, macros: &Macros) {
    writer.start(name, &[]);
    for (macro_name, value) in macros.iter() {
        writer.text(macro_name, &[], value);
    }
    writer.end(name);
}

fn write_script(writer: &mut XmlWriter, script: &ScriptInfo) {
    writer.start(tags::SCRIPT, &[(tags::FILE, script.file.as_str())]);
    for pv in &script.pvs {
        if pv.trigger {
            writer.text(tags::PV, &[], &pv.name);
        } else {
            writer.text(tags::PV, &[(tags::TRIGGER, "false")], &pv.name);
        }
    }
    writer.end(tags::SCRIPT);
}

fn write_action(writer: &mut XmlWriter, action: &ActionInfo) {
    writer.start(tags::ACTION, &[(tags::TYPE, action.type_name())]);
    match action {
        ActionInfo::OpenDisplay {
            description,
            file,
            target,
            macros,
        } => {
            writer.text(tags::FILE, &[], file);
            if !macros.is_empty() {
                write_macros(writer, tags::MACROS, macros);
            }
            writer.text(tags::TARGET, &[], target.as_str());
            writer.text(tags::DESCRIPTION, &[], description);
        }
        ActionInfo::WritePv {
            description,
            pv_name,
            value,
        } => {
            writer.text(tags::PV_NAME, &[], pv_name);
            writer.text(tags::VALUE, &[], value);
            writer.text(tags::DESCRIPTION, &[], description);
        }
        ActionInfo::ExecuteScript { description, file } => {
            writer.text(tags::FILE, &[], file);
            writer.text(tags::DESCRIPTION, &[], description);
        }
    }
    writer.end(tags::ACTION);
}

fn write_roi(writer: &mut XmlWriter, roi: &RoiInfo) {
    writer.start(tags::ROI, &[]);
    writer.text(tags::NAME, &[], &roi.name);
    writer.start(tags::COLOR, &[]);
    write_color(writer, &roi.color);
    writer.end(tags::COLOR);
    writer.text(tags::VISIBLE, &[], &roi.visible.to_string());
    for (tag, pv, value) in [
        (tags::X, &roi.x_pv, roi.x),
        (tags::Y, &roi.y_pv, roi.y),
        (tags::WIDTH, &roi.width_pv, roi.width),
        (tags::HEIGHT, &roi.height_pv, roi.height),
    ] {
        if !pv.is_empty() {
            writer.text(&format!("{tag}_pv"), &[], pv);
        }
        writer.text(&format!("{tag}_value"), &[], &value.to_string());
    }
    writer.end(tags::ROI);
}

/// Decode the element `node` into a value of the same kind as `template`.
pub(crate) fn read_value(
    node: Node<'_, '_>,
    property: &str,
    template: &Value,
) -> Result<Value, DisplayError> {
    let invalid = |reason: String| DisplayError::InvalidValue {
        property: property.into(),
        reason: reason.into(),
    };
    let value = match template {
        Value::Bool(_) => Value::Bool(parse_bool(&element_text(node)).ok_or_else(|| {
            invalid(format!("expected boolean, got '{}'", element_text(node)))
        })?),
        Value::Int(_) => {
            let text = element_text(node);
            let trimmed = text.trim();
            let value = trimmed
                .parse::<i32>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(round_to_int))
                .ok_or_else(|| invalid(format!("expected integer, got '{trimmed}'")))?;
            Value::Int(value)
        }
        Value::Double(_) => {
            let text = element_text(node);
            Value::Double(
                text.trim()
                    .parse()
                    .map_err(|_| invalid(format!("expected number, got '{}'", text.trim())))?,
            )
        }
        Value::Text(_) => Value::Text(element_text(node)),
        Value::Enum(template) => Value::Enum(read_enum(node, *template).map_err(invalid)?),
        Value::Color(_) => {
            let color = child_element(node, tags::COLOR)
                .ok_or_else(|| invalid("missing <color>".to_string()))?;
            Value::Color(read_color(color).map_err(invalid)?)
        }
        Value::Font(_) => {
            let font = child_element(node, tags::FONT)
                .ok_or_else(|| invalid("missing <font>".to_string()))?;
            Value::Font(read_font(font).map_err(invalid)?)
        }
        Value::Macros(_) => Value::Macros(read_macros(node)?),
        Value::Points(_) => Value::Points(
            child_elements(node, tags::POINT)
                .map(|point| {
                    Ok(Point {
                        x: number_attribute(point, tags::X)?,
                        y: number_attribute(point, tags::Y)?,
                    })
                })
                .collect::<Result<_, String>>()
                .map_err(invalid)?,
        ),
        Value::Scripts(_) => Value::Scripts(read_scripts(node)),
        Value::Actions(_) => Value::Actions(read_actions(node)?),
        Value::Rois(_) => Value::Rois(
            child_elements(node, tags::ROI)
                .map(read_roi)
                .collect::<Result<_, String>>()
                .map_err(invalid)?,
        ),
        Value::DoubleArray(_) => Value::DoubleArray(
            child_elements(node, tags::VALUE)
                .map(|entry| {
                    let text = element_text(entry);
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| format!("expected number, got '{}'", text.trim()))
                })
                .collect::<Result<_, String>>()
                .map_err(invalid)?,
        ),
        Value::Pv(_) => return Err(invalid("runtime values are not persisted".to_string())),
    };
    Ok(value)
}

/// Enum stored as ordinal; labels are accepted as well.
fn read_enum(node: Node<'_, '_>, template: EnumValue) -> Result<EnumValue, String> {
    let text = element_text(node);
    let trimmed = text.trim();
    let index = match trimmed.parse::<usize>() {
        Ok(index) => index,
        Err(_) => template
            .labels
            .iter()
            .position(|label| label.eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown {} '{trimmed}'", template.kind))?,
    };
    if index >= template.labels.len() {
        return Err(format!("{} index {index} out of range", template.kind));
    }
    Ok(EnumValue { index, ..template })
}

fn read_color(node: Node<'_, '_>) -> Result<WidgetColor, String> {
    let channel = |name: &str| -> Result<u8, String> {
        match node.attribute(name) {
            Some(text) => text
                .trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid {name} '{text}'")),
            None if name == tags::ALPHA => Ok(255),
            None => Err(format!("missing {name}")),
        }
    };
    Ok(WidgetColor {
        name: node.attribute(tags::NAME).map(str::to_string),
        red: channel(tags::RED)?,
        green: channel(tags::GREEN)?,
        blue: channel(tags::BLUE)?,
        alpha: channel(tags::ALPHA)?,
    })
}

fn read_font(node: Node<'_, '_>) -> Result<WidgetFont, String> {
    let defaults = WidgetFont::default();
    let family = node
        .attribute(tags::FAMILY)
        .map_or(defaults.family, str::to_string);
    let style = match node.attribute(tags::STYLE) {
        Some(text) => FontStyle::parse(text).ok_or_else(|| format!("unknown font style '{text}'"))?,
        None => defaults.style,
    };
    let size = match node.attribute(tags::SIZE) {
        Some(_) => number_attribute(node, tags::SIZE)?,
        None => defaults.size,
    };
    Ok(WidgetFont::new(family, style, size))
}

fn read_macros(node: Node<'_, '_>) -> Result<Macros, DisplayError> {
    let mut macros = Macros::new();
    for entry in node.children().filter(Node::is_element) {
        let name = entry.tag_name().name();
        // Legacy flag, inheritance is always on.
        if name == "include_parent_macros" {
            continue;
        }
        macros.add(name, element_text(entry))?;
    }
    Ok(macros)
}

fn read_scripts(node: Node<'_, '_>) -> Vec<ScriptInfo> {
    let tag = if child_element(node, tags::SCRIPT).is_some() {
        tags::SCRIPT
    } else {
        tags::LEGACY_SCRIPT
    };
    child_elements(node, tag)
        .map(|script| {
            let file = script
                .attribute(tags::FILE)
                .filter(|file| !file.is_empty())
                .or_else(|| script.attribute(tags::LEGACY_SCRIPT_FILE))
                .unwrap_or_default()
                .to_string();
            let pvs = child_elements(script, tags::PV)
                .map(|pv| {
                    let trigger = [tags::TRIGGER, tags::LEGACY_TRIGGER]
                        .iter()
                        .all(|attribute| pv.attribute(*attribute).and_then(parse_bool) != Some(false));
                    ScriptPv {
                        name: element_text(pv).trim().to_string(),
                        trigger,
                    }
                })
                .collect();
            ScriptInfo { file, pvs }
        })
        .collect()
}

fn read_actions(node: Node<'_, '_>) -> Result<Vec<ActionInfo>, DisplayError> {
    let mut actions = Vec::new();
    for action in child_elements(node, tags::ACTION) {
        let kind = action.attribute(tags::TYPE).unwrap_or_default();
        let text = |tag: &str| child_element(action, tag).map(element_text).unwrap_or_default();
        let description = text(tags::DESCRIPTION);
        let info = match kind {
            "open_display" | "OPEN_DISPLAY" => {
                let target = child_element(action, tags::TARGET)
                    .and_then(|target| OpenTarget::parse(&element_text(target)))
                    .unwrap_or(OpenTarget::Tab);
                let macros = match child_element(action, tags::MACROS) {
                    Some(macros) => read_macros(macros)?,
                    None => Macros::new(),
                };
                ActionInfo::OpenDisplay {
                    description,
                    file: text(tags::FILE),
                    target,
                    macros,
                }
            }
            "write_pv" | "WRITE_PV" => ActionInfo::WritePv {
                description,
                pv_name: text(tags::PV_NAME),
                value: text(tags::VALUE),
            },
            "execute" | "EXECUTE_SCRIPT" => ActionInfo::ExecuteScript {
                description,
                file: text(tags::FILE),
            },
            other => {
                warn!("ignoring unknown action type '{other}'");
                continue;
            }
        };
        actions.push(info);
    }
    Ok(actions)
}

fn read_roi(node: Node<'_, '_>) -> Result<RoiInfo, String> {
    let mut roi = RoiInfo::new(
        child_element(node, tags::NAME)
            .map(element_text)
            .unwrap_or_default(),
    );
    if let Some(color) =
        child_element(node, tags::COLOR).and_then(|color| child_element(color, tags::COLOR))
    {
        roi.color = read_color(color)?;
    }
    if let Some(visible) = child_element(node, tags::VISIBLE) {
        roi.visible = parse_bool(&element_text(visible)).unwrap_or(true);
    }
    for coordinate in RoiCoordinate::ALL {
        let tag = roi_tag(coordinate);
        if let Some(pv) = child_element(node, &format!("{tag}_pv")) {
            roi.set_pv_name(coordinate, element_text(pv).trim().to_string());
        }
        if let Some(value) = child_element(node, &format!("{tag}_value")) {
            let text = element_text(value);
            let number = text
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid ROI {tag} '{}'", text.trim()))?;
            roi.set_coordinate(coordinate, number);
        }
    }
    Ok(roi)
}

fn roi_tag(coordinate: RoiCoordinate) -> &'static str {
    match coordinate {
        RoiCoordinate::X => tags::X,
        RoiCoordinate::Y => tags::Y,
        RoiCoordinate::Width => tags::WIDTH,
        RoiCoordinate::Height => tags::HEIGHT,
    }
}

pub(crate) fn child_element<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

pub(crate) fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == name)
}

/// Concatenated text of the element's direct text children.
pub(crate) fn element_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|child| child.text())
        .collect()
}

fn number_attribute(node: Node<'_, '_>, name: &str) -> Result<f64, String> {
    let text = node
        .attribute(name)
        .ok_or_else(|| format!("missing {name}"))?;
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {name} '{text}'"))
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_int(value: f64) -> i32 {
    value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
