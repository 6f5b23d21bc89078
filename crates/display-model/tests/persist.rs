use expect_test::expect;

use display_model::persist::{load_display, read_display, save_display, write_display, ModelReader};
use display_model::value::{
    ActionInfo, FormatOption, OpenTarget, RoiInfo, ScriptInfo, ScriptPv, WidgetColor,
};
use display_model::{keys, Macros, Widget, WidgetKind};

fn sample_display() -> Widget {
    let display = Widget::new(WidgetKind::Display);
    display
        .set_property_value(
            keys::MACROS,
            Macros::from_pairs([("S", "sim")]).expect("macros"),
        )
        .expect("macros");

    let label = Widget::new(WidgetKind::Label);
    label
        .set_property_value(keys::NAME, "Title".to_string())
        .expect("name");
    label.set_property_value(keys::X, 10).expect("x");
    label
        .property(keys::TEXT)
        .expect("text")
        .set_specification("Mode $(S)")
        .expect("spec");
    display.add_child(label).expect("label");

    let group = Widget::new(WidgetKind::Group);
    let update = Widget::new(WidgetKind::TextUpdate);
    update
        .property(keys::PV_NAME)
        .expect("pv")
        .set_specification("$(S):temp")
        .expect("spec");
    update
        .set_property_value(keys::FORMAT, FormatOption::Exponential)
        .expect("format");
    update
        .set_property_value(keys::FOREGROUND_COLOR, WidgetColor::named("Alarm", 255, 0, 0))
        .expect("color");
    group.add_child(update).expect("update");
    display.add_child(group).expect("group");
    display
}

#[test]
fn writes_only_non_default_properties() {
    let xml = write_display(&sample_display());
    expect![[r#"
<?xml version="1.0" encoding="UTF-8"?>
<display version="2.0.0">
  <macros>
    <S>sim</S>
  </macros>
  <widget type="label" version="2.0.0">
    <name>Title</name>
    <x>10</x>
    <text>Mode $(S)</text>
  </widget>
  <widget type="group" version="2.0.0">
    <widget type="textupdate" version="2.0.0">
      <foreground_color>
        <color name="Alarm" red="255" green="0" blue="0" alpha="255"/>
      </foreground_color>
      <format>2</format>
      <pv_name>$(S):temp</pv_name>
    </widget>
  </widget>
</display>
"#]]
    .assert_eq(&xml);
}

#[test]
fn write_then_read_preserves_tree() {
    let original = sample_display();
    let xml = write_display(&original);
    let loaded = read_display(&xml).expect("read");

    assert_eq!(write_display(&loaded), xml);
    let label = loaded.find_widget_by_name("Title").expect("label");
    assert_eq!(label.property_value(keys::TEXT).expect("text"), "Mode sim");
    let children = loaded.children();
    let group_children = children[1].children();
    let update = &group_children[0];
    assert_eq!(
        update.property_value(keys::PV_NAME).expect("pv"),
        "sim:temp"
    );
    assert_eq!(
        update.property_value(keys::FORMAT).expect("format"),
        FormatOption::Exponential
    );
}

#[test]
fn structured_values_survive_a_round_trip() {
    let display = Widget::new(WidgetKind::Display);
    let button = Widget::new(WidgetKind::ActionButton);
    let actions = vec![
        ActionInfo::OpenDisplay {
            description: "Details".to_string(),
            file: "details.bob".to_string(),
            target: OpenTarget::Window,
            macros: Macros::from_pairs([("DEV", "m1")]).expect("macros"),
        },
        ActionInfo::WritePv {
            description: "Reset".to_string(),
            pv_name: "$(DEV):reset".to_string(),
            value: "1".to_string(),
        },
    ];
    button
        .set_property_value(keys::ACTIONS, actions.clone())
        .expect("actions");
    let scripts = vec![ScriptInfo::new(
        "update.py",
        vec![ScriptPv::new("a"), ScriptPv::passive("b")],
    )];
    button
        .set_property_value(keys::SCRIPTS, scripts.clone())
        .expect("scripts");
    display.add_child(button).expect("button");

    let image = Widget::new(WidgetKind::Image);
    let mut roi = RoiInfo::new("beam");
    roi.x_pv = "roi:x".to_string();
    roi.width = 32.5;
    image
        .set_property_value(keys::ROIS, vec![roi.clone()])
        .expect("rois");
    display.add_child(image).expect("image");

    let loaded = read_display(&write_display(&display)).expect("read");
    let children = loaded.children();
    assert_eq!(
        children[0].property_value(keys::ACTIONS).expect("actions"),
        actions
    );
    assert_eq!(
        children[0].property_value(keys::SCRIPTS).expect("scripts"),
        scripts
    );
    assert_eq!(children[1].property_value(keys::ROIS).expect("rois"), vec![roi]);
}

#[test]
fn unknown_elements_and_types_are_skipped() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<display version="2.0.0">
  <future_property>7</future_property>
  <widget type="label" version="2.0.0">
    <text>Hello</text>
    <sparkle>yes</sparkle>
  </widget>
  <widget type="xyplot" version="2.0.0">
    <name>plot</name>
  </widget>
  <widget type="led" version="2.0.0">
    <bit>banana</bit>
    <name>status</name>
  </widget>
</display>
"#;
    let mut reader = ModelReader::new();
    let display = reader.read(xml).expect("read");

    let children = display.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].property_value(keys::TEXT).expect("text"), "Hello");
    assert_eq!(children[1].name(), "status");
    assert_eq!(children[1].property_value(keys::BIT).expect("bit"), -1);
    assert_eq!(reader.issues().len(), 2);
}

#[test]
fn legacy_files_use_old_names() {
    let xml = r#"<display version="1.0.0">
  <widget typeId="org.csstudio.opibuilder.widgets.linkingContainer" version="1.0.0">
    <widget_name>Embedded</widget_name>
    <opi_file>motor.opi</opi_file>
    <macros>
      <include_parent_macros>true</include_parent_macros>
      <M>1</M>
    </macros>
  </widget>
</display>
"#;
    let display = read_display(xml).expect("read");
    let children = display.children();
    let embedded = &children[0];
    assert_eq!(embedded.kind(), WidgetKind::Embedded);
    assert_eq!(embedded.name(), "Embedded");
    assert_eq!(embedded.property_value(keys::FILE).expect("file"), "motor.opi");
    let macros = embedded.property_value(keys::MACROS).expect("macros");
    assert_eq!(macros.get("M"), Some("1"));
    assert_eq!(macros.len(), 1);
}

#[test]
fn enum_accepts_label() {
    let xml = r#"<display>
  <widget type="textupdate">
    <format>hexadecimal</format>
  </widget>
</display>
"#;
    let display = read_display(xml).expect("read");
    assert_eq!(
        display.children()[0]
            .property_value(keys::FORMAT)
            .expect("format"),
        FormatOption::Hexadecimal
    );
}

#[test]
fn rejects_documents_that_are_not_displays() {
    assert!(read_display("<widget type=\"label\"/>").is_err());
    assert!(read_display("<display>").is_err());
}

#[test]
fn save_and_load_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("main.bob");
    let display = sample_display();

    save_display(&path, &display).expect("save");
    assert!(!dir.path().join(".main.bob.tmp").exists());
    let loaded = load_display(&path).expect("load");
    assert_eq!(write_display(&loaded), write_display(&display));

    let missing = dir.path().join("missing.bob");
    assert!(load_display(&missing).is_err());
}
