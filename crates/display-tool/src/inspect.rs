//! `check`, `show` and `normalize`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use display_model::macros::contains_macros;
use display_model::persist::{save_display, LoadIssue, ModelReader};
use display_model::{keys, DisplayConfig, Value, Widget};
use tracing::{info, warn};

/// Display tree plus everything the reader skipped.
pub struct LoadedDisplay {
    pub display: Widget,
    pub issues: Vec<LoadIssue>,
}

pub fn load(path: &Path, config: &DisplayConfig) -> anyhow::Result<LoadedDisplay> {
    let xml = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut reader = ModelReader::new();
    let display = reader
        .read(&xml)
        .with_context(|| format!("parse {}", path.display()))?;
    config
        .apply_macros(&display)
        .context("apply configured macros")?;
    for issue in reader.issues() {
        warn!("{}: {issue}", path.display());
    }
    Ok(LoadedDisplay {
        display,
        issues: reader.issues().to_vec(),
    })
}

pub fn check(path: &Path, config: &DisplayConfig) -> anyhow::Result<()> {
    let loaded = load(path, config)?;
    let mut problems: Vec<String> = loaded.issues.iter().map(ToString::to_string).collect();
    problems.extend(unresolved_macros(&loaded.display));
    let widgets = loaded.display.descendants().len() - 1;
    for problem in &problems {
        println!("{problem}");
    }
    if problems.is_empty() {
        println!("{}: {widgets} widget(s), no problems", path.display());
        return Ok(());
    }
    bail!(
        "{}: {widgets} widget(s), {} problem(s)",
        path.display(),
        problems.len()
    )
}

/// Macroized text properties that still hold a reference after resolution.
pub fn unresolved_macros(display: &Widget) -> Vec<String> {
    let mut found = Vec::new();
    for widget in display.descendants() {
        for property in widget.properties() {
            let Some(specification) = property.specification() else {
                continue;
            };
            if let Value::Text(resolved) = property.value() {
                if contains_macros(&resolved) {
                    found.push(format!(
                        "{widget}: unresolved macro in '{}': {specification}",
                        property.name()
                    ));
                }
            }
        }
    }
    found
}

pub fn show(path: &Path, config: &DisplayConfig, properties: bool) -> anyhow::Result<()> {
    let loaded = load(path, config)?;
    print!("{}", render_tree(&loaded.display, properties));
    Ok(())
}

/// Indented widget tree, optionally with each widget's non-default
/// properties.
pub fn render_tree(display: &Widget, properties: bool) -> String {
    let mut out = String::new();
    render_widget(&mut out, display, 0, properties);
    out
}

fn render_widget(out: &mut String, widget: &Widget, depth: usize, properties: bool) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}{widget}");
    if properties {
        for property in widget.properties() {
            if property.is_runtime()
                || property.is_default_value()
                || property.name() == keys::NAME.name()
            {
                continue;
            }
            let _ = writeln!(
                out,
                "{indent}  - {} = {}",
                property.name(),
                property.persisted_value()
            );
        }
    }
    for child in widget.children().iter() {
        render_widget(out, child, depth + 1, properties);
    }
}

pub fn normalize(path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    // Configured macros are a runtime overlay and must not end up in the file.
    let loaded = load(path, &DisplayConfig::default())?;
    let target = output.unwrap_or(path);
    save_display(target, &loaded.display)
        .with_context(|| format!("write {}", target.display()))?;
    info!(
        "normalized {} into {} ({} issue(s) dropped)",
        path.display(),
        target.display(),
        loaded.issues.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_model::WidgetKind;
    use expect_test::expect;

    const DISPLAY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<display version="2.0.0">
  <name>Main</name>
  <widget type="label" version="2.0.0">
    <name>title</name>
    <text>Plant $(AREA)</text>
  </widget>
  <widget type="group" version="2.0.0">
    <name>g</name>
    <widget type="textupdate" version="2.0.0">
      <name>t</name>
      <pv_name>$(P)temp</pv_name>
    </widget>
    <widget type="no_such_widget" version="2.0.0">
      <name>odd</name>
    </widget>
  </widget>
</display>
"#;

    fn write_display(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("main.bob");
        fs::write(&path, DISPLAY).expect("write");
        path
    }

    #[test]
    fn load_collects_skipped_widgets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load(&write_display(&dir), &DisplayConfig::default()).expect("load");
        assert_eq!(loaded.display.descendants().len(), 4);
        assert_eq!(loaded.issues.len(), 1);
    }

    #[test]
    fn tree_lists_widgets_and_properties() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load(&write_display(&dir), &DisplayConfig::default()).expect("load");
        expect![[r#"
display 'Main'
  label 'title'
    - text = Plant $(AREA)
  group 'g'
    textupdate 't'
      - pv_name = $(P)temp
"#]]
        .assert_eq(&render_tree(&loaded.display, true));
    }

    #[test]
    fn reports_macros_left_unresolved() {
        let config = DisplayConfig::from_toml_str("[macros]\nP = \"plant:\"\n").expect("config");
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load(&write_display(&dir), &config).expect("load");
        assert_eq!(
            unresolved_macros(&loaded.display),
            vec!["label 'title': unresolved macro in 'text': Plant $(AREA)".to_string()]
        );
    }

    #[test]
    fn normalize_rewrites_without_skipped_widgets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_display(&dir);
        let output = dir.path().join("clean.bob");
        normalize(&path, Some(&output)).expect("normalize");

        let reloaded = load(&output, &DisplayConfig::default()).expect("reload");
        assert!(reloaded.issues.is_empty());
        let names: Vec<_> = reloaded
            .display
            .descendants()
            .iter()
            .map(Widget::name)
            .collect();
        assert_eq!(names, vec!["Main", "title", "g", "t"]);
        let label = reloaded
            .display
            .find_widget_by_name("title")
            .expect("title");
        assert_eq!(label.kind(), WidgetKind::Label);
        assert_eq!(fs::read_to_string(&path).expect("input"), DISPLAY);
    }
}
