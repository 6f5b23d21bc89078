//! `display.toml` configuration.
//!
//! ```toml
//! [representation]
//! update_throttle_ms = 100
//!
//! [editor]
//! undo_merge_window_ms = 1000
//! undo_limit = 50
//!
//! [log]
//! level = "info"
//!
//! [macros]
//! SYSTEM = "demo"
//! ```

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::DisplayError;
use crate::macros::Macros;
use crate::widget::Widget;
use crate::widgets::keys;

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub representation: RepresentationConfig,
    pub editor: EditorConfig,
    pub log: LogConfig,
    /// Defaults placed under the display's own macros.
    pub macros: Macros,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepresentationConfig {
    pub update_throttle: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorConfig {
    pub undo_merge_window: Duration,
    pub undo_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: SmolStr,
}

impl Default for RepresentationConfig {
    fn default() -> Self {
        Self {
            update_throttle: Duration::from_millis(100),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_merge_window: Duration::from_millis(1000),
            undo_limit: 50,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: SmolStr::new_inline("info"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            representation: RepresentationConfig::default(),
            editor: EditorConfig::default(),
            log: LogConfig::default(),
            macros: Macros::new(),
        }
    }
}

impl DisplayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DisplayError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| DisplayError::InvalidConfig(format!("display.toml: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, DisplayError> {
        let raw: DisplayToml = toml::from_str(text)
            .map_err(|err| DisplayError::InvalidConfig(format!("display.toml: {err}").into()))?;
        raw.into_config()
    }

    /// Layer the configured macros under the display's own macros.
    pub fn apply_macros(&self, display: &Widget) -> Result<(), DisplayError> {
        if self.macros.is_empty() {
            return Ok(());
        }
        let property = display.property(keys::MACROS)?;
        property.set_value(Macros::merge(&self.macros, &property.value()));
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DisplayToml {
    representation: Option<RepresentationSection>,
    editor: Option<EditorSection>,
    log: Option<LogSection>,
    macros: Option<IndexMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RepresentationSection {
    update_throttle_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditorSection {
    undo_merge_window_ms: Option<u64>,
    undo_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

impl DisplayToml {
    fn into_config(self) -> Result<DisplayConfig, DisplayError> {
        let defaults = DisplayConfig::default();

        let update_throttle = match self
            .representation
            .and_then(|section| section.update_throttle_ms)
        {
            Some(0) => {
                return Err(DisplayError::InvalidConfig(
                    "representation.update_throttle_ms must be greater than 0".into(),
                ))
            }
            Some(ms) => Duration::from_millis(ms),
            None => defaults.representation.update_throttle,
        };

        let (merge_window, undo_limit) = match self.editor {
            Some(section) => (
                section
                    .undo_merge_window_ms
                    .map_or(defaults.editor.undo_merge_window, Duration::from_millis),
                section.undo_limit.unwrap_or(defaults.editor.undo_limit),
            ),
            None => (defaults.editor.undo_merge_window, defaults.editor.undo_limit),
        };
        if undo_limit == 0 {
            return Err(DisplayError::InvalidConfig(
                "editor.undo_limit must be greater than 0".into(),
            ));
        }

        let level = match self.log.and_then(|section| section.level) {
            Some(level) => {
                let level = level.trim().to_ascii_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(DisplayError::InvalidConfig(
                        format!("log.level '{level}' must be one of {}", LOG_LEVELS.join(", "))
                            .into(),
                    ));
                }
                SmolStr::new(level)
            }
            None => defaults.log.level,
        };

        let mut macros = Macros::new();
        for (name, value) in self.macros.unwrap_or_default() {
            macros.add(&name, value).map_err(|err| {
                DisplayError::InvalidConfig(format!("macros.{name}: {err}").into())
            })?;
        }

        Ok(DisplayConfig {
            representation: RepresentationConfig { update_throttle },
            editor: EditorConfig {
                undo_merge_window: merge_window,
                undo_limit,
            },
            log: LogConfig { level },
            macros,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DisplayConfig::from_toml_str("").expect("config");
        assert_eq!(config, DisplayConfig::default());
    }

    #[test]
    fn reads_all_sections() {
        let config = DisplayConfig::from_toml_str(
            r#"
[representation]
update_throttle_ms = 40

[editor]
undo_merge_window_ms = 250
undo_limit = 5

[log]
level = "DEBUG"

[macros]
S = "sim"
N = "3"
"#,
        )
        .expect("config");
        assert_eq!(config.representation.update_throttle, Duration::from_millis(40));
        assert_eq!(config.editor.undo_merge_window, Duration::from_millis(250));
        assert_eq!(config.editor.undo_limit, 5);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.macros.len(), 2);
        assert_eq!(config.macros.get("S"), Some("sim"));
        assert_eq!(config.macros.get("N"), Some("3"));
    }

    #[test]
    fn rejects_invalid_values() {
        for text in [
            "[representation]\nupdate_throttle_ms = 0\n",
            "[editor]\nundo_limit = 0\n",
            "[log]\nlevel = \"loud\"\n",
            "[macros]\n\"1BAD\" = \"x\"\n",
            "[unknown]\nkey = 1\n",
        ] {
            let err = DisplayConfig::from_toml_str(text).expect_err(text);
            assert!(matches!(err, DisplayError::InvalidConfig(_)), "{text}: {err}");
        }
    }
}
