//! Loading and saving display files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::DisplayError;
use crate::persist::reader::ModelReader;
use crate::persist::writer::write_display;
use crate::widget::Widget;

/// Load a display file.
pub fn load_display(path: impl AsRef<Path>) -> Result<Widget, DisplayError> {
    let path = path.as_ref();
    let xml = fs::read_to_string(path)
        .map_err(|err| DisplayError::Io(format!("{}: {err}", path.display()).into()))?;
    let mut reader = ModelReader::new();
    let display = reader.read(&xml)?;
    debug!(
        "loaded {} with {} issue(s)",
        path.display(),
        reader.issues().len()
    );
    Ok(display)
}

/// Save a display file.
///
/// The document is written to a temporary sibling first and then renamed
/// over `path`, so a failed save leaves the previous file in place.
pub fn save_display(path: impl AsRef<Path>, display: &Widget) -> Result<(), DisplayError> {
    let path = path.as_ref();
    let xml = write_display(display);
    let temp = temp_sibling(path)?;
    let result = fs::write(&temp, xml).and_then(|()| fs::rename(&temp, path));
    if let Err(err) = result {
        let _ = fs::remove_file(&temp);
        return Err(DisplayError::Io(
            format!("{}: {err}", path.display()).into(),
        ));
    }
    info!("saved {}", path.display());
    Ok(())
}

fn temp_sibling(path: &Path) -> Result<PathBuf, DisplayError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| DisplayError::Io(format!("invalid file name '{}'", path.display()).into()))?;
    Ok(path.with_file_name(format!(".{file_name}.tmp")))
}
