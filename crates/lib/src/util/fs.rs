//! File output helpers.

use std::fs;
use std::path::Path;

use crate::ninja::WriteError;

/// Writes `content` to `path` unless the file already holds exactly that.
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool, WriteError> {
  if let Ok(existing) = fs::read(path)
    && existing == content.as_bytes()
  {
    return Ok(false);
  }
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(|source| WriteError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, content).map_err(|source| WriteError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(true)
}
