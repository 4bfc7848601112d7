use std::fs::File;
use std::path::Path;

use crate::error::StorageError;

/// Write `target` through a temporary file in the same directory, renamed
/// into place only once `fill` succeeds. On failure `target` is untouched.
pub(crate) fn write_atomically<F>(target: &Path, fill: F) -> Result<(), StorageError>
where
  F: FnOnce(&File) -> Result<(), StorageError>,
{
  let parent = match target.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };

  let temp = tempfile::Builder::new()
    .prefix(".filedepot-")
    .suffix(".part")
    .tempfile_in(parent)?;

  fill(temp.as_file())?;
  temp.as_file().sync_all()?;
  temp.persist(target).map_err(|e| StorageError::Io(e.error))?;
  Ok(())
}
