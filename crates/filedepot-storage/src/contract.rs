//! The storage contract.
//!
//! [`Storage`] is what every backend implements. The operations that only
//! combine contract calls (`current_version`, `info`, `url`, ...) are free
//! functions here, written once for every backend.

use std::path::{Path, PathBuf};

use filedepot_config::StoreDescriptor;

use crate::error::StorageError;
use crate::record::{HandleInfo, HandleSummary, PullInfo, VersionRecord, VersionRow};
use crate::resolve::{sanitize_handle, version_dir};

/// Versioned storage of files under caller-chosen handles.
///
/// Layout: `{base_path}/{sanitized handle}/{version}/{original filename}`,
/// one file per version directory, versions numbered from 1 and never reused.
pub trait Storage {
  /// The store this backend was built from.
  fn descriptor(&self) -> &StoreDescriptor;

  /// Check that the store is reachable and usable.
  fn test(&self) -> Result<(), StorageError>;

  /// Enumerate handle directories under the base path, sorted by name.
  fn handles_data(&self) -> Result<Vec<HandleSummary>, StorageError>;

  /// Store `local_path` as a new version of `handle`; returns the version.
  ///
  /// Either the new version directory appears with its file, or nothing
  /// is left behind.
  fn push(&self, handle: &str, local_path: &Path) -> Result<u64, StorageError>;

  /// Resolve which version a pull would fetch and where it would land.
  fn pull_info(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PullInfo, StorageError>;

  /// Fetch a version (the latest when `version` is `None`) to the resolved
  /// local path, overwriting it; returns that path.
  fn pull(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PathBuf, StorageError>;

  /// Existing version numbers of `handle`, ascending. Empty when the handle
  /// does not exist.
  fn version_numbers(&self, handle: &str) -> Result<Vec<u64>, StorageError>;

  /// Records for every version of `handle`, highest version first.
  fn versions_data(&self, handle: &str) -> Result<Vec<VersionRecord>, StorageError>;

  /// Delete one version, or the whole handle when `version` is `None`.
  ///
  /// Removing the last version removes the handle directory. Missing
  /// handles and versions are ignored.
  fn delete(&self, handle: &str, version: Option<u64>) -> Result<(), StorageError>;

  /// The base path as the backend addresses it. The local backend has
  /// already expanded `~`.
  fn base_path(&self) -> String {
    self.descriptor().base_path().to_string()
  }

  /// Handle names under the base path, sorted.
  fn ls(&self) -> Result<Vec<String>, StorageError> {
    Ok(
      self
        .handles_data()?
        .into_iter()
        .map(|h| h.handle)
        .collect(),
    )
  }
}

/// The highest existing version of `handle`, or 0 when it has none.
pub fn current_version<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
) -> Result<u64, StorageError> {
  Ok(
    storage
      .version_numbers(handle)?
      .into_iter()
      .max()
      .unwrap_or(0),
  )
}

/// The version the next push of `handle` will create.
pub fn next_version<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
) -> Result<u64, StorageError> {
  Ok(current_version(storage, handle)? + 1)
}

/// The store-side directory the next push of `handle` will create.
pub fn next_version_path<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
) -> Result<String, StorageError> {
  let next = next_version(storage, handle)?;
  version_dir(&storage.base_path(), handle, next)
}

/// Display rows for every version of `handle`, highest version first.
pub fn versions<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
) -> Result<Vec<VersionRow>, StorageError> {
  Ok(
    storage
      .versions_data(handle)?
      .iter()
      .map(VersionRow::from)
      .collect(),
  )
}

/// Summarize `handle` from its version records.
pub fn info<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
) -> Result<HandleInfo, StorageError> {
  let data = storage.versions_data(handle)?;
  let latest = data.first();

  Ok(HandleInfo {
    handle: handle.to_string(),
    remote_base_path: storage.descriptor().base_path().to_string(),
    current_version: latest.map(|r| r.version).unwrap_or(0),
    updated_at: latest.and_then(|r| r.datetime),
    latest_version_url: latest.and_then(|r| r.url.clone()),
  })
}

/// Public URL of a stored file, when the store has a public base URL.
pub fn url<S: Storage + ?Sized>(
  storage: &S,
  handle: &str,
  version: u64,
  filename: &str,
) -> Option<String> {
  public_url(
    storage.descriptor().public_base_url(),
    handle,
    version,
    filename,
  )
}

/// `{base}/{handle}/{version}/{filename}`, with trailing slashes stripped
/// from `base`. `None` without a base or a filename.
///
/// The handle is sanitized and stripped of outer `/` the same way as on
/// disk, so the URL names the directory the file actually lives in.
pub fn public_url(
  base: Option<&str>,
  handle: &str,
  version: u64,
  filename: &str,
) -> Option<String> {
  let base = base?.trim_end_matches('/');
  if base.is_empty() || filename.is_empty() {
    return None;
  }

  Some(format!(
    "{}/{}/{}/{}",
    base,
    sanitize_handle(handle).trim_matches('/'),
    version,
    filename
  ))
}
