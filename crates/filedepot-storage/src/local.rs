//! Local filesystem backend.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filedepot_config::StoreDescriptor;
use tracing::{info, instrument, warn};

use crate::atomic::write_atomically;
use crate::contract::{Storage, public_url};
use crate::error::StorageError;
use crate::record::{HandleSummary, PullInfo, VersionRecord};
use crate::resolve::{
  expand_home, first_entry, handle_segment, parse_version_names, push_source,
  resolve_local_path, select_version,
};

/// Storage in a directory on this machine.
///
/// Same layout, numbering and listing rules as the remote backend:
/// `{base_path}/{sanitized handle}/{version}/{filename}`.
pub struct LocalFilesystemStorage {
  store: StoreDescriptor,
  base: PathBuf,
}

impl LocalFilesystemStorage {
  /// Open the store; a leading `~` in its base path is expanded.
  pub fn new(store: StoreDescriptor) -> Self {
    let base = expand_home(store.base_path(), dirs::home_dir().as_deref());
    Self { store, base }
  }

  fn handle_dir(&self, handle: &str) -> Result<PathBuf, StorageError> {
    Ok(self.base.join(handle_segment(handle)?))
  }

  fn versions_in(&self, dir: &Path) -> Result<Vec<u64>, StorageError> {
    Ok(parse_version_names(entry_names(dir)?))
  }

  fn locate(
    &self,
    handle: &str,
    version: Option<u64>,
  ) -> Result<(u64, PathBuf, String), StorageError> {
    let dir = self.handle_dir(handle)?;
    let version = select_version(handle, &self.versions_in(&dir)?, version)?;

    let version_dir = dir.join(version.to_string());
    let filename = first_entry(entry_names(&version_dir)?).ok_or_else(|| {
      StorageError::EmptyVersion {
        handle: handle.to_string(),
        version,
      }
    })?;

    Ok((version, version_dir.join(&filename), filename))
  }

  /// Push with `transfer` doing the copy into the new version directory.
  fn push_with<F>(&self, handle: &str, local_path: &Path, transfer: F) -> Result<u64, StorageError>
  where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
  {
    let (source, filename) = push_source(local_path)?;
    let dir = self.handle_dir(handle)?;

    let version = self.versions_in(&dir)?.last().copied().unwrap_or(0) + 1;
    let version_dir = dir.join(version.to_string());

    // `create_dir` fails if a concurrent push already claimed this number.
    fs::create_dir_all(&dir)?;
    fs::create_dir(&version_dir)?;

    if let Err(e) = transfer(&source, &version_dir.join(&filename)) {
      let cleanup = fs::remove_dir_all(&version_dir).and_then(|_| remove_if_empty(&dir));
      if let Err(cleanup) = cleanup {
        warn!(
          version_dir = %version_dir.display(),
          error = %cleanup,
          "failed to remove incomplete version"
        );
      }
      return Err(e.into());
    }

    info!(version, file = %filename, "pushed");
    Ok(version)
  }
}

impl Storage for LocalFilesystemStorage {
  fn descriptor(&self) -> &StoreDescriptor {
    &self.store
  }

  fn test(&self) -> Result<(), StorageError> {
    fs::create_dir_all(&self.base)?;
    Ok(())
  }

  fn base_path(&self) -> String {
    self.base.to_string_lossy().into_owned()
  }

  fn handles_data(&self) -> Result<Vec<HandleSummary>, StorageError> {
    let mut names: Vec<String> = entry_names(&self.base)?
      .into_iter()
      .filter(|name| self.base.join(name).is_dir())
      .collect();
    names.sort_unstable();

    names
      .into_iter()
      .map(|name| {
        let dir = self.base.join(&name);
        Ok(HandleSummary {
          versions_count: self.versions_in(&dir)?.len(),
          size: Some(dir_size(&dir)?),
          handle: name,
        })
      })
      .collect()
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn push(&self, handle: &str, local_path: &Path) -> Result<u64, StorageError> {
    self.push_with(handle, local_path, |from, to| fs::copy(from, to).map(drop))
  }

  fn pull_info(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PullInfo, StorageError> {
    let (version, _, filename) = self.locate(handle, version)?;

    Ok(PullInfo {
      target_path: resolve_local_path(local_path, &filename)?,
      remote_filename: filename,
      version,
    })
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn pull(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PathBuf, StorageError> {
    let (version, source, filename) = self.locate(handle, version)?;
    let target = resolve_local_path(local_path, &filename)?;

    write_atomically(&target, |mut file| {
      io::copy(&mut fs::File::open(&source)?, &mut file)?;
      Ok(())
    })?;

    info!(version, target = %target.display(), "pulled");
    Ok(target)
  }

  fn version_numbers(&self, handle: &str) -> Result<Vec<u64>, StorageError> {
    self.versions_in(&self.handle_dir(handle)?)
  }

  fn versions_data(&self, handle: &str) -> Result<Vec<VersionRecord>, StorageError> {
    let dir = self.handle_dir(handle)?;
    let public_base = self.store.public_base_url();

    let mut records = Vec::new();
    for version in self.versions_in(&dir)?.into_iter().rev() {
      let version_dir = dir.join(version.to_string());
      let filename = first_entry(entry_names(&version_dir)?);
      let path = match &filename {
        Some(name) => version_dir.join(name),
        None => version_dir.clone(),
      };

      records.push(VersionRecord {
        version,
        datetime: modified(&path),
        path: path.to_string_lossy().into_owned(),
        handle: handle.to_string(),
        url: filename
          .as_deref()
          .and_then(|name| public_url(public_base, handle, version, name)),
        filename,
        size: Some(dir_size(&version_dir)?),
      });
    }
    Ok(records)
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn delete(&self, handle: &str, version: Option<u64>) -> Result<(), StorageError> {
    let dir = self.handle_dir(handle)?;

    match version {
      Some(version) => {
        ignore_missing(fs::remove_dir_all(dir.join(version.to_string())))?;
        if self.versions_in(&dir)?.is_empty() {
          remove_if_empty(&dir)?;
        }
        info!(version, "deleted version");
      }
      None => {
        ignore_missing(fs::remove_dir_all(&dir))?;
        info!("deleted handle");
      }
    }
    Ok(())
  }
}

/// Names of the entries in `dir`; empty when `dir` does not exist.
fn entry_names(dir: &Path) -> Result<Vec<String>, StorageError> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
      return Ok(Vec::new());
    }
    Err(e) => return Err(e.into()),
  };

  let mut names = Vec::new();
  for entry in entries {
    names.push(entry?.file_name().to_string_lossy().into_owned());
  }
  Ok(names)
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
  match result {
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

/// Remove `dir` if it exists and has no entries left.
fn remove_if_empty(dir: &Path) -> io::Result<()> {
  let mut entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(e),
  };

  if entries.next().is_none() {
    ignore_missing(fs::remove_dir(dir))?;
  }
  Ok(())
}

fn modified(path: &Path) -> Option<DateTime<Utc>> {
  fs::metadata(path)
    .and_then(|m| m.modified())
    .ok()
    .map(DateTime::<Utc>::from)
}

/// Total length of the regular files under `path`. Symlinks are not
/// followed.
fn dir_size(path: &Path) -> Result<u64, StorageError> {
  let meta = match fs::symlink_metadata(path) {
    Ok(meta) => meta,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
    Err(e) => return Err(e.into()),
  };
  if !meta.is_dir() {
    return Ok(if meta.is_file() { meta.len() } else { 0 });
  }

  let mut total = 0;
  for entry in fs::read_dir(path)? {
    total += dir_size(&entry?.path())?;
  }
  Ok(total)
}
