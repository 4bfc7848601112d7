//! Remote shell backend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filedepot_config::StoreDescriptor;
use tracing::{info, instrument, warn};

use crate::atomic::write_atomically;
use crate::command::RemoteCommand;
use crate::contract::{Storage, public_url};
use crate::error::StorageError;
use crate::record::{HandleSummary, PullInfo, VersionRecord};
use crate::resolve::{
  first_entry, handle_dir, join, parse_versions, push_source, resolve_local_path,
  select_version,
};
use crate::transport::{Session, SshTransport, Transport};

/// Storage on a remote host, driven through shell commands.
///
/// Every public operation opens one session, runs all of its commands and
/// transfers on it, and closes it before returning.
pub struct RemoteShellStorage<T: Transport = SshTransport> {
  store: StoreDescriptor,
  transport: T,
}

impl RemoteShellStorage<SshTransport> {
  /// Connect over ssh using the store's host, port and username.
  pub fn new(store: StoreDescriptor) -> Self {
    let transport = SshTransport::from_descriptor(&store);
    Self { store, transport }
  }
}

/// A version's file, located on the store.
struct Located {
  version: u64,
  remote_file: String,
  filename: String,
}

impl<T: Transport> RemoteShellStorage<T> {
  pub fn with_transport(store: StoreDescriptor, transport: T) -> Self {
    Self { store, transport }
  }

  fn base(&self) -> &str {
    self.store.base_path()
  }

  fn versions_for(&self, session: &T::Session, handle: &str) -> Result<Vec<u64>, StorageError> {
    let dir = handle_dir(self.base(), handle)?;
    let listing = session.exec(&RemoteCommand::list(&dir))?;
    Ok(parse_versions(&listing))
  }

  fn first_file(&self, session: &T::Session, dir: &str) -> Result<Option<String>, StorageError> {
    let listing = session.exec(&RemoteCommand::list(dir))?;
    Ok(first_entry(listing.lines()))
  }

  fn mtime(
    &self,
    session: &T::Session,
    path: &str,
  ) -> Result<Option<DateTime<Utc>>, StorageError> {
    let out = session.exec(&RemoteCommand::mtime(path))?;
    Ok(
      out
        .lines()
        .find_map(|l| l.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    )
  }

  fn disk_usage(&self, session: &T::Session, path: &str) -> Result<Option<u64>, StorageError> {
    let out = session.exec(&RemoteCommand::disk_usage(path))?;
    Ok(
      out
        .split_whitespace()
        .next()
        .and_then(|kib| kib.parse::<u64>().ok())
        .map(|kib| kib * 1024),
    )
  }

  fn locate(
    &self,
    session: &T::Session,
    handle: &str,
    version: Option<u64>,
  ) -> Result<Located, StorageError> {
    let available = self.versions_for(session, handle)?;
    let version = select_version(handle, &available, version)?;

    let version_dir = join(&handle_dir(self.base(), handle)?, &version.to_string());
    let filename = self
      .first_file(session, &version_dir)?
      .ok_or_else(|| StorageError::EmptyVersion {
        handle: handle.to_string(),
        version,
      })?;

    Ok(Located {
      version,
      remote_file: join(&version_dir, &filename),
      filename,
    })
  }
}

impl<T: Transport> Storage for RemoteShellStorage<T> {
  fn descriptor(&self) -> &StoreDescriptor {
    &self.store
  }

  fn test(&self) -> Result<(), StorageError> {
    let session = self.transport.open()?;
    let out = session.exec(&RemoteCommand::new("echo").flag("ok"))?;
    if !out.contains("ok") {
      return Err(StorageError::transport(format!(
        "connection check failed for store '{}'",
        self.store.name
      )));
    }
    Ok(())
  }

  fn handles_data(&self) -> Result<Vec<HandleSummary>, StorageError> {
    let session = self.transport.open()?;
    let listing = session.exec(&RemoteCommand::list_marked(self.base()))?;

    let mut names: Vec<&str> = listing
      .lines()
      .filter_map(|l| l.trim_end().strip_suffix('/'))
      .filter(|n| !n.is_empty())
      .collect();
    names.sort_unstable();

    let mut handles = Vec::with_capacity(names.len());
    for name in names {
      let dir = join(self.base(), name);
      let versions = parse_versions(&session.exec(&RemoteCommand::list(&dir))?);
      handles.push(HandleSummary {
        handle: name.to_string(),
        versions_count: versions.len(),
        size: self.disk_usage(&session, &dir)?,
      });
    }
    Ok(handles)
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn push(&self, handle: &str, local_path: &Path) -> Result<u64, StorageError> {
    let (source, filename) = push_source(local_path)?;
    let dir = handle_dir(self.base(), handle)?;

    let session = self.transport.open()?;
    let version = self.versions_for(&session, handle)?.last().copied().unwrap_or(0) + 1;
    let version_dir = join(&dir, &version.to_string());

    // Plain `mkdir` on the version directory fails if a concurrent push
    // already claimed this number.
    session.exec(&RemoteCommand::mkdir(&dir))?;
    session.exec(&RemoteCommand::new("mkdir").path(&version_dir))?;

    if let Err(e) = session.upload(&source, &join(&version_dir, &filename)) {
      let cleanup = session
        .exec(&RemoteCommand::remove_all(&version_dir))
        .and_then(|_| session.exec(&RemoteCommand::remove_empty_dir(&dir)));
      if let Err(cleanup) = cleanup {
        warn!(%version_dir, error = %cleanup, "failed to remove incomplete version");
      }
      return Err(e);
    }

    info!(version, file = %filename, "pushed");
    Ok(version)
  }

  fn pull_info(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PullInfo, StorageError> {
    let session = self.transport.open()?;
    let located = self.locate(&session, handle, version)?;

    Ok(PullInfo {
      target_path: resolve_local_path(local_path, &located.filename)?,
      remote_filename: located.filename,
      version: located.version,
    })
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn pull(
    &self,
    handle: &str,
    version: Option<u64>,
    local_path: Option<&str>,
  ) -> Result<PathBuf, StorageError> {
    let session = self.transport.open()?;
    let located = self.locate(&session, handle, version)?;
    let target = resolve_local_path(local_path, &located.filename)?;

    write_atomically(&target, |file| session.download(&located.remote_file, file))?;

    info!(version = located.version, target = %target.display(), "pulled");
    Ok(target)
  }

  fn version_numbers(&self, handle: &str) -> Result<Vec<u64>, StorageError> {
    let session = self.transport.open()?;
    self.versions_for(&session, handle)
  }

  fn versions_data(&self, handle: &str) -> Result<Vec<VersionRecord>, StorageError> {
    let session = self.transport.open()?;
    let dir = handle_dir(self.base(), handle)?;
    let public_base = self.store.public_base_url();

    let mut records = Vec::new();
    for version in self.versions_for(&session, handle)?.into_iter().rev() {
      let version_dir = join(&dir, &version.to_string());
      let filename = self.first_file(&session, &version_dir)?;

      records.push(VersionRecord {
        version,
        datetime: self.mtime(&session, &version_dir)?,
        path: match &filename {
          Some(name) => join(&version_dir, name),
          None => version_dir.clone(),
        },
        handle: handle.to_string(),
        url: filename
          .as_deref()
          .and_then(|name| public_url(public_base, handle, version, name)),
        filename,
        size: self.disk_usage(&session, &version_dir)?,
      });
    }
    Ok(records)
  }

  #[instrument(skip_all, fields(store = %self.store.name, handle = %handle))]
  fn delete(&self, handle: &str, version: Option<u64>) -> Result<(), StorageError> {
    let dir = handle_dir(self.base(), handle)?;
    let session = self.transport.open()?;

    match version {
      Some(version) => {
        session.exec(&RemoteCommand::remove_all(&join(&dir, &version.to_string())))?;
        if self.versions_for(&session, handle)?.is_empty() {
          session.exec(&RemoteCommand::remove_empty_dir(&dir))?;
        }
        info!(version, "deleted version");
      }
      None => {
        session.exec(&RemoteCommand::remove_all(&dir))?;
        info!("deleted handle");
      }
    }
    Ok(())
  }
}
