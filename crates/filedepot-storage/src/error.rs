//! Storage error types.

use thiserror::Error;

/// The broad class of a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A handle, version, version file, or local source file does not exist.
  NotFound,
  /// A store descriptor cannot be turned into a backend.
  Configuration,
  /// The remote session failed, or a command/transfer failed on it.
  Transport,
  /// A local filesystem operation failed.
  Io,
  /// The handle cannot be used as a path under the base path.
  InvalidHandle,
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
  /// The handle has no versions.
  #[error("no versions found for handle '{handle}'")]
  HandleNotFound { handle: String },

  /// The requested version does not exist for the handle.
  #[error("version {version} not found for handle '{handle}'")]
  VersionNotFound { handle: String, version: u64 },

  /// The version directory holds no file.
  #[error("no file found in version {version} for handle '{handle}'")]
  EmptyVersion { handle: String, version: u64 },

  /// The handle sanitizes to nothing, or to a path leaving the base path.
  #[error("invalid handle '{handle}'")]
  InvalidHandle { handle: String },

  /// The local file to push does not exist or is not a regular file.
  #[error("file not found: {path}")]
  FileNotFound { path: String },

  /// The store descriptor names a backend type nobody registered.
  #[error("unknown storage type '{store_type}' for store '{store}'")]
  UnknownStoreType { store: String, store_type: String },

  /// The remote session or a command on it failed.
  #[error("transport error: {message}")]
  Transport { message: String },

  /// A local I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl StorageError {
  /// Create a transport error.
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport {
      message: message.into(),
    }
  }

  /// Which class of failure this is.
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::HandleNotFound { .. }
      | Self::VersionNotFound { .. }
      | Self::EmptyVersion { .. }
      | Self::FileNotFound { .. } => ErrorKind::NotFound,
      Self::InvalidHandle { .. } => ErrorKind::InvalidHandle,
      Self::UnknownStoreType { .. } => ErrorKind::Configuration,
      Self::Transport { .. } => ErrorKind::Transport,
      Self::Io(_) => ErrorKind::Io,
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.kind() == ErrorKind::NotFound
  }
}
