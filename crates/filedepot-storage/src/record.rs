use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::size::format_size;

/// One stored version of a handle, as found by a listing.
///
/// Records are derived on every listing and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
  pub version: u64,
  /// Modification time of the version's file (or directory).
  pub datetime: Option<DateTime<Utc>>,
  /// Store-side path of the version's file, or of its directory when empty.
  pub path: String,
  pub handle: String,
  pub filename: Option<String>,
  /// Public URL of the file, when the store has a public base URL.
  pub url: Option<String>,
  /// Size of the version directory in bytes.
  pub size: Option<u64>,
}

/// A display projection of a [`VersionRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRow {
  pub version: u64,
  /// Local time as `YYYY-MM-DD HH:MM:SS +ZZZZ`; empty when unknown.
  pub datetime: String,
  /// Human-readable size; empty when unknown.
  pub size: String,
}

impl From<&VersionRecord> for VersionRow {
  fn from(record: &VersionRecord) -> Self {
    Self {
      version: record.version,
      datetime: record
        .datetime
        .map(|dt| {
          dt.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %z")
            .to_string()
        })
        .unwrap_or_default(),
      size: record.size.map(format_size).unwrap_or_default(),
    }
  }
}

/// Where a pull will come from and land, resolved without transferring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullInfo {
  pub remote_filename: String,
  pub version: u64,
  pub target_path: PathBuf,
}

/// Summary of a handle: where it lives and its latest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleInfo {
  pub handle: String,
  pub remote_base_path: String,
  pub current_version: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub latest_version_url: Option<String>,
}

/// One handle directory found under a store's base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleSummary {
  pub handle: String,
  pub versions_count: usize,
  /// Size of the handle directory in bytes.
  pub size: Option<u64>,
}
