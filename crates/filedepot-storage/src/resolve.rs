//! Path and version resolution.
//!
//! Pure functions shared by every backend: handle sanitization, path
//! composition under a store's base path, version listing parsing, version
//! selection and local destination resolution.
//!
//! Store-side paths are `/`-separated strings (they may name a remote host's
//! filesystem); local destinations are [`PathBuf`]s.

use std::collections::BTreeSet;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use crate::error::StorageError;

/// Replace every character outside `[A-Za-z0-9_.\-/]` with `_`.
pub fn sanitize_handle(handle: &str) -> String {
  handle
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/') {
        c
      } else {
        '_'
      }
    })
    .collect()
}

/// Join a store-side path and a relative segment with exactly one `/`.
///
/// A leading `/` on the segment does not make it absolute: `("/base", "/etc")`
/// yields `/base/etc`.
pub fn join(base: &str, segment: &str) -> String {
  let segment = segment.trim_start_matches('/');
  if base.is_empty() {
    return segment.to_string();
  }
  if segment.is_empty() {
    return base.to_string();
  }
  format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// The sanitized handle as a relative path segment under a base path.
///
/// Rejects handles that would name the base path itself or step outside it:
/// empty after sanitization, or containing a `.` or `..` segment.
pub fn handle_segment(handle: &str) -> Result<String, StorageError> {
  let sanitized = sanitize_handle(handle);
  let segment = sanitized.trim_matches('/');
  let escapes = segment
    .split('/')
    .any(|part| part == "." || part == "..");

  if segment.is_empty() || escapes {
    return Err(StorageError::InvalidHandle {
      handle: handle.to_string(),
    });
  }
  Ok(segment.to_string())
}

/// Validated `{base}/{sanitized handle}`.
pub fn handle_dir(base: &str, handle: &str) -> Result<String, StorageError> {
  Ok(join(base, &handle_segment(handle)?))
}

/// Validated `{base}/{sanitized handle}/{version}`.
pub fn version_dir(base: &str, handle: &str, version: u64) -> Result<String, StorageError> {
  Ok(join(&handle_dir(base, handle)?, &version.to_string()))
}

/// Check a local file for pushing: it must be a regular file. Returns its
/// absolute path and basename.
pub fn push_source(local_path: &Path) -> Result<(PathBuf, String), StorageError> {
  let path = std::path::absolute(local_path)?;
  let not_found = || StorageError::FileNotFound {
    path: path.display().to_string(),
  };

  if !path.is_file() {
    return Err(not_found());
  }
  let filename = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .ok_or_else(not_found)?;
  Ok((path, filename))
}

/// Parse one directory entry name as a version number.
///
/// Only canonical decimal names of strictly positive integers count; anything
/// else in a handle directory is a stray entry.
pub fn parse_version(name: &str) -> Option<u64> {
  let name = name.trim();
  let version: u64 = name.parse().ok()?;
  (version > 0 && version.to_string() == name).then_some(version)
}

/// Collect the version numbers among directory entry names, ascending.
pub fn parse_version_names<I, S>(names: I) -> Vec<u64>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  names
    .into_iter()
    .filter_map(|n| parse_version(n.as_ref()))
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Parse the output of a one-entry-per-line directory listing into version
/// numbers, ascending.
pub fn parse_versions(listing: &str) -> Vec<u64> {
  parse_version_names(listing.lines().map(str::trim).filter(|l| !l.is_empty()))
}

/// The lexicographically first non-empty entry of a listing.
pub fn first_entry<I, S>(names: I) -> Option<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  names
    .into_iter()
    .map(|n| n.as_ref().trim().to_string())
    .filter(|n| !n.is_empty())
    .min()
}

/// Pick the version to fetch: the requested one if it exists, else the
/// highest.
pub fn select_version(
  handle: &str,
  available: &[u64],
  requested: Option<u64>,
) -> Result<u64, StorageError> {
  let latest = available
    .iter()
    .copied()
    .max()
    .ok_or_else(|| StorageError::HandleNotFound {
      handle: handle.to_string(),
    })?;

  match requested {
    None => Ok(latest),
    Some(v) if available.contains(&v) => Ok(v),
    Some(v) => Err(StorageError::VersionNotFound {
      handle: handle.to_string(),
      version: v,
    }),
  }
}

/// Replace a leading `~` or `~/` with `home`.
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
  match (path.strip_prefix('~'), home) {
    (Some(""), Some(home)) => home.to_path_buf(),
    (Some(rest), Some(home)) if rest.starts_with(['/', MAIN_SEPARATOR]) => {
      home.join(rest.trim_start_matches(['/', MAIN_SEPARATOR]))
    }
    _ => PathBuf::from(path),
  }
}

/// Expand `~` against `home`, anchor relative paths at `cwd`, and remove `.`
/// and `..` components lexically.
pub fn expand_path(path: &str, cwd: &Path, home: Option<&Path>) -> PathBuf {
  let expanded = expand_home(path, home);
  if expanded.is_absolute() {
    normalize(&expanded)
  } else {
    normalize(&cwd.join(expanded))
  }
}

fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !out.pop() {
          out.push(component);
        }
      }
      other => out.push(other),
    }
  }
  out
}

/// Resolve where a pulled file lands, relative to an explicit working
/// directory and home directory.
///
/// 1. No hint, or an empty one: `{cwd}/{remote_filename}`.
/// 2. A hint ending in a separator, or naming an existing directory:
///    `{expanded hint}/{remote_filename}`.
/// 3. Anything else names the destination file itself.
pub fn resolve_local_path_in(
  hint: Option<&str>,
  remote_filename: &str,
  cwd: &Path,
  home: Option<&Path>,
) -> PathBuf {
  let hint = match hint {
    Some(h) if !h.is_empty() => h,
    _ => return cwd.join(remote_filename),
  };

  let expanded = expand_path(hint, cwd, home);
  if hint.ends_with('/') || hint.ends_with(MAIN_SEPARATOR) || expanded.is_dir() {
    expanded.join(remote_filename)
  } else {
    expanded
  }
}

/// [`resolve_local_path_in`] against the process working directory and the
/// user's home directory.
pub fn resolve_local_path(
  hint: Option<&str>,
  remote_filename: &str,
) -> Result<PathBuf, StorageError> {
  let cwd = std::env::current_dir()?;
  let home = dirs::home_dir();
  Ok(resolve_local_path_in(
    hint,
    remote_filename,
    &cwd,
    home.as_deref(),
  ))
}
