use std::path::Path;

use serde::{Deserialize, Serialize};

/// Base path used when a store does not configure one.
pub const DEFAULT_BASE_PATH: &str = "/tmp/filedepot";

/// Host used when a remote store does not configure one.
pub const DEFAULT_HOST: &str = "localhost";

/// A configured store: which backend to use and how to reach it.
///
/// Descriptors are immutable once loaded. The `store_type` tag selects the
/// backend (`"ssh"` or `"local"`); unknown tags are rejected by the storage
/// engine, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDescriptor {
  pub name: String,
  #[serde(rename = "type")]
  pub store_type: String,
  #[serde(default)]
  pub host: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub port: Option<u16>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub base_path: Option<String>,
  #[serde(default, alias = "public_base_path")]
  pub public_base_url: Option<String>,
}

impl StoreDescriptor {
  /// A descriptor for the local filesystem backend rooted at `base_path`.
  pub fn local(name: impl Into<String>, base_path: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      store_type: "local".to_string(),
      host: None,
      port: None,
      username: None,
      base_path: Some(base_path.into()),
      public_base_url: None,
    }
  }

  /// A descriptor for the remote shell backend.
  pub fn ssh(
    name: impl Into<String>,
    host: impl Into<String>,
    base_path: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      store_type: "ssh".to_string(),
      host: Some(host.into()),
      port: None,
      username: None,
      base_path: Some(base_path.into()),
      public_base_url: None,
    }
  }

  /// Set the public base URL under which stored versions are served.
  pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
    self.public_base_url = Some(url.into());
    self
  }

  /// Fill in the username when none is configured.
  pub fn with_default_username(mut self, fallback: Option<String>) -> Self {
    if self.username().is_none() {
      self.username = fallback.filter(|u| !u.trim().is_empty());
    }
    self
  }

  /// The store's base path, falling back to [`DEFAULT_BASE_PATH`].
  pub fn base_path(&self) -> &str {
    match self.base_path.as_deref() {
      Some(p) if !p.is_empty() => p,
      _ => DEFAULT_BASE_PATH,
    }
  }

  /// The remote host, falling back to [`DEFAULT_HOST`].
  pub fn host(&self) -> &str {
    match self.host.as_deref().map(str::trim) {
      Some(h) if !h.is_empty() => h,
      _ => DEFAULT_HOST,
    }
  }

  /// The configured username; blank values count as absent.
  pub fn username(&self) -> Option<&str> {
    self
      .username
      .as_deref()
      .map(str::trim)
      .filter(|u| !u.is_empty())
  }

  /// The configured public base URL; blank values count as absent.
  pub fn public_base_url(&self) -> Option<&str> {
    self
      .public_base_url
      .as_deref()
      .map(str::trim)
      .filter(|u| !u.is_empty())
  }
}

/// Template descriptors for every supported store type, in display order.
///
/// `home` seeds the default base path (`{home}/filedepot`) and `user` the
/// username; `"username"` stands in when no user is known.
pub fn store_types(home: &Path, user: Option<&str>) -> Vec<(&'static str, StoreDescriptor)> {
  let base_path = home.join("filedepot").to_string_lossy().into_owned();
  let username = user
    .filter(|u| !u.is_empty())
    .unwrap_or("username")
    .to_string();

  let ssh = StoreDescriptor {
    username: Some(username),
    ..StoreDescriptor::ssh("test", "127.0.0.1", base_path.clone())
  };
  let local = StoreDescriptor::local("local", base_path);

  vec![("ssh", ssh), ("local", local)]
}
