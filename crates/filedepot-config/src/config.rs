use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::{StoreDescriptor, store_types};

/// Directory under the home directory holding the config file.
pub const CONFIG_DIR_NAME: &str = ".filedepot";

/// Name of the config file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// The configuration document: a list of stores and the one used by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default, alias = "default_source")]
  pub default_store: Option<String>,
  #[serde(default, alias = "sources")]
  pub stores: Vec<StoreDescriptor>,
}

/// The user's home directory.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
  dirs::home_dir().ok_or(ConfigError::NoHomeDir)
}

/// `$HOME/.filedepot/config.yml`.
pub fn default_config_path(home: &Path) -> PathBuf {
  home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

impl Config {
  /// Whether a config file exists at `path`.
  pub fn exists(path: &Path) -> bool {
    path.is_file()
  }

  /// Load the config at `path`. A missing file yields `None`.
  pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
    if !Self::exists(path) {
      return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    Self::parse(&content, path).map(Some)
  }

  /// Write the default config to `path` unless a file is already there.
  ///
  /// The default document holds the `ssh` template store, rooted at
  /// `{home}/filedepot`.
  pub fn ensure(path: &Path, home: &Path) -> Result<(), ConfigError> {
    if Self::exists(path) {
      return Ok(());
    }

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }

    let mut store = store_types(home, None).remove(0).1;
    store.username = None;

    let config = Config {
      default_store: Some(store.name.clone()),
      stores: vec![store],
    };
    let content = serde_yaml::to_string(&config).map_err(ConfigError::Serialize)?;
    fs::write(path, content).map_err(|e| ConfigError::io(path, e))
  }

  /// Ensure the file exists, then load it.
  pub fn load_or_init(path: &Path, home: &Path) -> Result<Self, ConfigError> {
    Self::ensure(path, home)?;
    Ok(Self::load(path)?.unwrap_or_default())
  }

  fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
    // An empty document is a config with no stores.
    if content.trim().is_empty() {
      return Ok(Self::default());
    }

    serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Look up a store by name.
  pub fn store(&self, name: &str) -> Option<&StoreDescriptor> {
    self.stores.iter().find(|s| s.name == name)
  }

  /// The store named by `default_store`, else the first store.
  pub fn current_store(&self) -> Option<&StoreDescriptor> {
    self
      .default_store
      .as_deref()
      .and_then(|name| self.store(name))
      .or_else(|| self.stores.first())
  }
}
