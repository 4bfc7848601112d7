//! Filedepot Config
//!
//! This crate contains the store descriptors and the configuration document
//! for filedepot. A store descriptor names a storage backend (by type tag) and
//! its connection parameters; the storage engine consumes descriptors but never
//! reads or writes configuration files itself.
//!
//! Configuration is loaded from a YAML file, `$HOME/.filedepot/config.yml` by
//! default. Every entry point takes the path explicitly.

mod config;
mod error;
mod store;

pub use config::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, Config, default_config_path, home_dir};
pub use error::ConfigError;
pub use store::{DEFAULT_BASE_PATH, DEFAULT_HOST, StoreDescriptor, store_types};
