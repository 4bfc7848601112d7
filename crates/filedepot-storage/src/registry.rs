use std::collections::BTreeMap;

use filedepot_config::StoreDescriptor;

use crate::contract::Storage;
use crate::error::StorageError;
use crate::local::LocalFilesystemStorage;
use crate::remote::RemoteShellStorage;

/// Builds a backend from a store descriptor.
pub type Constructor = fn(&StoreDescriptor) -> Result<Box<dyn Storage>, StorageError>;

/// Maps store type tags to backend constructors.
///
/// The default registry knows `"ssh"` ([`RemoteShellStorage`]) and
/// `"local"` ([`LocalFilesystemStorage`]).
pub struct BackendRegistry {
  constructors: BTreeMap<String, Constructor>,
}

impl BackendRegistry {
  /// A registry with no backends.
  pub fn empty() -> Self {
    Self {
      constructors: BTreeMap::new(),
    }
  }

  /// Register (or replace) the constructor for `store_type`.
  pub fn register(&mut self, store_type: impl Into<String>, constructor: Constructor) {
    self.constructors.insert(store_type.into(), constructor);
  }

  /// Registered type tags, sorted.
  pub fn store_types(&self) -> impl Iterator<Item = &str> {
    self.constructors.keys().map(String::as_str)
  }

  /// Build the backend for `store`.
  pub fn open(&self, store: &StoreDescriptor) -> Result<Box<dyn Storage>, StorageError> {
    let constructor = self.constructors.get(&store.store_type).ok_or_else(|| {
      StorageError::UnknownStoreType {
        store: store.name.clone(),
        store_type: store.store_type.clone(),
      }
    })?;
    constructor(store)
  }
}

impl Default for BackendRegistry {
  fn default() -> Self {
    let mut registry = Self::empty();
    registry.register("ssh", |store| {
      Ok(Box::new(RemoteShellStorage::new(store.clone())))
    });
    registry.register("local", |store| {
      Ok(Box::new(LocalFilesystemStorage::new(store.clone())))
    });
    registry
  }
}

/// Build the backend for `store` from the default registry.
pub fn open(store: &StoreDescriptor) -> Result<Box<dyn Storage>, StorageError> {
  BackendRegistry::default().open(store)
}
