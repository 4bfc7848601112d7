//! Filedepot Storage
//!
//! This crate provides the versioned storage engine for filedepot. Files are
//! stored under caller-chosen handles; every push creates a new numbered
//! version and any version can be pulled back later.
//!
//! The [`Storage`] trait is the contract every backend implements:
//! - [`RemoteShellStorage`] drives a remote host through shell commands over
//!   one session per operation (OpenSSH by default).
//! - [`LocalFilesystemStorage`] works directly on a local directory.
//!
//! Both lay data out as `{base_path}/{handle}/{version}/{filename}`. Operations
//! that only combine contract calls ([`current_version`], [`info`], [`url`],
//! ...) are free functions written once for every backend. A
//! [`BackendRegistry`] turns a [`StoreDescriptor`]'s type tag into a backend.
//!
//! All operations are synchronous and blocking.

mod atomic;
mod command;
mod contract;
mod error;
mod local;
mod record;
mod registry;
mod remote;
pub mod resolve;
mod size;
mod transport;

pub use command::{RemoteCommand, quote};
pub use contract::{
  Storage, current_version, info, next_version, next_version_path, public_url, url, versions,
};
pub use error::{ErrorKind, StorageError};
pub use filedepot_config::StoreDescriptor;
pub use local::LocalFilesystemStorage;
pub use record::{HandleInfo, HandleSummary, PullInfo, VersionRecord, VersionRow};
pub use registry::{BackendRegistry, Constructor, open};
pub use remote::RemoteShellStorage;
pub use size::format_size;
pub use transport::{LocalShell, Session, SshSession, SshTransport, Transport};
