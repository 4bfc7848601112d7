//! Remote sessions.
//!
//! A [`Transport`] opens a [`Session`]; a session runs shell scripts on the
//! far side and moves files over the same channel. Sessions are opened per
//! high-level operation and released when dropped.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use filedepot_config::StoreDescriptor;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::command::RemoteCommand;
use crate::error::StorageError;

/// Opens sessions against a store's host.
pub trait Transport {
  type Session: Session;

  fn open(&self) -> Result<Self::Session, StorageError>;
}

/// An open channel for running commands and transferring files.
pub trait Session {
  /// A process that runs `script` through the far side's shell.
  fn command(&self, script: &str) -> Command;

  /// Run a command and return its stdout. A non-zero exit is a transport
  /// error carrying stderr.
  fn exec(&self, command: &RemoteCommand) -> Result<String, StorageError> {
    debug!(command = %command, "exec");
    let output = self
      .command(command.as_str())
      .stdin(Stdio::null())
      .output()
      .map_err(|e| spawn_error(command, e))?;

    check_status(command, output.status, &output.stderr)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Copy a local file to `remote`, streaming it through the channel.
  fn upload(&self, local: &Path, remote: &str) -> Result<(), StorageError> {
    let command = RemoteCommand::write(remote);
    debug!(command = %command, local = %local.display(), "upload");

    let source = File::open(local)?;
    let output = self
      .command(command.as_str())
      .stdin(Stdio::from(source))
      .stdout(Stdio::null())
      .stderr(Stdio::piped())
      .output()
      .map_err(|e| spawn_error(&command, e))?;

    check_status(&command, output.status, &output.stderr)
  }

  /// Copy `remote` into an open local file.
  fn download(&self, remote: &str, dest: &File) -> Result<(), StorageError> {
    let command = RemoteCommand::read(remote);
    debug!(command = %command, "download");

    let output = self
      .command(command.as_str())
      .stdin(Stdio::null())
      .stdout(Stdio::from(dest.try_clone()?))
      .stderr(Stdio::piped())
      .output()
      .map_err(|e| spawn_error(&command, e))?;

    check_status(&command, output.status, &output.stderr)
  }
}

fn spawn_error(command: &RemoteCommand, e: std::io::Error) -> StorageError {
  StorageError::transport(format!("failed to start `{}`: {}", command, e))
}

fn check_status(
  command: &RemoteCommand,
  status: ExitStatus,
  stderr: &[u8],
) -> Result<(), StorageError> {
  if status.success() {
    return Ok(());
  }

  let stderr = String::from_utf8_lossy(stderr);
  Err(StorageError::transport(format!(
    "`{}` failed ({}): {}",
    command,
    status,
    stderr.trim()
  )))
}

/// OpenSSH transport.
///
/// Each session is a control-master connection: `ssh -M -f -N` brings it
/// up once, every command reuses it through the control socket, and
/// dropping the session sends `-O exit`.
#[derive(Debug, Clone)]
pub struct SshTransport {
  host: String,
  port: Option<u16>,
  username: Option<String>,
}

impl SshTransport {
  pub fn from_descriptor(store: &StoreDescriptor) -> Self {
    Self {
      host: store.host().to_string(),
      port: store.port,
      username: store.username().map(str::to_string),
    }
  }

  fn base_command(&self) -> Command {
    let mut cmd = Command::new("ssh");
    cmd.arg("-o").arg("BatchMode=yes");
    if let Some(port) = self.port {
      cmd.arg("-p").arg(port.to_string());
    }
    if let Some(user) = &self.username {
      cmd.arg("-l").arg(user);
    }
    cmd
  }
}

impl Transport for SshTransport {
  type Session = SshSession;

  fn open(&self) -> Result<SshSession, StorageError> {
    let control_dir = tempfile::Builder::new().prefix("filedepot-").tempdir()?;
    let socket = control_dir.path().join("ctl");

    // The master forks into the background and keeps any inherited pipe
    // open, so stderr goes to a file rather than a pipe.
    let mut stderr = tempfile::tempfile()?;
    let status = self
      .base_command()
      .arg("-M")
      .arg("-S")
      .arg(&socket)
      .arg("-f")
      .arg("-N")
      .arg("--")
      .arg(&self.host)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::from(stderr.try_clone()?))
      .status()
      .map_err(|e| StorageError::transport(format!("failed to start ssh: {}", e)))?;

    if !status.success() {
      let mut message = String::new();
      stderr.seek(SeekFrom::Start(0))?;
      stderr.read_to_string(&mut message)?;
      return Err(StorageError::transport(format!(
        "failed to connect to {}: {}",
        self.host,
        message.trim()
      )));
    }

    debug!(host = %self.host, "ssh session opened");
    Ok(SshSession {
      transport: self.clone(),
      socket,
      _control_dir: control_dir,
    })
  }
}

/// An open control-master connection.
pub struct SshSession {
  transport: SshTransport,
  socket: PathBuf,
  _control_dir: TempDir,
}

impl Session for SshSession {
  fn command(&self, script: &str) -> Command {
    let mut cmd = self.transport.base_command();
    cmd
      .arg("-S")
      .arg(&self.socket)
      .arg("--")
      .arg(&self.transport.host)
      .arg(script);
    cmd
  }
}

impl Drop for SshSession {
  fn drop(&mut self) {
    let result = self
      .transport
      .base_command()
      .arg("-S")
      .arg(&self.socket)
      .arg("-O")
      .arg("exit")
      .arg("--")
      .arg(&self.transport.host)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status();

    match result {
      Ok(status) if status.success() => {
        debug!(host = %self.transport.host, "ssh session closed");
      }
      Ok(status) => warn!(host = %self.transport.host, %status, "failed to close ssh session"),
      Err(e) => warn!(host = %self.transport.host, error = %e, "failed to close ssh session"),
    }
  }
}

/// Runs remote scripts through the local `sh`.
///
/// Lets the remote backend operate on the local filesystem, with the same
/// commands it would send over ssh.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalShell;

impl Transport for LocalShell {
  type Session = LocalShell;

  fn open(&self) -> Result<LocalShell, StorageError> {
    Ok(LocalShell)
  }
}

impl Session for LocalShell {
  fn command(&self, script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
  }
}
