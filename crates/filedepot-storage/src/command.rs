//! Remote shell command construction.
//!
//! Every value interpolated into a [`RemoteCommand`] goes through
//! [`quote`]. Only `&'static str` literals are appended verbatim, so a
//! caller-controlled string cannot reach the remote shell unescaped.

use std::fmt;

/// Quote `value` as a single POSIX shell word.
///
/// The value is wrapped in single quotes, with embedded `'` written as
/// `'\''`. A leading `~/` is left outside the quotes so the remote shell
/// still expands it to the remote user's home directory.
pub fn quote(value: &str) -> String {
  if value == "~" {
    return "~".to_string();
  }
  if let Some(rest) = value.strip_prefix("~/") {
    return if rest.is_empty() {
      "~/".to_string()
    } else {
      format!("~/{}", quote_word(rest))
    };
  }
  quote_word(value)
}

fn quote_word(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('\'');
  for c in value.chars() {
    if c == '\'' {
      out.push_str("'\\''");
    } else {
      out.push(c);
    }
  }
  out.push('\'');
  out
}

/// A shell script to run on the far side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
  script: String,
}

impl RemoteCommand {
  /// Start a command with a fixed program name.
  pub fn new(program: &'static str) -> Self {
    Self {
      script: program.to_string(),
    }
  }

  /// Append a fixed flag or literal word.
  pub fn flag(mut self, flag: &'static str) -> Self {
    self.script.push(' ');
    self.script.push_str(flag);
    self
  }

  /// Append a path, quoted.
  pub fn path(mut self, path: &str) -> Self {
    self.script.push(' ');
    self.script.push_str(&quote(path));
    self
  }

  /// Discard stderr.
  pub fn quiet(mut self) -> Self {
    self.script.push_str(" 2>/dev/null");
    self
  }

  /// Send stdout to a file at `path`, quoted.
  pub fn write_to(mut self, path: &str) -> Self {
    self.script.push_str(" > ");
    self.script.push_str(&quote(path));
    self
  }

  /// Run `other` when this command fails.
  pub fn or(mut self, other: RemoteCommand) -> Self {
    self.script.push_str(" || ");
    self.script.push_str(&other.script);
    self
  }

  /// Never fail.
  pub fn or_true(self) -> Self {
    self.or(RemoteCommand::new("true"))
  }

  pub fn as_str(&self) -> &str {
    &self.script
  }

  /// `ls -1 <dir>`, empty output when the directory is missing.
  pub fn list(dir: &str) -> Self {
    Self::new("ls").flag("-1").path(dir).quiet().or_true()
  }

  /// `ls -1p <dir>`: like [`list`](Self::list), directories marked with `/`.
  pub fn list_marked(dir: &str) -> Self {
    Self::new("ls").flag("-1p").path(dir).quiet().or_true()
  }

  /// `mkdir -p <dir>`.
  pub fn mkdir(dir: &str) -> Self {
    Self::new("mkdir").flag("-p").path(dir)
  }

  /// `rm -rf <path>`.
  pub fn remove_all(path: &str) -> Self {
    Self::new("rm").flag("-rf").path(path)
  }

  /// `rmdir <dir>`, ignoring failure (missing or not empty).
  pub fn remove_empty_dir(dir: &str) -> Self {
    Self::new("rmdir").path(dir).quiet().or_true()
  }

  /// Modification time in epoch seconds: GNU `stat -c %Y`, then BSD
  /// `stat -f %m`. Empty output when neither works.
  pub fn mtime(path: &str) -> Self {
    Self::new("stat")
      .flag("-c")
      .flag("%Y")
      .path(path)
      .quiet()
      .or(Self::new("stat").flag("-f").flag("%m").path(path).quiet())
      .or_true()
  }

  /// Disk usage in KiB (`du -sk`). Empty output on failure.
  pub fn disk_usage(path: &str) -> Self {
    Self::new("du").flag("-sk").path(path).quiet().or_true()
  }

  /// `cat <path>`: stream a file to stdout.
  pub fn read(path: &str) -> Self {
    Self::new("cat").path(path)
  }

  /// `cat > <path>`: write stdin to a file.
  pub fn write(path: &str) -> Self {
    Self::new("cat").write_to(path)
  }
}

impl fmt::Display for RemoteCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.script)
  }
}
