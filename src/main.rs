use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use filedepot_config::{Config, StoreDescriptor, default_config_path, home_dir};
use filedepot_storage::{Storage, info, versions};

/// Rows shown by `versions` before the remainder is summarized.
const VERSIONS_SHOWN: usize = 10;

/// Filedepot - versioned file storage on a remote host or a local directory
#[derive(Parser)]
#[command(name = "filedepot")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: ~/.filedepot/config.yml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Store to use instead of the configured default
  #[arg(long, global = true)]
  store: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Open the config file in $EDITOR, creating it first if needed
  Config,

  /// Store a file as the next version of a handle
  Push {
    handle: String,

    /// The local file to store
    file: PathBuf,
  },

  /// Fetch a version of a handle
  Pull {
    handle: String,

    /// Destination file, or directory when it ends with `/`
    #[arg(long)]
    path: Option<String>,

    /// Version to fetch (default: latest)
    #[arg(long)]
    version: Option<u64>,

    /// Create directories and overwrite files without asking
    #[arg(long, short)]
    yes: bool,
  },

  /// List the versions of a handle, newest first
  Versions { handle: String },

  /// Delete one version of a handle, or the whole handle
  Delete {
    handle: String,

    /// Version to delete (default: every version)
    version: Option<u64>,

    /// Do not ask for confirmation
    #[arg(long, short)]
    yes: bool,
  },

  /// Show a handle's current version as JSON
  Info { handle: String },

  /// List the handles in the store as JSON
  Ls,

  /// Check that the store is reachable
  Test,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    )
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  let cli = Cli::parse();

  let home = home_dir()?;
  let config_path = cli
    .config
    .unwrap_or_else(|| default_config_path(&home));

  match cli.command {
    Some(Commands::Config) => edit_config(&config_path, &home),
    Some(command) => {
      let store = select_store(&config_path, &home, cli.store.as_deref())?;
      tracing::debug!(config = %config_path.display(), store = %store.name, "using store");

      let storage = filedepot_storage::open(&store)
        .with_context(|| format!("failed to open store '{}'", store.name))?;
      run(command, storage.as_ref())
    }
    None => show_overview(&config_path, cli.store.as_deref()),
  }
}

fn run(command: Commands, storage: &dyn Storage) -> Result<()> {
  match command {
    Commands::Push { handle, file } => {
      let version = storage
        .push(&handle, &file)
        .with_context(|| format!("failed to push {}", file.display()))?;
      println!("Pushed {} as {} (version {})", file.display(), handle, version);
    }
    Commands::Pull {
      handle,
      path,
      version,
      yes,
    } => pull(storage, &handle, path.as_deref(), version, yes)?,
    Commands::Versions { handle } => print_versions(storage, &handle)?,
    Commands::Delete {
      handle,
      version,
      yes,
    } => {
      let question = match version {
        Some(v) => format!("Delete version {} of {}?", v, handle),
        None => format!("Delete {} and all of its versions?", handle),
      };
      if !yes && !confirm(&question)? {
        println!("Aborted");
        return Ok(());
      }

      storage
        .delete(&handle, version)
        .with_context(|| format!("failed to delete {}", handle))?;
      match version {
        Some(v) => println!("Deleted version {} of {}", v, handle),
        None => println!("Deleted {}", handle),
      }
    }
    Commands::Info { handle } => {
      let info = info(storage, &handle)
        .with_context(|| format!("failed to read versions of {}", handle))?;
      println!("{}", serde_json::to_string_pretty(&info)?);
    }
    Commands::Ls => {
      let handles = storage.ls().context("failed to list handles")?;
      println!("{}", serde_json::to_string_pretty(&handles)?);
    }
    Commands::Test => {
      let name = &storage.descriptor().name;
      storage
        .test()
        .with_context(|| format!("store '{}' is not reachable", name))?;
      println!("Store '{}' is reachable", name);
    }
    Commands::Config => bail!("`config` does not operate on a store"),
  }

  Ok(())
}

fn pull(
  storage: &dyn Storage,
  handle: &str,
  path: Option<&str>,
  version: Option<u64>,
  yes: bool,
) -> Result<()> {
  let plan = storage
    .pull_info(handle, version, path)
    .with_context(|| format!("failed to pull {}", handle))?;
  let target = &plan.target_path;

  if let Some(parent) = target.parent() {
    if !parent.exists() {
      let question = format!("Directory {} does not exist. Create it?", parent.display());
      if !yes && !confirm(&question)? {
        println!("Aborted");
        return Ok(());
      }
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
  }

  if target.exists() && !yes {
    let question = format!("{} already exists. Overwrite?", target.display());
    if !confirm(&question)? {
      println!("Aborted");
      return Ok(());
    }
  }

  let pulled = storage
    .pull(handle, Some(plan.version), Some(&target.to_string_lossy()))
    .with_context(|| format!("failed to pull {}", handle))?;
  println!(
    "Pulled {} (version {}) to {}",
    handle,
    plan.version,
    pulled.display()
  );
  Ok(())
}

fn print_versions(storage: &dyn Storage, handle: &str) -> Result<()> {
  let rows = versions(storage, handle)
    .with_context(|| format!("failed to read versions of {}", handle))?;
  if rows.is_empty() {
    println!("No versions found for {}", handle);
    return Ok(());
  }

  println!("{:>7}  {:<25}  {:>6}", "VERSION", "DATE", "SIZE");
  for row in rows.iter().take(VERSIONS_SHOWN) {
    println!("{:>7}  {:<25}  {:>6}", row.version, row.datetime, row.size);
  }
  if rows.len() > VERSIONS_SHOWN {
    println!(
      "... and {} other ones for a total of {} versions",
      rows.len() - VERSIONS_SHOWN,
      rows.len()
    );
  }
  Ok(())
}

/// The store named on the command line, else the config's current store.
fn select_store(config_path: &Path, home: &Path, name: Option<&str>) -> Result<StoreDescriptor> {
  let config = Config::load_or_init(config_path, home)
    .with_context(|| format!("failed to load config {}", config_path.display()))?;

  let store = match name {
    Some(name) => config
      .store(name)
      .with_context(|| format!("no store named '{}' in {}", name, config_path.display()))?,
    None => config
      .current_store()
      .with_context(|| format!("no store configured in {}", config_path.display()))?,
  };

  Ok(
    store
      .clone()
      .with_default_username(std::env::var("USER").ok()),
  )
}

fn show_overview(config_path: &Path, name: Option<&str>) -> Result<()> {
  let config = Config::load(config_path)
    .with_context(|| format!("failed to load config {}", config_path.display()))?;

  match config {
    None => println!(
      "No config at {}; run `filedepot config` to create one.",
      config_path.display()
    ),
    Some(config) => {
      let store = match name {
        Some(name) => config.store(name),
        None => config.current_store(),
      };
      match store {
        Some(store) => {
          println!("Current store: {} ({})", store.name, store.store_type);
          if store.store_type == "ssh" {
            println!("  host: {}", store.host());
          }
          println!("  base path: {}", store.base_path());
        }
        None => println!("No store configured in {}", config_path.display()),
      }
    }
  }

  println!();
  Cli::command().print_help()?;
  Ok(())
}

fn edit_config(config_path: &Path, home: &Path) -> Result<()> {
  Config::ensure(config_path, home)
    .with_context(|| format!("failed to create config {}", config_path.display()))?;

  let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
  let mut words = editor.split_whitespace();
  let Some(program) = words.next() else {
    bail!("EDITOR is empty");
  };

  let status = Command::new(program)
    .args(words)
    .arg(config_path)
    .status()
    .with_context(|| format!("failed to start editor '{}'", editor))?;
  if !status.success() {
    bail!("editor '{}' exited with {}", editor, status);
  }
  Ok(())
}

fn confirm(question: &str) -> Result<bool> {
  print!("{} [y/N] ", question);
  io::stdout().flush()?;

  let mut answer = String::new();
  io::stdin().lock().read_line(&mut answer)?;
  Ok(matches!(
    answer.trim().to_ascii_lowercase().as_str(),
    "y" | "yes"
  ))
}
