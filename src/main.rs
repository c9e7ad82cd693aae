use clap::{Parser, Subcommand};
use env_editor::backup::BackupOptions;
use env_editor::editor::VariableUpdate;
use env_editor::manager::{EnvManager, EnvManagerOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "env-editor",
  about = "Edit .env files without losing comments, blank lines or quoting",
  version,
  author
)]
struct Cli {
  /// Path to the .env file
  #[arg(short, long)]
  file: Option<PathBuf>,

  /// Do not back up the file before writing
  #[arg(long)]
  no_backup: bool,

  /// Directory for backups (defaults to .env_backups next to the file)
  #[arg(long)]
  backup_dir: Option<PathBuf>,

  /// Delete backups older than this many days (0 keeps all)
  #[arg(long, default_value_t = 7)]
  retention_days: u32,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the value of a variable
  Get {
    key: String,
    /// Printed when the variable is not set
    #[arg(short, long)]
    default: Option<String>,
  },
  /// Exit successfully if the variable is set
  Has { key: String },
  /// Set a variable, creating it if needed
  Set {
    key: String,
    value: String,
    /// Inline comment (an empty string removes it)
    #[arg(short, long)]
    comment: Option<String>,
    /// Comment line to place above the variable (repeatable)
    #[arg(short, long)]
    above: Vec<String>,
    /// Prefix the assignment with `export`
    #[arg(short, long)]
    export: bool,
  },
  /// Remove a variable
  Remove { key: String },
  /// Print every variable as KEY=value
  List,
  /// Rewrite the file in normalized form
  Fmt,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let options = EnvManagerOptions {
    env_file: cli.file,
    backup: BackupOptions {
      enabled: !cli.no_backup,
      directory: cli.backup_dir,
      retention_days: Some(cli.retention_days),
    },
  };

  let mut manager = EnvManager::new(options)?;

  match cli.command {
    Command::Get { key, default } => match manager.get(&key).or(default.as_deref()) {
      Some(value) => println!("{}", value),
      None => {
        eprintln!("{} is not set in {}", key, manager.path().display());
        return Ok(ExitCode::FAILURE);
      }
    },
    Command::Has { key } => {
      if !manager.has(&key) {
        return Ok(ExitCode::FAILURE);
      }
    }
    Command::Set {
      key,
      value,
      comment,
      above,
      export,
    } => {
      let mut update = VariableUpdate::new();
      if let Some(comment) = comment {
        update = update.inline_comment(comment);
      }
      if !above.is_empty() {
        update = update.comments_above(above.into_iter().map(as_comment_line));
      }
      if export {
        update = update.exported(true);
      }
      manager.set_with(&key, value, update);
      manager.save()?;
    }
    Command::Remove { key } => {
      if manager.remove(&key).is_none() {
        eprintln!("{} is not set in {}", key, manager.path().display());
        return Ok(ExitCode::FAILURE);
      }
      manager.save()?;
    }
    Command::List => {
      for var in manager.file().variables() {
        println!("{}={}", var.key, var.value);
      }
    }
    Command::Fmt => manager.save()?,
  }

  Ok(ExitCode::SUCCESS)
}

/// `--above "note"` becomes `# note`; lines already starting with `#` are kept.
fn as_comment_line(line: String) -> String {
  if line.trim_start().starts_with('#') {
    line
  } else {
    format!("# {}", line)
  }
}
