//! Timestamped env file backups with a retention window.
//!
//! Backups are plain copies named
//! `<file name>.backup_<YYYYmmdd_HHMMSS>_<8 random alphanumerics>` inside a
//! dedicated directory. Every successful backup prunes copies of the same file
//! whose modification time is older than the retention window.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, TimeDelta, Utc};
use rand::{Rng, distributions::Alphanumeric};

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

const BACKUP_MARKER: &str = ".backup_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const RANDOM_SUFFIX_LEN: usize = 8;

pub const DEFAULT_BACKUP_DIRNAME: &str = ".env_backups";
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Backup configuration for an [`EnvManager`](crate::manager::EnvManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
  pub enabled: bool,
  /// Backup directory. If None, defaults to `.env_backups` next to the env file.
  pub directory: Option<PathBuf>,
  /// Backups older than this many days are pruned. `None` or `0` keeps everything.
  pub retention_days: Option<u32>,
}

impl Default for BackupOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      directory: None,
      retention_days: Some(DEFAULT_RETENTION_DAYS),
    }
  }
}

impl BackupOptions {
  pub fn disabled() -> Self {
    Self {
      enabled: false,
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone)]
pub struct BackupManager {
  directory: PathBuf,
  retention_days: Option<u32>,
}

impl BackupManager {
  pub fn new(directory: impl Into<PathBuf>, retention_days: Option<u32>) -> Self {
    Self {
      directory: directory.into(),
      retention_days,
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  /// Copies `path` into the backup directory and prunes expired backups.
  ///
  /// Returns `Ok(None)` when there is nothing to back up.
  pub fn create(&self, path: &Path) -> Result<Option<PathBuf>, BackupError> {
    if !path.is_file() {
      #[cfg(feature = "tracing")]
      debug!("Nothing to back up at {:?}", path);
      return Ok(None);
    }

    let file_name = path
      .file_name()
      .and_then(|name| name.to_str())
      .ok_or_else(|| BackupError::InvalidFileName(path.to_path_buf()))?;

    std::fs::create_dir_all(&self.directory).map_err(|source| BackupError::CreateDir {
      path: self.directory.clone(),
      source,
    })?;

    let backup_path = self.directory.join(backup_name(file_name));
    std::fs::copy(path, &backup_path).map_err(|source| BackupError::Copy {
      path: backup_path.clone(),
      source,
    })?;

    #[cfg(feature = "tracing")]
    info!("Backed up {:?} to {:?}", path, backup_path);

    self.prune(file_name)?;

    Ok(Some(backup_path))
  }

  /// Deletes backups of `original_file_name` older than the retention window,
  /// returning how many were removed.
  pub fn prune(&self, original_file_name: &str) -> Result<usize, BackupError> {
    let Some(days) = self.retention_days.filter(|days| *days > 0) else {
      return Ok(0);
    };
    if !self.directory.is_dir() {
      return Ok(0);
    }

    // A window reaching past the representable date range expires nothing.
    let Some(cutoff) =
      TimeDelta::try_days(i64::from(days)).and_then(|window| Utc::now().checked_sub_signed(window))
    else {
      return Ok(0);
    };
    let prefix = format!("{}{}", original_file_name, BACKUP_MARKER);
    let read_dir_error = |source| BackupError::Prune {
      path: self.directory.clone(),
      source,
    };

    let mut removed = 0;
    for entry in std::fs::read_dir(&self.directory).map_err(read_dir_error)? {
      let entry = entry.map_err(read_dir_error)?;
      let name = entry.file_name();
      if !name.to_str().is_some_and(|name| name.starts_with(&prefix)) {
        continue;
      }

      let metadata = entry.metadata().map_err(read_dir_error)?;
      if !metadata.is_file() || !modified_before(metadata.modified(), cutoff) {
        continue;
      }

      #[cfg(feature = "tracing")]
      trace!("Pruning expired backup {:?}", entry.path());

      std::fs::remove_file(entry.path()).map_err(|source| BackupError::Prune {
        path: entry.path(),
        source,
      })?;
      removed += 1;
    }

    #[cfg(feature = "tracing")]
    debug!("Pruned {} backups of {}", removed, original_file_name);

    Ok(removed)
  }
}

fn modified_before(modified: io::Result<SystemTime>, cutoff: DateTime<Utc>) -> bool {
  modified.is_ok_and(|time| DateTime::<Utc>::from(time) < cutoff)
}

fn backup_name(file_name: &str) -> String {
  let timestamp = Local::now().format(TIMESTAMP_FORMAT);
  let random: String = rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(RANDOM_SUFFIX_LEN)
    .map(char::from)
    .collect();

  format!("{}{}{}_{}", file_name, BACKUP_MARKER, timestamp, random)
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
  #[error("Cannot back up {0:?}: file name is not valid UTF-8")]
  InvalidFileName(PathBuf),
  #[error("Failed to create backup directory {path:?}: {source}")]
  CreateDir { path: PathBuf, source: io::Error },
  #[error("Failed to copy backup to {path:?}: {source}")]
  Copy { path: PathBuf, source: io::Error },
  #[error("Failed to prune backups in {path:?}: {source}")]
  Prune { path: PathBuf, source: io::Error },
}
