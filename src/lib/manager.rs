//! Load, edit and save a single env file.
//!
//! The manager ties the pieces together: storage read → parse → edit →
//! format → backup → storage write. It owns one [`EnvFile`] and every
//! mutation goes through `&mut self`, so a manager is used by one caller at a
//! time.
//!
//! # Examples
//!
//! ```rust,no_run
//! use env_editor::manager::{EnvManager, EnvManagerOptions};
//! use std::path::PathBuf;
//!
//! let mut manager = EnvManager::new(EnvManagerOptions {
//!     env_file: Some(PathBuf::from(".env")),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! manager
//!     .set("APP_ENV", "production")
//!     .comment_line("set by deploy")
//!     .save()
//!     .unwrap();
//! ```

use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::backup::{BackupError, BackupManager, BackupOptions, DEFAULT_BACKUP_DIRNAME};
use crate::batch::Batch;
use crate::editor::VariableUpdate;
use crate::parse::{EnvFile, EnvVariable};
use crate::storage::{FsStorage, Storage, StorageError};

const DEFAULT_ENV_FILENAME: &str = ".env";

/// Configuration options for an [`EnvManager`].
#[derive(Debug, Clone, Default)]
pub struct EnvManagerOptions {
  /// Path to the env file. If None, defaults to `.env` in current directory.
  pub env_file: Option<PathBuf>,
  pub backup: BackupOptions,
}

pub struct EnvManager<S: Storage = FsStorage> {
  path: PathBuf,
  storage: S,
  backups: Option<BackupManager>,
  file: EnvFile,
}

impl EnvManager<FsStorage> {
  /// Creates a manager over the local filesystem and loads the env file.
  pub fn new(options: EnvManagerOptions) -> Result<Self, EnvManagerError> {
    Self::with_storage(options, FsStorage)
  }
}

impl<S: Storage> EnvManager<S> {
  pub fn with_storage(options: EnvManagerOptions, storage: S) -> Result<Self, EnvManagerError> {
    let EnvManagerOptions { env_file, backup } = options;

    let path = env_file.unwrap_or_else(|| {
      std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(DEFAULT_ENV_FILENAME)
    });

    let backups = backup.enabled.then(|| {
      let directory = backup.directory.unwrap_or_else(|| {
        path
          .parent()
          .unwrap_or_else(|| Path::new("."))
          .join(DEFAULT_BACKUP_DIRNAME)
      });
      BackupManager::new(directory, backup.retention_days)
    });

    #[cfg(feature = "tracing")]
    debug!(?path, backups_enabled = backups.is_some(), "Resolved env manager options");

    let mut manager = Self {
      path,
      storage,
      backups,
      file: EnvFile::new(),
    };
    manager.load()?;
    Ok(manager)
  }

  /// Re-reads and re-parses the env file, discarding unsaved edits.
  pub fn load(&mut self) -> Result<&mut Self, EnvManagerError> {
    let content = self.storage.read(&self.path)?;
    self.file = EnvFile::parse(&content);

    #[cfg(feature = "tracing")]
    debug!("Loaded {} entries from {:?}", self.file.len(), self.path);

    Ok(self)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn file(&self) -> &EnvFile {
    &self.file
  }

  pub fn has(&self, key: &str) -> bool {
    self.file.has(key)
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.file.get(key)
  }

  pub fn get_or<'s>(&'s self, key: &str, default: &'s str) -> &'s str {
    self.file.get_or(key, default)
  }

  /// Sets `key` immediately, keeping its comments, and returns a setter for
  /// further changes to the same variable.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> VariableSetter<'_, S> {
    let key = key.into();
    let value = value.into();
    self.file.set(&key, value.clone(), VariableUpdate::new());
    VariableSetter {
      manager: self,
      key,
      value,
    }
  }

  /// Sets `key` with explicit field changes in one call.
  pub fn set_with(&mut self, key: &str, value: impl Into<String>, update: VariableUpdate) -> Option<String> {
    self.file.set(key, value, update)
  }

  pub fn batch(&self) -> Batch {
    Batch::new()
  }

  pub fn apply_batch(&mut self, batch: Batch) -> &mut Self {
    batch.apply(&mut self.file);
    self
  }

  pub fn remove(&mut self, key: &str) -> Option<EnvVariable> {
    self.file.remove(key)
  }

  /// The current document, formatted.
  pub fn content(&self) -> String {
    self.file.to_string()
  }

  /// Writes `content` verbatim (after a backup) and reloads from it.
  pub fn set_content(&mut self, content: &str) -> Result<(), EnvManagerError> {
    self.write(content)?;
    self.file = EnvFile::parse(content);
    Ok(())
  }

  /// Formats the current document and writes it, backing up the previous file
  /// first when backups are enabled.
  pub fn save(&self) -> Result<(), EnvManagerError> {
    self.write(&self.content())
  }

  fn write(&self, content: &str) -> Result<(), EnvManagerError> {
    if let Some(backups) = &self.backups {
      backups.create(&self.path)?;
    }
    self.storage.write(&self.path, content)?;

    #[cfg(feature = "tracing")]
    info!("Saved {:?}", self.path);

    Ok(())
  }
}

/// Follow-up changes to a variable set through [`EnvManager::set`].
pub struct VariableSetter<'m, S: Storage> {
  manager: &'m mut EnvManager<S>,
  key: String,
  value: String,
}

impl<'m, S: Storage> VariableSetter<'m, S> {
  /// Sets the inline comment. An empty string clears it.
  pub fn comment_line(self, comment: impl Into<String>) -> Self {
    self.update(VariableUpdate::new().inline_comment(comment))
  }

  pub fn comments_above<I, T>(self, comments: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.update(VariableUpdate::new().comments_above(comments))
  }

  pub fn exported(self, exported: bool) -> Self {
    self.update(VariableUpdate::new().exported(exported))
  }

  pub fn save(self) -> Result<(), EnvManagerError> {
    self.manager.save()
  }

  fn update(self, update: VariableUpdate) -> Self {
    self.manager.file.set(&self.key, self.value.clone(), update);
    self
  }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvManagerError {
  #[error(transparent)]
  Storage(#[from] StorageError),
  #[error("Backup failed: {0}")]
  Backup(#[from] BackupError),
}
