//! Reading and writing env file contents.

use std::io;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Byte storage behind an [`EnvManager`](crate::manager::EnvManager).
pub trait Storage {
  /// Returns the file content, or an empty string when the file does not exist.
  fn read(&self, path: &Path) -> Result<String, StorageError>;

  fn write(&self, path: &Path, content: &str) -> Result<(), StorageError>;
}

/// [`Storage`] on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
  fn read(&self, path: &Path) -> Result<String, StorageError> {
    match std::fs::read_to_string(path) {
      Ok(content) => {
        #[cfg(feature = "tracing")]
        trace!("Read {} bytes from {:?}", content.len(), path);
        Ok(content)
      }
      Err(err) if err.kind() == io::ErrorKind::NotFound => {
        #[cfg(feature = "tracing")]
        debug!("{:?} does not exist, starting empty", path);
        Ok(String::new())
      }
      Err(source) => Err(StorageError::Read {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  fn write(&self, path: &Path, content: &str) -> Result<(), StorageError> {
    #[cfg(feature = "tracing")]
    debug!("Writing {} bytes to {:?}", content.len(), path);

    std::fs::write(path, content).map_err(|source| StorageError::Write {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  #[error("Could not read env file {path:?}: {source}")]
  Read { path: PathBuf, source: io::Error },
  #[error("Could not write env file {path:?}: {source}")]
  Write { path: PathBuf, source: io::Error },
}
