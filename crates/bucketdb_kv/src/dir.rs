//! Database directory management.
//!
//! ```text
//! <db_path>/
//! ├─ LOCK        # advisory lock: exclusive for writers, shared for readers
//! └─ data.log    # checksummed commit log
//! ```

use crate::error::{KvError, KvResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const LOG_FILE: &str = "data.log";

/// A locked database directory. The lock is released on drop.
#[derive(Debug)]
pub struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens (and optionally creates) a database directory.
    ///
    /// Writers take the lock exclusively, readers take it shared, so any
    /// number of read-only handles may coexist but never alongside a writer.
    ///
    /// # Errors
    ///
    /// - `DatabaseNotFound` when the directory is missing and
    ///   `create_if_missing` is false
    /// - `DatabaseLocked` when another handle holds a conflicting lock
    pub fn open(path: &Path, create_if_missing: bool, read_only: bool) -> KvResult<Self> {
        if !path.exists() {
            if create_if_missing && !read_only {
                fs::create_dir_all(path)?;
            } else {
                return Err(KvError::DatabaseNotFound {
                    path: path.display().to_string(),
                });
            }
        }

        if !path.is_dir() {
            return Err(KvError::DatabaseNotFound {
                path: path.display().to_string(),
            });
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        let locked = if read_only {
            FileExt::try_lock_shared(&lock_file)
        } else {
            FileExt::try_lock_exclusive(&lock_file)
        };
        if locked.is_err() {
            return Err(KvError::DatabaseLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the commit log path.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");

        let dir = DatabaseDir::open(&path, true, false).unwrap();
        assert!(path.is_dir());
        assert!(path.join(LOCK_FILE).exists());
        assert_eq!(dir.log_path(), path.join("data.log"));
    }

    #[test]
    fn missing_directory_without_create_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");

        let result = DatabaseDir::open(&path, false, false);
        assert!(matches!(result, Err(KvError::DatabaseNotFound { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn read_only_never_creates() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db");

        let result = DatabaseDir::open(&path, true, true);
        assert!(matches!(result, Err(KvError::DatabaseNotFound { .. })));
    }

    #[test]
    fn second_writer_is_locked_out() {
        let temp = tempdir().unwrap();
        let _first = DatabaseDir::open(temp.path(), true, false).unwrap();

        let second = DatabaseDir::open(temp.path(), true, false);
        assert!(matches!(second, Err(KvError::DatabaseLocked)));
    }

    #[test]
    fn readers_share_the_lock() {
        let temp = tempdir().unwrap();
        drop(DatabaseDir::open(temp.path(), true, false).unwrap());

        let _a = DatabaseDir::open(temp.path(), false, true).unwrap();
        let _b = DatabaseDir::open(temp.path(), false, true).unwrap();
        assert!(matches!(
            DatabaseDir::open(temp.path(), false, false),
            Err(KvError::DatabaseLocked)
        ));
    }
}
