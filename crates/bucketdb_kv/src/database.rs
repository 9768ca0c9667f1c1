//! Database facade and recovery.

use crate::catalog::BucketCatalog;
use crate::config::KvConfig;
use crate::dir::DatabaseDir;
use crate::error::KvResult;
use crate::log::replay;
use crate::state::Snapshot;
use crate::traits::{KvStore, KvWriteTx};
use crate::transaction::{ReadTransaction, WriteTransaction};
use bucketdb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

pub(crate) struct Inner {
    pub(crate) config: KvConfig,
    dir: Option<DatabaseDir>,
    pub(crate) backend: Mutex<Box<dyn StorageBackend>>,
    pub(crate) snapshot: RwLock<Arc<Snapshot>>,
    pub(crate) writer_active: AtomicBool,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("config", &self.config)
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// An ordered bucket store.
///
/// The handle is cheap to clone; clones share the same snapshot, commit log
/// and writer slot.
///
/// ```rust,ignore
/// use bucketdb_kv::{BucketFlags, Database, KvConfig, KvWriteCursor, KvWriteTx};
///
/// let db = Database::open(Path::new("chaindata"), KvConfig::new())?;
/// db.update(|tx| {
///     tx.create_bucket("PlainState", BucketFlags::DUP_SORT)?;
///     tx.rw_cursor("PlainState")?.append_dup(key, value)
/// })?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Opens a database directory, replaying its commit log.
    ///
    /// # Errors
    ///
    /// Fails when the directory is missing (and may not be created), when it
    /// is locked by a conflicting handle, or when the commit log is corrupt.
    pub fn open(path: &Path, config: KvConfig) -> KvResult<Self> {
        let dir = DatabaseDir::open(path, config.create_if_missing, config.read_only)?;
        let log_path = dir.log_path();

        let backend: Box<dyn StorageBackend> = if config.read_only {
            if log_path.exists() {
                Box::new(FileBackend::open_read_only(&log_path)?)
            } else {
                Box::new(InMemoryBackend::new())
            }
        } else {
            Box::new(FileBackend::open(&log_path)?)
        };

        let db = Self::recover(config, Some(dir), backend)?;
        info!(
            path = %path.display(),
            read_only = db.is_read_only(),
            "opened database"
        );
        Ok(db)
    }

    /// Opens an empty in-memory database.
    pub fn open_in_memory() -> KvResult<Self> {
        Self::open_with_backend(KvConfig::new(), Box::new(InMemoryBackend::new()))
    }

    /// Opens a database over an arbitrary commit log backend.
    ///
    /// Sharing an [`InMemoryBackend`] clone between two calls simulates a
    /// restart.
    pub fn open_with_backend(config: KvConfig, backend: Box<dyn StorageBackend>) -> KvResult<Self> {
        Self::recover(config, None, backend)
    }

    fn recover(
        config: KvConfig,
        dir: Option<DatabaseDir>,
        mut backend: Box<dyn StorageBackend>,
    ) -> KvResult<Self> {
        let mut snapshot = Snapshot::default();
        let stats = replay(backend.as_mut(), config.read_only, |op| snapshot.apply(op))?;
        debug!(
            batches = stats.batches,
            ops = stats.ops,
            discarded = stats.discarded_bytes,
            "replayed commit log"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                dir,
                backend: Mutex::new(backend),
                snapshot: RwLock::new(Arc::new(snapshot)),
                writer_active: AtomicBool::new(false),
            }),
        })
    }

    /// Returns the directory path, or `None` for a backend-only database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.dir.as_ref().map(DatabaseDir::path)
    }

    /// Returns whether the database refuses write transactions.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.inner.config.read_only
    }

    /// Returns the open configuration.
    #[must_use]
    pub fn config(&self) -> &KvConfig {
        &self.inner.config
    }

    /// Begins a snapshot read transaction.
    pub fn begin_read(&self) -> KvResult<ReadTransaction> {
        Ok(ReadTransaction::new(Arc::clone(&self.inner.snapshot.read())))
    }

    /// Begins the write transaction.
    ///
    /// # Errors
    ///
    /// `ReadOnly` on a read-only database, `WriterBusy` while another write
    /// transaction is alive.
    pub fn begin_write(&self) -> KvResult<WriteTransaction> {
        WriteTransaction::begin(&self.inner)
    }

    /// Runs `f` in a read transaction.
    pub fn view<F, T>(&self, f: F) -> KvResult<T>
    where
        F: FnOnce(&ReadTransaction) -> KvResult<T>,
    {
        let tx = self.begin_read()?;
        f(&tx)
    }

    /// Runs `f` in a write transaction, committing when it returns `Ok`.
    pub fn update<F, T>(&self, f: F) -> KvResult<T>
    where
        F: FnOnce(&mut WriteTransaction) -> KvResult<T>,
    {
        let mut tx = self.begin_write()?;
        let value = f(&mut tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Returns the current bucket catalog.
    #[must_use]
    pub fn catalog(&self) -> BucketCatalog {
        self.inner.snapshot.read().catalog()
    }
}

impl KvStore for Database {
    type ReadTx = ReadTransaction;
    type WriteTx = WriteTransaction;

    fn begin_read(&self) -> KvResult<ReadTransaction> {
        Database::begin_read(self)
    }

    fn begin_write(&self) -> KvResult<WriteTransaction> {
        Database::begin_write(self)
    }

    fn bucket_catalog(&self) -> KvResult<BucketCatalog> {
        Ok(self.catalog())
    }
}
