//! Test fixtures and database helpers.

use bucketdb_kv::{
    BucketFlags, Database, KvConfig, KvCursor, KvReadTx, KvWriteCursor, KvWriteTx,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A raw (key, value) pair.
pub type RawRecord = (Vec<u8>, Vec<u8>);

/// Plain description of one bucket and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    /// Bucket name.
    pub name: String,
    /// Bucket flags.
    pub flags: BucketFlags,
    /// Records in ascending (key, value) order.
    pub records: Vec<RawRecord>,
    /// Sequence counter.
    pub sequence: u64,
}

impl BucketSpec {
    /// Describes a plain bucket.
    pub fn plain(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            flags: BucketFlags::PLAIN,
            records,
            sequence: 0,
        }
    }

    /// Describes a duplicate-sort bucket.
    pub fn dup_sort(name: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.into(),
            flags: BucketFlags::DUP_SORT,
            records,
            sequence: 0,
        }
    }

    /// Marks the bucket deprecated.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.flags = self.flags.deprecated();
        self
    }

    /// Sets the sequence counter.
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory().expect("Failed to open in-memory database"),
            _temp_dir: None,
        }
    }

    /// Creates a new database in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("db"), KvConfig::new())
            .expect("Failed to open file database");
        Self {
            db,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.db.path().map(Path::to_path_buf)
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// A temporary directory for databases opened and closed by path.
pub struct TempDatabases {
    dir: TempDir,
}

impl TempDatabases {
    /// Creates an empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns a path for database `name` inside the directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates database `name`, seeds it and closes it again.
    pub fn create(&self, name: &str, buckets: &[BucketSpec]) -> PathBuf {
        let path = self.path(name);
        let db = Database::open(&path, KvConfig::new()).expect("Failed to create database");
        seed(&db, buckets);
        path
    }

    /// Opens database `name` read-only and reads all of it.
    pub fn read(&self, name: &str) -> Vec<BucketSpec> {
        let db = Database::open(&self.path(name), KvConfig::read_only())
            .expect("Failed to open database");
        contents(&db)
    }
}

impl Default for TempDatabases {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `buckets` into `db` in one transaction.
///
/// Records must already be in ascending order.
pub fn seed(db: &Database, buckets: &[BucketSpec]) {
    db.update(|tx| {
        for spec in buckets {
            tx.create_bucket(&spec.name, spec.flags)?;
            let mut cursor = tx.rw_cursor(&spec.name)?;
            for (key, value) in &spec.records {
                let key = Bytes::copy_from_slice(key);
                let value = Bytes::copy_from_slice(value);
                if spec.flags.dup_sort {
                    cursor.append_dup(key, value)?;
                } else {
                    cursor.append(key, value)?;
                }
            }
            if spec.sequence != 0 {
                tx.set_sequence(&spec.name, spec.sequence)?;
            }
        }
        Ok(())
    })
    .expect("Failed to seed database");
}

/// Reads one bucket's records.
pub fn bucket_records<T: KvReadTx>(tx: &T, bucket: &str) -> Vec<RawRecord> {
    let mut cursor = tx.cursor(bucket).expect("Failed to open cursor");
    let mut records = Vec::new();
    while let Some((key, value)) = cursor.next().expect("Cursor failed") {
        records.push((key.to_vec(), value.to_vec()));
    }
    records
}

/// Reads every bucket of `db` in catalog order.
pub fn contents(db: &Database) -> Vec<BucketSpec> {
    let tx = db.begin_read().expect("Failed to begin read");
    db.catalog()
        .iter()
        .map(|info| BucketSpec {
            name: info.name.clone(),
            flags: info.flags,
            records: bucket_records(&tx, &info.name),
            sequence: tx.sequence(&info.name).expect("Failed to read sequence"),
        })
        .collect()
}
