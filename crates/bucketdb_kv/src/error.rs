//! Error types for the bucket store.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors raised by the bucket store.
#[derive(Debug, Error)]
pub enum KvError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] bucketdb_storage::StorageError),

    /// I/O error outside the backend (directory handling).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The commit log failed validation during recovery.
    #[error("commit log corrupted at offset {offset}: {message}")]
    Corrupted {
        /// Offset of the offending log record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// The named bucket does not exist.
    #[error("bucket not found: {name}")]
    BucketNotFound {
        /// Bucket name.
        name: String,
    },

    /// The bucket already exists with different flags.
    #[error("bucket {name} already exists with different flags")]
    BucketExists {
        /// Bucket name.
        name: String,
    },

    /// The bucket name cannot be stored.
    #[error("invalid bucket name: {reason}")]
    InvalidBucketName {
        /// Why the name was rejected.
        reason: String,
    },

    /// A duplicate-sort operation was used on a plain bucket.
    #[error("bucket {bucket} is not a duplicate-sort bucket")]
    NotDupSort {
        /// Bucket name.
        bucket: String,
    },

    /// An append did not sort strictly after the bucket's last record.
    #[error("out-of-order append in bucket {bucket}: key {} does not sort after the last record", hex::encode(.key))]
    OutOfOrder {
        /// Bucket name.
        bucket: String,
        /// The rejected key.
        key: Vec<u8>,
    },

    /// A commit batch field does not fit the log's 32-bit length fields.
    #[error("{what} of {size} bytes exceeds the commit log limit")]
    BatchTooLarge {
        /// Which field overflowed.
        what: String,
        /// The offending size.
        size: usize,
    },

    /// The transaction that owned a cursor has ended.
    #[error("transaction is closed")]
    TransactionClosed,

    /// Another write transaction is active.
    #[error("another write transaction is active")]
    WriterBusy,

    /// The database was opened read-only.
    #[error("database is read-only")]
    ReadOnly,

    /// Another process holds the database lock.
    #[error("database locked: another process has conflicting access")]
    DatabaseLocked,

    /// No database exists at the path and creation was not requested.
    #[error("database not found: {path}")]
    DatabaseNotFound {
        /// The path that was opened.
        path: String,
    },
}

impl KvError {
    /// Creates a corruption error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::Corrupted {
            offset,
            message: message.into(),
        }
    }

    /// Creates a bucket-not-found error.
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound { name: name.into() }
    }

    /// Creates an invalid bucket name error.
    pub fn invalid_bucket_name(reason: impl Into<String>) -> Self {
        Self::InvalidBucketName {
            reason: reason.into(),
        }
    }

    /// Returns whether this error reports an append ordering violation.
    #[must_use]
    pub fn is_out_of_order(&self) -> bool {
        matches!(self, Self::OutOfOrder { .. })
    }
}
