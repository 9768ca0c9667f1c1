//! Appending into a destination store with periodic commit rotation.
//!
//! Bulk copy and text import both stream sorted records into a destination
//! bucket. [`AppendCursor`] fixes the append call (plain or duplicate-sort)
//! once per bucket, and [`WriteSession`] owns the destination's write
//! transaction so it can be committed and reopened mid-stream.

use crate::error::{CoreError, CoreResult};
use bucketdb_kv::{BucketFlags, BucketInfo, KvError, KvReadTx, KvStore, KvWriteCursor, KvWriteTx};
use bytes::Bytes;
use tracing::debug;

/// How records are appended to a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// One value per key; keys strictly ascending.
    Plain,
    /// Several values per key; (key, value) pairs strictly ascending.
    DuplicateSort,
}

impl AppendMode {
    /// Picks the mode from a bucket's catalog entry.
    #[must_use]
    pub fn for_bucket(info: &BucketInfo) -> Self {
        if info.is_dup_sort() {
            Self::DuplicateSort
        } else {
            Self::Plain
        }
    }
}

/// A write cursor bound to the append call its bucket needs.
#[derive(Debug)]
pub enum AppendCursor<C> {
    /// Uses [`KvWriteCursor::append`].
    Plain(C),
    /// Uses [`KvWriteCursor::append_dup`].
    DuplicateSort(C),
}

impl<C: KvWriteCursor> AppendCursor<C> {
    /// Wraps `cursor` for `mode`.
    pub fn new(mode: AppendMode, cursor: C) -> Self {
        match mode {
            AppendMode::Plain => Self::Plain(cursor),
            AppendMode::DuplicateSort => Self::DuplicateSort(cursor),
        }
    }

    /// Returns the append mode.
    #[must_use]
    pub fn mode(&self) -> AppendMode {
        match self {
            Self::Plain(_) => AppendMode::Plain,
            Self::DuplicateSort(_) => AppendMode::DuplicateSort,
        }
    }

    /// Returns the destination bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::Plain(c) | Self::DuplicateSort(c) => c.bucket(),
        }
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// [`CoreError::OrderingViolation`] when the record does not sort after
    /// the bucket's last record. Other store failures propagate as
    /// [`CoreError::Kv`].
    pub fn append(&mut self, key: Bytes, value: Bytes) -> CoreResult<()> {
        let result = match self {
            Self::Plain(c) => c.append(key, value),
            Self::DuplicateSort(c) => c.append_dup(key, value),
        };
        result.map_err(|e| match e {
            KvError::OutOfOrder { bucket, key } => CoreError::OrderingViolation { bucket, key },
            other => CoreError::Kv(other),
        })
    }
}

/// Cursor type of a store's write transactions.
pub type StoreWriteCursor<S> = <<S as KvStore>::WriteTx as KvWriteTx>::WriteCursor;

/// Holds the destination store's current write transaction.
///
/// Dropping an uncommitted session rolls back its transaction.
pub struct WriteSession<'s, S: KvStore> {
    store: &'s S,
    tx: Option<S::WriteTx>,
    rotations: u64,
}

impl<'s, S: KvStore> WriteSession<'s, S> {
    /// Begins a write transaction on `store`.
    pub fn begin(store: &'s S) -> CoreResult<Self> {
        Ok(Self {
            store,
            tx: Some(store.begin_write()?),
            rotations: 0,
        })
    }

    fn tx(&mut self) -> CoreResult<&mut S::WriteTx> {
        self.tx
            .as_mut()
            .ok_or(CoreError::Kv(KvError::TransactionClosed))
    }

    /// Returns the existing entry for `name`, or creates the bucket with
    /// `flags`. An existing bucket keeps its own flags.
    ///
    /// The second element is true when the bucket was created.
    pub fn ensure_bucket(&mut self, name: &str, flags: BucketFlags) -> CoreResult<(BucketInfo, bool)> {
        let tx = self.tx()?;
        if let Some(info) = tx.bucket_info(name)? {
            return Ok((info, false));
        }
        Ok((tx.create_bucket(name, flags)?, true))
    }

    /// Creates `name` with exactly `flags`; an existing bucket with other
    /// flags is an error.
    pub fn create_bucket(&mut self, name: &str, flags: BucketFlags) -> CoreResult<BucketInfo> {
        Ok(self.tx()?.create_bucket(name, flags)?)
    }

    /// Opens an append cursor on `bucket` using its catalog flags.
    pub fn cursor(&mut self, bucket: &str) -> CoreResult<AppendCursor<StoreWriteCursor<S>>> {
        let tx = self.tx()?;
        let info = tx
            .bucket_info(bucket)?
            .ok_or_else(|| KvError::bucket_not_found(bucket))?;
        let cursor = tx.rw_cursor(&info.name)?;
        Ok(AppendCursor::new(AppendMode::for_bucket(&info), cursor))
    }

    /// Overwrites a bucket's sequence counter.
    pub fn set_sequence(&mut self, bucket: &str, value: u64) -> CoreResult<()> {
        Ok(self.tx()?.set_sequence(bucket, value)?)
    }

    /// Commits the current transaction and begins a new one.
    ///
    /// Cursors opened before the rotation are invalid afterwards.
    pub fn rotate(&mut self) -> CoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()?;
        }
        self.tx = Some(self.store.begin_write()?);
        self.rotations += 1;
        debug!(rotations = self.rotations, "rotated write transaction");
        Ok(())
    }

    /// Returns how many times the session rotated.
    #[must_use]
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Commits the current transaction and ends the session.
    pub fn commit(mut self) -> CoreResult<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()?;
        }
        Ok(())
    }
}
