//! Store capability traits.
//!
//! The comparison, copy and import engines are written against these traits
//! rather than against [`crate::Database`] directly. Anything that can hand
//! out snapshot read transactions, a single write transaction, forward
//! cursors and append cursors can be diffed, copied or imported into.

use crate::catalog::{BucketCatalog, BucketFlags, BucketInfo};
use crate::error::KvResult;
use bytes::Bytes;

/// A (key, value) pair read from a bucket.
pub type Record = (Bytes, Bytes);

/// Forward cursor over one bucket.
///
/// Records come back in ascending (key, value) order. For duplicate-sort
/// buckets every value of a key is its own record.
pub trait KvCursor {
    /// Positions on the first record and returns it, or `None` for an empty
    /// bucket.
    fn first(&mut self) -> KvResult<Option<Record>>;

    /// Advances and returns the next record, or `None` past the end.
    ///
    /// On a cursor that was never positioned this behaves like
    /// [`KvCursor::first`].
    fn next(&mut self) -> KvResult<Option<Record>>;
}

/// Append-only write handle into one bucket.
pub trait KvWriteCursor {
    /// Name of the bucket this cursor writes to.
    fn bucket(&self) -> &str;

    /// Appends a new key. The key must sort strictly after the bucket's
    /// last key.
    fn append(&mut self, key: Bytes, value: Bytes) -> KvResult<()>;

    /// Appends a (key, value) pair to a duplicate-sort bucket. The pair must
    /// sort strictly after the bucket's last pair; the key may repeat.
    fn append_dup(&mut self, key: Bytes, value: Bytes) -> KvResult<()>;
}

/// A snapshot read transaction.
pub trait KvReadTx {
    /// Cursor type handed out by this transaction.
    type Cursor: KvCursor;

    /// Opens a cursor on `bucket`.
    fn cursor(&self, bucket: &str) -> KvResult<Self::Cursor>;

    /// Returns the catalog entry for `bucket`, if it exists.
    fn bucket_info(&self, bucket: &str) -> KvResult<Option<BucketInfo>>;

    /// Returns the bucket's sequence counter.
    fn sequence(&self, bucket: &str) -> KvResult<u64>;

    /// Returns the bucket catalog as of this transaction's snapshot.
    fn catalog(&self) -> KvResult<BucketCatalog>;

    /// Ends the transaction. Dropping it has the same effect.
    fn rollback(self)
    where
        Self: Sized;
}

/// A write transaction. Writes become visible to new transactions on
/// [`KvWriteTx::commit`]; dropping the transaction discards them.
pub trait KvWriteTx: KvReadTx {
    /// Write cursor type handed out by this transaction.
    type WriteCursor: KvWriteCursor;

    /// Creates `name` with `flags`, or returns the existing entry when it
    /// already exists with the same flags.
    fn create_bucket(&mut self, name: &str, flags: BucketFlags) -> KvResult<BucketInfo>;

    /// Opens an append cursor on an existing bucket.
    fn rw_cursor(&mut self, bucket: &str) -> KvResult<Self::WriteCursor>;

    /// Overwrites the bucket's sequence counter.
    fn set_sequence(&mut self, bucket: &str, value: u64) -> KvResult<()>;

    /// Durably persists all writes of this transaction.
    fn commit(self) -> KvResult<()>
    where
        Self: Sized;
}

/// A database handle.
pub trait KvStore {
    /// Read transaction type.
    type ReadTx: KvReadTx;
    /// Write transaction type.
    type WriteTx: KvWriteTx;

    /// Begins a snapshot read transaction.
    fn begin_read(&self) -> KvResult<Self::ReadTx>;

    /// Begins the write transaction. Only one may be active at a time.
    fn begin_write(&self) -> KvResult<Self::WriteTx>;

    /// Returns the current bucket catalog.
    fn bucket_catalog(&self) -> KvResult<BucketCatalog>;
}
