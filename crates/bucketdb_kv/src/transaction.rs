//! Snapshot read transactions and the single write transaction.

use crate::catalog::{BucketCatalog, BucketFlags, BucketInfo};
use crate::cursor::{Cursor, WriteCursor};
use crate::database::Inner;
use crate::error::{KvError, KvResult};
use crate::log::{encode_batch, LogOp};
use crate::state::Snapshot;
use crate::traits::{KvReadTx, KvWriteTx};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// A read transaction pinned to the snapshot current when it began.
#[derive(Debug, Clone)]
pub struct ReadTransaction {
    snapshot: Arc<Snapshot>,
}

impl ReadTransaction {
    pub(crate) fn new(snapshot: Arc<Snapshot>) -> Self {
        Self { snapshot }
    }
}

impl KvReadTx for ReadTransaction {
    type Cursor = Cursor;

    fn cursor(&self, bucket: &str) -> KvResult<Cursor> {
        let data = self.snapshot.bucket(bucket)?;
        Ok(Cursor::new(Arc::clone(&data.records)))
    }

    fn bucket_info(&self, bucket: &str) -> KvResult<Option<BucketInfo>> {
        Ok(self.snapshot.info(bucket))
    }

    fn sequence(&self, bucket: &str) -> KvResult<u64> {
        Ok(self.snapshot.bucket(bucket)?.sequence)
    }

    fn catalog(&self) -> KvResult<BucketCatalog> {
        Ok(self.snapshot.catalog())
    }

    fn rollback(self) {}
}

/// Mutable state shared between a write transaction and its cursors.
#[derive(Debug)]
pub(crate) struct TxState {
    pub(crate) snapshot: Snapshot,
    pub(crate) ops: Vec<LogOp>,
    pub(crate) open: bool,
}

impl TxState {
    pub(crate) fn append(
        &mut self,
        bucket: &Arc<str>,
        key: Bytes,
        value: Bytes,
        dup: bool,
    ) -> KvResult<()> {
        let data = self.snapshot.bucket_mut(bucket)?;
        if dup {
            data.append_dup(key.clone(), value.clone())?;
        } else {
            data.append(key.clone(), value.clone())?;
        }
        self.ops.push(LogOp::Append {
            bucket: Arc::clone(bucket),
            key,
            value,
        });
        Ok(())
    }

    fn ensure_open(&self) -> KvResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(KvError::TransactionClosed)
        }
    }
}

/// Releases the writer slot on drop.
#[derive(Debug)]
struct WriterGuard {
    inner: Arc<Inner>,
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        self.inner.writer_active.store(false, Ordering::Release);
    }
}

/// The database's write transaction.
///
/// Writes are staged on a copy-on-write clone of the snapshot and published
/// on commit. Dropping the transaction rolls back and invalidates every
/// cursor it handed out.
#[derive(Debug)]
pub struct WriteTransaction {
    state: Arc<Mutex<TxState>>,
    guard: WriterGuard,
}

impl WriteTransaction {
    pub(crate) fn begin(inner: &Arc<Inner>) -> KvResult<Self> {
        if inner.config.read_only {
            return Err(KvError::ReadOnly);
        }
        if inner
            .writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(KvError::WriterBusy);
        }
        let guard = WriterGuard {
            inner: Arc::clone(inner),
        };

        let snapshot = Snapshot::clone(&inner.snapshot.read());
        Ok(Self {
            state: Arc::new(Mutex::new(TxState {
                snapshot,
                ops: Vec::new(),
                open: true,
            })),
            guard,
        })
    }

    /// Returns the number of staged log ops.
    #[must_use]
    pub fn pending_ops(&self) -> usize {
        self.state.lock().ops.len()
    }
}

impl KvReadTx for WriteTransaction {
    type Cursor = Cursor;

    fn cursor(&self, bucket: &str) -> KvResult<Cursor> {
        let state = self.state.lock();
        state.ensure_open()?;
        let data = state.snapshot.bucket(bucket)?;
        Ok(Cursor::new(Arc::clone(&data.records)))
    }

    fn bucket_info(&self, bucket: &str) -> KvResult<Option<BucketInfo>> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.snapshot.info(bucket))
    }

    fn sequence(&self, bucket: &str) -> KvResult<u64> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.snapshot.bucket(bucket)?.sequence)
    }

    fn catalog(&self) -> KvResult<BucketCatalog> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(state.snapshot.catalog())
    }

    fn rollback(self) {}
}

impl KvWriteTx for WriteTransaction {
    type WriteCursor = WriteCursor;

    fn create_bucket(&mut self, name: &str, flags: BucketFlags) -> KvResult<BucketInfo> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        let (info, created) = state.snapshot.create_bucket(name, flags)?;
        if created {
            state.ops.push(LogOp::CreateBucket {
                name: name.to_string(),
                flags,
            });
        }
        Ok(info)
    }

    fn rw_cursor(&mut self, bucket: &str) -> KvResult<WriteCursor> {
        let state = self.state.lock();
        state.ensure_open()?;
        let info = state
            .snapshot
            .info(bucket)
            .ok_or_else(|| KvError::bucket_not_found(bucket))?;
        Ok(WriteCursor::new(
            Arc::clone(&self.state),
            Arc::from(info.name.as_str()),
        ))
    }

    fn set_sequence(&mut self, bucket: &str, value: u64) -> KvResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.snapshot.bucket_mut(bucket)?.sequence = value;
        state.ops.push(LogOp::SetSequence {
            bucket: bucket.to_string(),
            value,
        });
        Ok(())
    }

    fn commit(self) -> KvResult<()> {
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.open = false;

        let inner = &self.guard.inner;
        if !state.ops.is_empty() {
            let batch = encode_batch(&state.ops)?;
            let mut backend = inner.backend.lock();
            backend.append(&batch)?;
            if inner.config.sync_on_commit {
                backend.sync()?;
            } else {
                backend.flush()?;
            }
            debug!(ops = state.ops.len(), bytes = batch.len(), "committed batch");
        }

        let snapshot = std::mem::take(&mut state.snapshot);
        state.ops.clear();
        *inner.snapshot.write() = Arc::new(snapshot);
        Ok(())
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        self.state.lock().open = false;
    }
}
