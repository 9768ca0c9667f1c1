//! Read and append cursors.

use crate::error::{KvError, KvResult};
use crate::state::Records;
use crate::traits::{KvCursor, KvWriteCursor, Record};
use crate::transaction::TxState;
use bytes::Bytes;
use parking_lot::Mutex;
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Position {
    Unpositioned,
    At { key: Bytes, index: usize },
    End,
}

/// Forward cursor over a pinned copy of one bucket.
///
/// The cursor holds its own reference to the bucket's records, so later
/// writes in the same transaction are not visible through it.
#[derive(Debug)]
pub struct Cursor {
    records: Arc<Records>,
    position: Position,
}

impl Cursor {
    pub(crate) fn new(records: Arc<Records>) -> Self {
        Self {
            records,
            position: Position::Unpositioned,
        }
    }

    fn record_at(&mut self, key: &Bytes, values: &[Bytes], index: usize) -> Option<Record> {
        let value = values.get(index)?.clone();
        self.position = Position::At {
            key: key.clone(),
            index,
        };
        Some((key.clone(), value))
    }

    fn first_entry(&mut self) -> Option<Record> {
        let records = Arc::clone(&self.records);
        match records.first_key_value() {
            Some((key, values)) => self.record_at(key, values, 0),
            None => {
                self.position = Position::End;
                None
            }
        }
    }
}

impl KvCursor for Cursor {
    fn first(&mut self) -> KvResult<Option<Record>> {
        Ok(self.first_entry())
    }

    fn next(&mut self) -> KvResult<Option<Record>> {
        let (key, index) = match &self.position {
            Position::Unpositioned => return Ok(self.first_entry()),
            Position::End => return Ok(None),
            Position::At { key, index } => (key.clone(), *index),
        };

        let records = Arc::clone(&self.records);
        if let Some(values) = records.get(&key) {
            if index + 1 < values.len() {
                return Ok(self.record_at(&key, values, index + 1));
            }
        }

        match records.range::<Bytes, _>((Excluded(&key), Unbounded)).next() {
            Some((next_key, values)) => Ok(self.record_at(next_key, values, 0)),
            None => {
                self.position = Position::End;
                Ok(None)
            }
        }
    }
}

/// Append cursor into one bucket of a write transaction.
///
/// Fails with [`KvError::TransactionClosed`] once the owning transaction
/// has committed or rolled back.
#[derive(Debug)]
pub struct WriteCursor {
    state: Arc<Mutex<TxState>>,
    bucket: Arc<str>,
}

impl WriteCursor {
    pub(crate) fn new(state: Arc<Mutex<TxState>>, bucket: Arc<str>) -> Self {
        Self { state, bucket }
    }
}

impl KvWriteCursor for WriteCursor {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn append(&mut self, key: Bytes, value: Bytes) -> KvResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(KvError::TransactionClosed);
        }
        state.append(&self.bucket, key, value, false)
    }

    fn append_dup(&mut self, key: Bytes, value: Bytes) -> KvResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(KvError::TransactionClosed);
        }
        state.append(&self.bucket, key, value, true)
    }
}
