//! Commit log: checksummed write batches replayed on open.
//!
//! ## Record Format
//!
//! ```text
//! | magic (4) | version (2) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The checksum covers magic through payload.
//! One record holds every write of one committed transaction:
//!
//! ```text
//! payload  = op_count (4) | op*
//! op       = 1 | name | flags (1)                      create bucket
//!          | 2 | name | key_len (4) | key | val_len (4) | val   append
//!          | 3 | name | sequence (8)                   set sequence
//! name     = len (1) | utf-8 bytes
//! ```
//!
//! ## Recovery Policy
//!
//! - A trailing record cut short (header or body past end of log) is a torn
//!   write from a crash before the commit finished. It is dropped, and cut
//!   off the backend when the database is writable.
//! - Bad magic, an unknown version or op code, a checksum mismatch or a batch
//!   that does not apply cleanly is corruption and fails the open.

use crate::catalog::{validate_bucket_name, BucketFlags};
use crate::error::{KvError, KvResult};
use bucketdb_storage::StorageBackend;
use bytes::Bytes;
use std::sync::Arc;
use tracing::warn;

/// Magic bytes opening every log record.
pub const LOG_MAGIC: [u8; 4] = *b"BKTL";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2 + 4;
const CRC_SIZE: usize = 4;

const OP_CREATE_BUCKET: u8 = 1;
const OP_APPEND: u8 = 2;
const OP_SET_SEQUENCE: u8 = 3;

/// One logged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogOp {
    CreateBucket {
        name: String,
        flags: BucketFlags,
    },
    Append {
        bucket: Arc<str>,
        key: Bytes,
        value: Bytes,
    },
    SetSequence {
        bucket: String,
        value: u64,
    },
}

/// Outcome of replaying a log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplayStats {
    /// Batches applied.
    pub batches: u64,
    /// Ops applied.
    pub ops: u64,
    /// Bytes of torn tail discarded.
    pub discarded_bytes: u64,
}

/// Frames `ops` as one log record.
pub(crate) fn encode_batch(ops: &[LogOp]) -> KvResult<Vec<u8>> {
    let mut payload = Vec::new();
    put_u32(&mut payload, ops.len(), "op count")?;
    for op in ops {
        match op {
            LogOp::CreateBucket { name, flags } => {
                payload.push(OP_CREATE_BUCKET);
                put_name(&mut payload, name)?;
                payload.push(flags.to_byte());
            }
            LogOp::Append { bucket, key, value } => {
                payload.push(OP_APPEND);
                put_name(&mut payload, bucket)?;
                put_u32(&mut payload, key.len(), "key length")?;
                payload.extend_from_slice(key);
                put_u32(&mut payload, value.len(), "value length")?;
                payload.extend_from_slice(value);
            }
            LogOp::SetSequence { bucket, value } => {
                payload.push(OP_SET_SEQUENCE);
                put_name(&mut payload, bucket)?;
                payload.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    let mut record = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    record.extend_from_slice(&LOG_MAGIC);
    record.extend_from_slice(&LOG_VERSION.to_le_bytes());
    put_u32(&mut record, payload.len(), "batch size")?;
    record.extend_from_slice(&payload);
    let crc = crc32fast::hash(&record);
    record.extend_from_slice(&crc.to_le_bytes());
    Ok(record)
}

fn put_u32(buf: &mut Vec<u8>, len: usize, what: &str) -> KvResult<()> {
    let value = u32::try_from(len).map_err(|_| KvError::BatchTooLarge {
        what: what.to_string(),
        size: len,
    })?;
    buf.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

fn put_name(buf: &mut Vec<u8>, name: &str) -> KvResult<()> {
    validate_bucket_name(name)?;
    // validated names fit in one length byte
    buf.push(name.len() as u8);
    buf.extend_from_slice(name.as_bytes());
    Ok(())
}

/// Bounds-checked reader over one record payload.
struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
    offset: u64,
}

impl<'a> PayloadReader<'a> {
    fn take(&mut self, len: usize) -> KvResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.buf.len());
        let Some(end) = end else {
            return Err(KvError::corrupted(self.offset, "unexpected end of batch"));
        };
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> KvResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> KvResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> KvResult<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn name(&mut self) -> KvResult<String> {
        let len = usize::from(self.u8()?);
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| KvError::corrupted(self.offset, "bucket name is not UTF-8"))
    }

    fn bytes(&mut self) -> KvResult<Bytes> {
        let len = self.u32()? as usize;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }
}

/// Decodes the ops of one record payload.
pub(crate) fn decode_payload(offset: u64, payload: &[u8]) -> KvResult<Vec<LogOp>> {
    let mut reader = PayloadReader {
        buf: payload,
        pos: 0,
        offset,
    };
    let count = reader.u32()? as usize;
    let mut ops = Vec::with_capacity(count.min(4096));
    let mut last_bucket: Option<Arc<str>> = None;

    for _ in 0..count {
        let op = match reader.u8()? {
            OP_CREATE_BUCKET => {
                let name = reader.name()?;
                let flags = BucketFlags::from_byte(reader.u8()?)
                    .ok_or_else(|| KvError::corrupted(offset, "unknown bucket flags"))?;
                LogOp::CreateBucket { name, flags }
            }
            OP_APPEND => {
                let name = reader.name()?;
                // appends arrive in runs per bucket; share one name allocation
                let bucket = match &last_bucket {
                    Some(prev) if **prev == *name => Arc::clone(prev),
                    _ => {
                        let fresh: Arc<str> = Arc::from(name);
                        last_bucket = Some(Arc::clone(&fresh));
                        fresh
                    }
                };
                let key = reader.bytes()?;
                let value = reader.bytes()?;
                LogOp::Append { bucket, key, value }
            }
            OP_SET_SEQUENCE => {
                let bucket = reader.name()?;
                let value = reader.u64()?;
                LogOp::SetSequence { bucket, value }
            }
            other => {
                return Err(KvError::corrupted(
                    offset,
                    format!("unknown op code {other}"),
                ))
            }
        };
        ops.push(op);
    }

    if reader.pos != payload.len() {
        return Err(KvError::corrupted(
            offset,
            format!(
                "{} trailing bytes after {count} ops",
                payload.len() - reader.pos
            ),
        ));
    }
    Ok(ops)
}

/// Replays every committed batch in `backend`, feeding ops to `apply`.
///
/// A torn trailing record is discarded, and truncated away unless
/// `read_only` is set.
pub(crate) fn replay<F>(
    backend: &mut dyn StorageBackend,
    read_only: bool,
    mut apply: F,
) -> KvResult<ReplayStats>
where
    F: FnMut(LogOp) -> KvResult<()>,
{
    let size = backend.size()?;
    let mut stats = ReplayStats::default();
    let mut offset = 0u64;

    while offset < size {
        let remaining = size - offset;
        if remaining < HEADER_SIZE as u64 {
            break;
        }

        let header = backend.read_at(offset, HEADER_SIZE)?;
        if header[0..4] != LOG_MAGIC {
            return Err(KvError::corrupted(offset, "bad record magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != LOG_VERSION {
            return Err(KvError::corrupted(
                offset,
                format!("unsupported log version {version}"),
            ));
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as u64;
        let total = HEADER_SIZE as u64 + len + CRC_SIZE as u64;
        if remaining < total {
            break;
        }

        let record = backend.read_at(offset, total as usize)?;
        let body_end = record.len() - CRC_SIZE;
        let stored = u32::from_le_bytes([
            record[body_end],
            record[body_end + 1],
            record[body_end + 2],
            record[body_end + 3],
        ]);
        let actual = crc32fast::hash(&record[..body_end]);
        if stored != actual {
            return Err(KvError::corrupted(
                offset,
                format!("checksum mismatch: expected {stored:08x}, got {actual:08x}"),
            ));
        }

        for op in decode_payload(offset, &record[HEADER_SIZE..body_end])? {
            apply(op).map_err(|e| KvError::corrupted(offset, e.to_string()))?;
            stats.ops += 1;
        }
        stats.batches += 1;
        offset += total;
    }

    if offset < size {
        stats.discarded_bytes = size - offset;
        warn!(
            offset,
            discarded = stats.discarded_bytes,
            "discarding torn commit log tail"
        );
        if !read_only {
            backend.truncate(offset)?;
        }
    }

    Ok(stats)
}
