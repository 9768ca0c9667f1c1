//! Bucket comparison by merge join.
//!
//! Two cursors walk the same logical bucket in two databases in ascending
//! key order. Each step classifies the smaller key as missing on the other
//! side, or, when both sides are on the same key, compares the values. Memory
//! use is two cursors regardless of bucket size.

use crate::cancel::Cancellation;
use crate::config::DiffConfig;
use crate::error::CoreResult;
use bucketdb_kv::{Database, KvConfig, KvCursor, KvReadTx};
use bytes::Bytes;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Buckets holding account and contract state, compared by
/// [`compare_states`].
pub const STATE_BUCKETS: &[&str] = &[
    "HashedAccount",
    "HashedStorage",
    "HashedCodeHash",
    "PlainState",
    "AccountChangeSet",
    "StorageChangeSet",
    "PlainCodeHash",
    "IncarnationMap",
    "Code",
    "TrieAccount",
    "TrieStorage",
    "AccountHistory",
    "StorageHistory",
    "BlockTransactionLookup",
    "TEVMCode",
];

/// One difference between the left ("db") and right ("refDB") bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffEntry {
    /// The record exists only on the right: `(key, value)`.
    MissingInLeft(Bytes, Bytes),
    /// The record exists only on the left: `(key, value)`.
    MissingInRight(Bytes, Bytes),
    /// Both sides hold the key with different values:
    /// `(key, left value, right value)`.
    ValueMismatch(Bytes, Bytes, Bytes),
}

impl DiffEntry {
    /// Returns the key the entry is about.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        match self {
            Self::MissingInLeft(key, _)
            | Self::MissingInRight(key, _)
            | Self::ValueMismatch(key, _, _) => key,
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInLeft(key, value) => {
                write!(f, "Missing in db: {} [{}]", hex::encode(key), hex::encode(value))
            }
            Self::MissingInRight(key, value) => {
                write!(f, "Missing refDB: {} [{}]", hex::encode(key), hex::encode(value))
            }
            Self::ValueMismatch(key, left, right) => write!(
                f,
                "Different values for {}. db: [{}], refDB: [{}]",
                hex::encode(key),
                hex::encode(left),
                hex::encode(right)
            ),
        }
    }
}

/// Receives diff output.
pub trait DiffSink {
    /// Called before the entries of each bucket in a multi-bucket run.
    fn bucket(&mut self, _name: &str) -> CoreResult<()> {
        Ok(())
    }

    /// Called once per difference, in ascending key order.
    fn entry(&mut self, entry: DiffEntry) -> CoreResult<()>;

    /// Called every `progress_every` processed records.
    fn progress(&mut self, _processed: u64) -> CoreResult<()> {
        Ok(())
    }
}

impl DiffSink for Vec<DiffEntry> {
    fn entry(&mut self, entry: DiffEntry) -> CoreResult<()> {
        self.push(entry);
        Ok(())
    }
}

impl<K: DiffSink + ?Sized> DiffSink for &mut K {
    fn bucket(&mut self, name: &str) -> CoreResult<()> {
        (**self).bucket(name)
    }

    fn entry(&mut self, entry: DiffEntry) -> CoreResult<()> {
        (**self).entry(entry)
    }

    fn progress(&mut self, processed: u64) -> CoreResult<()> {
        (**self).progress(processed)
    }
}

/// Writes a line-per-entry text report.
#[derive(Debug)]
pub struct TextReport<W> {
    out: W,
}

impl<W: Write> TextReport<W> {
    /// Creates a report writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DiffSink for TextReport<W> {
    fn bucket(&mut self, name: &str) -> CoreResult<()> {
        writeln!(self.out, "\nBucket: {name}")?;
        Ok(())
    }

    fn entry(&mut self, entry: DiffEntry) -> CoreResult<()> {
        writeln!(self.out, "{entry}")?;
        Ok(())
    }

    fn progress(&mut self, processed: u64) -> CoreResult<()> {
        writeln!(self.out, "Compared {processed} records")?;
        Ok(())
    }
}

/// Counts from one comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Merge-join steps taken.
    pub processed: u64,
    /// Records only on the right.
    pub missing_in_left: u64,
    /// Records only on the left.
    pub missing_in_right: u64,
    /// Keys on both sides with different values.
    pub mismatched: u64,
}

impl DiffSummary {
    /// Total number of reported differences.
    #[must_use]
    pub fn differences(&self) -> u64 {
        self.missing_in_left + self.missing_in_right + self.mismatched
    }

    /// Returns whether the compared buckets were equal.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.differences() == 0
    }

    fn record(&mut self, entry: &DiffEntry) {
        match entry {
            DiffEntry::MissingInLeft(..) => self.missing_in_left += 1,
            DiffEntry::MissingInRight(..) => self.missing_in_right += 1,
            DiffEntry::ValueMismatch(..) => self.mismatched += 1,
        }
    }

    fn absorb(&mut self, other: &Self) {
        self.processed += other.processed;
        self.missing_in_left += other.missing_in_left;
        self.missing_in_right += other.missing_in_right;
        self.mismatched += other.mismatched;
    }
}

/// Compares `left_bucket` in `left` against `right_bucket` in `right`.
///
/// Entries reach `sink` in ascending key order. Cancellation is polled every
/// `config.progress_every` steps; entries emitted before an interruption stay
/// in the sink.
///
/// # Errors
///
/// `BucketNotFound` (as [`crate::CoreError::Kv`]) when either bucket is missing,
/// [`crate::CoreError::Interrupted`] on cancellation, and any cursor or sink error.
pub fn compare_buckets<L, R, C, K>(
    cancel: &C,
    left: &L,
    left_bucket: &str,
    right: &R,
    right_bucket: &str,
    config: &DiffConfig,
    sink: &mut K,
) -> CoreResult<DiffSummary>
where
    L: KvReadTx,
    R: KvReadTx,
    C: Cancellation + ?Sized,
    K: DiffSink + ?Sized,
{
    let every = config.progress_every.max(1);
    let mut summary = DiffSummary::default();

    let mut left_cursor = left.cursor(left_bucket)?;
    let mut right_cursor = right.cursor(right_bucket)?;
    let mut l = left_cursor.first()?;
    let mut r = right_cursor.first()?;

    while l.is_some() || r.is_some() {
        summary.processed += 1;
        if summary.processed % every == 0 {
            cancel.check()?;
            sink.progress(summary.processed)?;
        }

        let entry = match (l.take(), r.take()) {
            (None, Some((key, value))) => {
                r = right_cursor.next()?;
                Some(DiffEntry::MissingInLeft(key, value))
            }
            (Some((key, value)), None) => {
                l = left_cursor.next()?;
                Some(DiffEntry::MissingInRight(key, value))
            }
            (Some(left_record), Some(right_record)) => match left_record.0.cmp(&right_record.0) {
                Ordering::Less => {
                    r = Some(right_record);
                    l = left_cursor.next()?;
                    Some(DiffEntry::MissingInRight(left_record.0, left_record.1))
                }
                Ordering::Greater => {
                    l = Some(left_record);
                    r = right_cursor.next()?;
                    Some(DiffEntry::MissingInLeft(right_record.0, right_record.1))
                }
                Ordering::Equal => {
                    l = left_cursor.next()?;
                    r = right_cursor.next()?;
                    (left_record.1 != right_record.1).then(|| {
                        DiffEntry::ValueMismatch(left_record.0, left_record.1, right_record.1)
                    })
                }
            },
            (None, None) => None,
        };

        if let Some(entry) = entry {
            summary.record(&entry);
            sink.entry(entry)?;
        }
    }

    debug!(
        left_bucket,
        right_bucket,
        processed = summary.processed,
        differences = summary.differences(),
        "compared buckets"
    );
    Ok(summary)
}

/// Compares each bucket of `buckets` (same name on both sides), announcing
/// it to the sink first.
pub fn compare_states<L, R, C, K, N>(
    cancel: &C,
    left: &L,
    right: &R,
    buckets: &[N],
    config: &DiffConfig,
    sink: &mut K,
) -> CoreResult<DiffSummary>
where
    L: KvReadTx,
    R: KvReadTx,
    C: Cancellation + ?Sized,
    K: DiffSink + ?Sized,
    N: AsRef<str>,
{
    let mut total = DiffSummary::default();
    for bucket in buckets {
        let bucket = bucket.as_ref();
        sink.bucket(bucket)?;
        let summary = compare_buckets(cancel, left, bucket, right, bucket, config, sink)?;
        total.absorb(&summary);
    }
    Ok(total)
}

fn open_read_only(path: &Path) -> CoreResult<Database> {
    Ok(Database::open(path, KvConfig::read_only())?)
}

/// Opens both databases read-only and compares one bucket.
pub fn compare_bucket_between_databases<C, K>(
    cancel: &C,
    db_path: &Path,
    reference_path: &Path,
    bucket: &str,
    config: &DiffConfig,
    sink: &mut K,
) -> CoreResult<DiffSummary>
where
    C: Cancellation + ?Sized,
    K: DiffSink + ?Sized,
{
    compare_bucket_pair_between_databases(
        cancel,
        db_path,
        bucket,
        reference_path,
        bucket,
        config,
        sink,
    )
}

/// Like [`compare_bucket_between_databases`] with a different bucket name on
/// the reference side.
pub fn compare_bucket_pair_between_databases<C, K>(
    cancel: &C,
    db_path: &Path,
    bucket: &str,
    reference_path: &Path,
    reference_bucket: &str,
    config: &DiffConfig,
    sink: &mut K,
) -> CoreResult<DiffSummary>
where
    C: Cancellation + ?Sized,
    K: DiffSink + ?Sized,
{
    let db = open_read_only(db_path)?;
    let reference = open_read_only(reference_path)?;
    let left = db.begin_read()?;
    let right = reference.begin_read()?;

    info!(
        db = %db_path.display(),
        reference = %reference_path.display(),
        bucket,
        reference_bucket,
        "comparing bucket"
    );
    let summary = compare_buckets(
        cancel,
        &left,
        bucket,
        &right,
        reference_bucket,
        config,
        sink,
    )?;
    left.rollback();
    right.rollback();
    Ok(summary)
}

/// Opens both databases read-only and runs [`compare_states`].
pub fn compare_states_between_databases<C, K, N>(
    cancel: &C,
    db_path: &Path,
    reference_path: &Path,
    buckets: &[N],
    config: &DiffConfig,
    sink: &mut K,
) -> CoreResult<DiffSummary>
where
    C: Cancellation + ?Sized,
    K: DiffSink + ?Sized,
    N: AsRef<str>,
{
    let db = open_read_only(db_path)?;
    let reference = open_read_only(reference_path)?;
    let left = db.begin_read()?;
    let right = reference.begin_read()?;

    info!(
        db = %db_path.display(),
        reference = %reference_path.display(),
        buckets = buckets.len(),
        "comparing state buckets"
    );
    let summary = compare_states(cancel, &left, &right, buckets, config, sink)?;
    left.rollback();
    right.rollback();
    Ok(summary)
}
