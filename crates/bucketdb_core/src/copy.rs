//! Bulk copy of every live bucket into a fresh database.

use crate::append::WriteSession;
use crate::cancel::Cancellation;
use crate::config::CopyConfig;
use crate::error::CoreResult;
use crate::ticker::Ticker;
use bucketdb_kv::{Database, KvConfig, KvCursor, KvReadTx, KvStore};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Counts from one copy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    /// Buckets created in the destination.
    pub buckets_copied: u64,
    /// Deprecated buckets left behind.
    pub buckets_skipped: u64,
    /// Records appended.
    pub records: u64,
    /// Intermediate commits.
    pub rotations: u64,
    /// Non-zero sequence counters carried over.
    pub sequences_migrated: u64,
}

/// Replaces whatever is at `destination_path` with a copy of the database at
/// `source_path`.
///
/// The source is opened read-only. Anything at the destination path is
/// removed first.
pub fn copy_all<C>(
    cancel: &C,
    source_path: &Path,
    destination_path: &Path,
    config: &CopyConfig,
) -> CoreResult<CopyStats>
where
    C: Cancellation + ?Sized,
{
    remove_existing(destination_path)?;

    let source = Database::open(source_path, KvConfig::read_only())?;
    let destination = Database::open(destination_path, KvConfig::new())?;
    info!(
        source = %source_path.display(),
        destination = %destination_path.display(),
        "copying database"
    );
    copy_database(cancel, &source, &destination, config)
}

fn remove_existing(path: &Path) -> io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Copies every non-deprecated bucket of `source` into `destination`.
///
/// Records are appended in source order under one write transaction that
/// is committed and reopened whenever `config.commit_interval` elapses.
/// On cancellation the open transaction is rolled back; earlier rotations
/// stay committed.
///
/// # Errors
///
/// [`crate::CoreError::OrderingViolation`] when the destination already
/// holds records that sort after the copied ones,
/// [`crate::CoreError::Interrupted`] on cancellation, and store errors.
pub fn copy_database<C, S, D>(
    cancel: &C,
    source: &S,
    destination: &D,
    config: &CopyConfig,
) -> CoreResult<CopyStats>
where
    C: Cancellation + ?Sized,
    S: KvStore,
    D: KvStore,
{
    let src = source.begin_read()?;
    let catalog = src.catalog()?;
    let mut session = WriteSession::begin(destination)?;
    let mut ticker = Ticker::new(config.commit_interval);
    let mut stats = CopyStats::default();

    for info in catalog.iter() {
        cancel.check()?;
        if info.is_deprecated() {
            debug!(bucket = %info.name, "skipping deprecated bucket");
            stats.buckets_skipped += 1;
            continue;
        }

        session.create_bucket(&info.name, info.flags)?;
        let mut dst = session.cursor(&info.name)?;
        let mut cursor = src.cursor(&info.name)?;
        let mut bucket_records = 0u64;

        let mut record = cursor.first()?;
        while let Some((key, value)) = record {
            dst.append(key.clone(), value)?;
            bucket_records += 1;
            stats.records += 1;

            cancel.check()?;
            if ticker.fired() {
                info!(
                    bucket = %info.name,
                    key = %hex::encode(&key),
                    records = stats.records,
                    "progress"
                );
                session.rotate()?;
                dst = session.cursor(&info.name)?;
            }
            record = cursor.next()?;
        }

        if config.migrate_sequences {
            let sequence = src.sequence(&info.name)?;
            if sequence != 0 {
                session.set_sequence(&info.name, sequence)?;
                stats.sequences_migrated += 1;
            }
        }

        debug!(bucket = %info.name, records = bucket_records, "copied bucket");
        stats.buckets_copied += 1;
    }

    stats.rotations = session.rotations();
    session.commit()?;
    src.rollback();

    info!(
        buckets = stats.buckets_copied,
        skipped = stats.buckets_skipped,
        records = stats.records,
        rotations = stats.rotations,
        "copy complete"
    );
    Ok(stats)
}
