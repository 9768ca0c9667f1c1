//! Text dump import.

use crate::append::WriteSession;
use crate::cancel::Cancellation;
use crate::config::ImportConfig;
use crate::dump::DumpReader;
use crate::error::CoreResult;
use crate::ticker::Ticker;
use bucketdb_kv::{BucketFlags, Database, KvConfig, KvStore};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Counts from one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Blocks read.
    pub blocks: u64,
    /// Records appended.
    pub records: u64,
    /// Buckets that did not exist before the import.
    pub buckets_created: u64,
}

/// Imports every block of a dump into `store` in one write transaction.
///
/// An existing bucket keeps its flags; a new one is created duplicate-sort
/// when its header says `duplicates=1`. Nothing is committed unless the whole
/// input parses and every append succeeds.
pub fn import_dump<C, R, S>(
    cancel: &C,
    reader: R,
    store: &S,
    config: &ImportConfig,
) -> CoreResult<ImportStats>
where
    C: Cancellation + ?Sized,
    R: BufRead,
    S: KvStore,
{
    let mut dump = DumpReader::new(reader);
    let mut session = WriteSession::begin(store)?;
    let mut ticker = Ticker::new(config.log_interval);
    let mut stats = ImportStats::default();

    while let Some(header) = dump.next_header()? {
        let bucket = config
            .bucket_override
            .clone()
            .unwrap_or(header.database);
        let flags = if header.dup_sort {
            BucketFlags::DUP_SORT
        } else {
            BucketFlags::PLAIN
        };

        let (info, created) = session.ensure_bucket(&bucket, flags)?;
        if created {
            stats.buckets_created += 1;
        }
        let mut cursor = session.cursor(&info.name)?;

        while let Some((key, value)) = dump.next_record()? {
            cancel.check()?;
            if ticker.fired() {
                info!(
                    bucket = %info.name,
                    key = %hex::encode(&key),
                    line = dump.line(),
                    "progress"
                );
            }
            cursor.append(key, value)?;
            stats.records += 1;
        }
        stats.blocks += 1;
    }

    session.commit()?;
    info!(
        blocks = stats.blocks,
        records = stats.records,
        created = stats.buckets_created,
        "import complete"
    );
    Ok(stats)
}

/// Imports the dump file at `dump_path` into the database at
/// `destination_path`, creating it if needed.
pub fn import_dump_file<C>(
    cancel: &C,
    dump_path: &Path,
    destination_path: &Path,
    config: &ImportConfig,
) -> CoreResult<ImportStats>
where
    C: Cancellation + ?Sized,
{
    let file = File::open(dump_path)?;
    let destination = Database::open(destination_path, KvConfig::new())?;
    info!(
        dump = %dump_path.display(),
        destination = %destination_path.display(),
        "importing dump"
    );
    import_dump(cancel, BufReader::new(file), &destination, config)
}
