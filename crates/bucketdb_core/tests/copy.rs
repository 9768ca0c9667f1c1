//! Bulk copy scenarios and properties.

use bucketdb_core::{copy_all, copy_database, Cancellation, CopyConfig, CoreError, NeverCancel};
use bucketdb_kv::{
    BucketCatalog, BucketFlags, Database, KvConfig, KvResult, KvStore, KvWriteTx,
    ReadTransaction, WriteTransaction,
};
use bucketdb_testkit::prelude::*;
use proptest::prelude::*;
use std::cell::Cell;
use std::time::Duration;

/// Fires after a fixed number of polls.
struct CancelAfter {
    remaining: Cell<u32>,
}

impl CancelAfter {
    fn new(polls: u32) -> Self {
        Self {
            remaining: Cell::new(polls),
        }
    }
}

impl Cancellation for CancelAfter {
    fn is_cancelled(&self) -> bool {
        let left = self.remaining.get();
        if left == 0 {
            return true;
        }
        self.remaining.set(left - 1);
        false
    }
}

fn rec(k: u8, v: u8) -> RawRecord {
    (vec![k], vec![v])
}

fn live(specs: &[BucketSpec]) -> Vec<BucketSpec> {
    specs
        .iter()
        .filter(|spec| !spec.flags.deprecated)
        .cloned()
        .collect()
}

#[test]
fn copy_all_replaces_destination() {
    let dbs = TempDatabases::new();
    let specs = vec![
        BucketSpec::plain("Code", vec![rec(1, 1), rec(2, 2)]).with_sequence(5),
        BucketSpec::dup_sort("PlainState", vec![rec(1, 1), rec(1, 2), rec(3, 0)]),
        BucketSpec::plain("Retired", vec![rec(9, 9)]).deprecated(),
    ];
    let source = dbs.create("chaindata", &specs);
    dbs.create("copy", &[BucketSpec::plain("Stale", vec![rec(0, 0)])]);

    let stats = copy_all(&NeverCancel, &source, &dbs.path("copy"), &CopyConfig::default()).unwrap();

    assert_eq!(stats.buckets_copied, 2);
    assert_eq!(stats.buckets_skipped, 1);
    assert_eq!(stats.records, 5);
    assert_eq!(stats.sequences_migrated, 1);
    assert_eq!(dbs.read("copy"), live(&specs));
}

#[test]
fn sequences_can_be_left_behind() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::plain("Code", vec![]).with_sequence(7)]);
    let destination = TestDatabase::memory();

    let config = CopyConfig::new().migrate_sequences(false);
    let stats = copy_database(&NeverCancel, &*source, &*destination, &config).unwrap();

    assert_eq!(stats.sequences_migrated, 0);
    assert_eq!(contents(&destination)[0].sequence, 0);
}

#[test]
fn zero_interval_rotates_after_every_record() {
    let source = TestDatabase::memory();
    seed(
        &source,
        &[BucketSpec::dup_sort("D", vec![rec(1, 1), rec(1, 2), rec(2, 1)])],
    );
    let destination = TestDatabase::memory();

    let config = CopyConfig::new().commit_interval(Duration::ZERO);
    let stats = copy_database(&NeverCancel, &*source, &*destination, &config).unwrap();

    assert_eq!(stats.rotations, 3);
    assert_eq!(contents(&destination), contents(&source));
}

#[test]
fn cancellation_keeps_rotated_work_only() {
    let source = TestDatabase::memory();
    seed(
        &source,
        &[BucketSpec::plain("A", vec![rec(1, 1), rec(2, 2), rec(3, 3), rec(4, 4)])],
    );
    let destination = TestDatabase::memory();

    // Polls: bucket boundary, then one per record. The third record is
    // appended but its poll fires, so only the first two were committed.
    let cancel = CancelAfter::new(3);
    let config = CopyConfig::new().commit_interval(Duration::ZERO);
    let err = copy_database(&cancel, &*source, &*destination, &config).unwrap_err();
    assert!(err.is_interrupted());

    let copied = contents(&destination);
    assert_eq!(copied[0].records, vec![rec(1, 1), rec(2, 2)]);

    let rerun = TestDatabase::memory();
    copy_database(&NeverCancel, &*source, &*rerun, &config).unwrap();
    assert_eq!(contents(&rerun), contents(&source));
}

#[test]
fn cancellation_without_rotation_commits_nothing() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::plain("A", vec![rec(1, 1), rec(2, 2)])]);
    let destination = TestDatabase::memory();

    let err = copy_database(
        &CancelAfter::new(2),
        &*source,
        &*destination,
        &CopyConfig::default(),
    )
    .unwrap_err();
    assert!(err.is_interrupted());
    assert!(destination.catalog().is_empty());
}

#[test]
fn existing_destination_records_cause_ordering_violation() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::plain("A", vec![rec(1, 1)])]);
    let destination = TestDatabase::memory();
    seed(&destination, &[BucketSpec::plain("A", vec![rec(5, 5)])]);

    let err = copy_database(&NeverCancel, &*source, &*destination, &CopyConfig::default())
        .unwrap_err();
    match err {
        CoreError::OrderingViolation { bucket, key } => {
            assert_eq!(bucket, "A");
            assert_eq!(key, vec![1]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(contents(&destination)[0].records, vec![rec(5, 5)]);
}

#[test]
fn conflicting_destination_flags_fail() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::dup_sort("A", vec![])]);
    let destination = TestDatabase::memory();
    seed(&destination, &[BucketSpec::plain("A", vec![])]);

    let err = copy_database(&NeverCancel, &*source, &*destination, &CopyConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Kv(bucketdb_kv::KvError::BucketExists { .. })
    ));
}

#[test]
fn source_is_opened_read_only() {
    let dbs = TempDatabases::new();
    let source = dbs.create("src", &[BucketSpec::plain("A", vec![rec(1, 1)])]);
    let _reader = Database::open(&source, KvConfig::read_only()).unwrap();

    copy_all(&NeverCancel, &source, &dbs.path("dst"), &CopyConfig::default()).unwrap();
    let copied = Database::open(&dbs.path("dst"), KvConfig::read_only()).unwrap();
    assert_eq!(copied.catalog().get("A").unwrap().flags, BucketFlags::PLAIN);
}

/// Creates a bucket every time its current catalog is asked for.
struct GrowingStore<'a> {
    db: &'a Database,
}

impl KvStore for GrowingStore<'_> {
    type ReadTx = ReadTransaction;
    type WriteTx = WriteTransaction;

    fn begin_read(&self) -> KvResult<ReadTransaction> {
        self.db.begin_read()
    }

    fn begin_write(&self) -> KvResult<WriteTransaction> {
        self.db.begin_write()
    }

    fn bucket_catalog(&self) -> KvResult<BucketCatalog> {
        self.db
            .update(|tx| tx.create_bucket("Late", BucketFlags::PLAIN).map(|_| ()))?;
        Ok(self.db.catalog())
    }
}

#[test]
fn copy_reads_catalog_from_its_snapshot() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::plain("A", vec![rec(1, 1)])]);
    let destination = TestDatabase::memory();

    let growing = GrowingStore { db: &source };
    let stats =
        copy_database(&NeverCancel, &growing, &*destination, &CopyConfig::default()).unwrap();

    assert_eq!(stats.buckets_copied, 1);
    let copied = destination.catalog();
    assert!(copied.contains("A"));
    assert!(!copied.contains("Late"));
}

#[test]
fn unbounded_commit_interval_never_rotates() {
    let source = TestDatabase::memory();
    seed(&source, &[BucketSpec::plain("A", vec![rec(1, 1), rec(2, 2)])]);
    let destination = TestDatabase::memory();

    let config = CopyConfig::new().commit_interval(Duration::from_secs(u64::MAX));
    let stats = copy_database(&NeverCancel, &*source, &*destination, &config).unwrap();

    assert_eq!(stats.rotations, 0);
    assert_eq!(contents(&destination), contents(&source));
}

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn copy_reproduces_live_buckets(specs in database_spec_strategy(5), rotate in any::<bool>()) {
        let source = TestDatabase::memory();
        seed(&source, &specs);
        let destination = TestDatabase::memory();

        let interval = if rotate { Duration::ZERO } else { Duration::from_secs(30) };
        let config = CopyConfig::new().commit_interval(interval);
        let stats = copy_database(&NeverCancel, &*source, &*destination, &config).unwrap();

        let expected = live(&specs);
        let total: usize = expected.iter().map(|s| s.records.len()).sum();
        prop_assert_eq!(stats.records, total as u64);
        prop_assert_eq!(contents(&destination), expected);
    }
}
