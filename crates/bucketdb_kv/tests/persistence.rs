//! On-disk durability and locking.

use bucketdb_kv::{
    BucketFlags, Database, KvConfig, KvCursor, KvError, KvReadTx, KvWriteCursor, KvWriteTx,
};
use bytes::Bytes;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::tempdir;

fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

fn seed(db: &Database) {
    db.update(|tx| {
        tx.create_bucket("PlainState", BucketFlags::DUP_SORT)?;
        tx.create_bucket("Old", BucketFlags::PLAIN.deprecated())?;
        let mut cursor = tx.rw_cursor("PlainState")?;
        cursor.append_dup(b("a"), b("1"))?;
        cursor.append_dup(b("a"), b("2"))?;
        cursor.append_dup(b("b"), b("3"))?;
        tx.set_sequence("PlainState", 9)
    })
    .unwrap();
}

fn collect(db: &Database, bucket: &str) -> Vec<(Bytes, Bytes)> {
    let tx = db.begin_read().unwrap();
    let mut cursor = tx.cursor(bucket).unwrap();
    let mut out = Vec::new();
    while let Some(record) = cursor.next().unwrap() {
        out.push(record);
    }
    out
}

#[test]
fn committed_data_survives_reopen() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, KvConfig::new()).unwrap();
    seed(&db);
    drop(db);

    let db = Database::open(&path, KvConfig::read_only()).unwrap();
    let catalog = db.catalog();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.get("Old").unwrap().is_deprecated());
    assert_eq!(
        collect(&db, "PlainState"),
        vec![(b("a"), b("1")), (b("a"), b("2")), (b("b"), b("3"))]
    );
    assert_eq!(db.begin_read().unwrap().sequence("PlainState").unwrap(), 9);
}

#[test]
fn uncommitted_data_is_lost() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, KvConfig::new()).unwrap();
    seed(&db);
    {
        let mut tx = db.begin_write().unwrap();
        tx.rw_cursor("PlainState")
            .unwrap()
            .append_dup(b("c"), b("4"))
            .unwrap();
    }
    drop(db);

    let db = Database::open(&path, KvConfig::read_only()).unwrap();
    assert_eq!(collect(&db, "PlainState").len(), 3);
}

#[test]
fn torn_tail_is_discarded_on_open() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, KvConfig::new()).unwrap();
    seed(&db);
    drop(db);

    let log = path.join("data.log");
    let clean_len = std::fs::metadata(&log).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&log).unwrap();
    file.write_all(b"BKTL\x01\x00\xff").unwrap();
    drop(file);

    let db = Database::open(&path, KvConfig::new()).unwrap();
    assert_eq!(collect(&db, "PlainState").len(), 3);
    drop(db);
    assert_eq!(std::fs::metadata(&log).unwrap().len(), clean_len);
}

#[test]
fn corrupted_record_is_fatal() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("db");

    let db = Database::open(&path, KvConfig::new()).unwrap();
    seed(&db);
    drop(db);

    let log = path.join("data.log");
    let mut bytes = std::fs::read(&log).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&log, bytes).unwrap();

    let result = Database::open(&path, KvConfig::new());
    assert!(matches!(result, Err(KvError::Corrupted { .. })));
}

#[test]
fn writer_excludes_other_handles() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("db");

    let _db = Database::open(&path, KvConfig::new()).unwrap();
    assert!(matches!(
        Database::open(&path, KvConfig::read_only()),
        Err(KvError::DatabaseLocked)
    ));
}

#[test]
fn read_only_open_of_missing_database_fails() {
    let temp = tempdir().unwrap();
    let result = Database::open(&temp.path().join("absent"), KvConfig::read_only());
    assert!(matches!(result, Err(KvError::DatabaseNotFound { .. })));
}
