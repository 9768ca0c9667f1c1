//! Benchmark utilities.

use bucketdb_kv::{BucketFlags, Database, KvWriteCursor, KvWriteTx};
use bytes::Bytes;
use rand::Rng;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` ascending records with random values.
pub fn sorted_records(count: usize, value_size: usize) -> Vec<(Bytes, Bytes)> {
    (0..count as u64)
        .map(|i| {
            (
                Bytes::copy_from_slice(&i.to_be_bytes()),
                Bytes::from(random_data(value_size)),
            )
        })
        .collect()
}

/// Opens an in-memory database holding `records` in plain bucket `bucket`.
pub fn seeded_database(bucket: &str, records: &[(Bytes, Bytes)]) -> Database {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    db.update(|tx| {
        tx.create_bucket(bucket, BucketFlags::PLAIN)?;
        let mut cursor = tx.rw_cursor(bucket)?;
        for (key, value) in records {
            cursor.append(key.clone(), value.clone())?;
        }
        Ok(())
    })
    .expect("Failed to seed database");
    db
}

/// Renders `records` as a single-bucket text dump.
pub fn dump_text(bucket: &str, records: &[(Bytes, Bytes)]) -> String {
    let mut out = bucketdb_core::DumpWriter::new(Vec::new());
    out.write_header(bucket, false).expect("write to Vec");
    for (key, value) in records {
        out.write_record(key, value).expect("write to Vec");
    }
    out.write_end().expect("write to Vec");
    String::from_utf8(out.into_inner()).expect("dump is ASCII")
}
