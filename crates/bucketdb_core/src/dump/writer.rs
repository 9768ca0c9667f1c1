use super::format::{
    DATA_END, HEADER_END, KEY_DATABASE, KEY_DUPLICATES, KEY_FORMAT, KEY_TYPE, KEY_VERSION,
    RECORD_TAG,
};
use crate::error::CoreResult;
use bucketdb_kv::{KvCursor, KvError, KvReadTx, KvStore};
use serde::Serialize;
use std::io::{self, Write};
use tracing::debug;

/// Writes buckets in dump format.
#[derive(Debug)]
pub struct DumpWriter<W> {
    out: W,
}

impl<W: Write> DumpWriter<W> {
    /// Creates a writer over `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Writes a block header.
    pub fn write_header(&mut self, bucket: &str, dup_sort: bool) -> io::Result<()> {
        writeln!(self.out, "{KEY_VERSION}=3")?;
        writeln!(self.out, "{KEY_FORMAT}=bytevalue")?;
        writeln!(self.out, "{KEY_DATABASE}={bucket}")?;
        writeln!(self.out, "{KEY_TYPE}=btree")?;
        if dup_sort {
            writeln!(self.out, "{KEY_DUPLICATES}=1")?;
        }
        writeln!(self.out, "{HEADER_END}")
    }

    /// Writes one key line and one value line.
    pub fn write_record(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        writeln!(self.out, "{RECORD_TAG}{}", hex::encode(key))?;
        writeln!(self.out, "{RECORD_TAG}{}", hex::encode(value))
    }

    /// Closes the current block.
    pub fn write_end(&mut self) -> io::Result<()> {
        writeln!(self.out, "{DATA_END}")
    }

    /// Flushes the output.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Counts from one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    /// Blocks written.
    pub buckets: u64,
    /// Records written.
    pub records: u64,
}

/// Writes `bucket` as one block and returns its record count.
pub fn export_bucket<T, W>(tx: &T, bucket: &str, out: &mut DumpWriter<W>) -> CoreResult<u64>
where
    T: KvReadTx,
    W: Write,
{
    let info = tx
        .bucket_info(bucket)?
        .ok_or_else(|| KvError::bucket_not_found(bucket))?;
    let mut cursor = tx.cursor(bucket)?;

    out.write_header(&info.name, info.is_dup_sort())?;
    let mut records = 0u64;
    let mut record = cursor.first()?;
    while let Some((key, value)) = record {
        out.write_record(&key, &value)?;
        records += 1;
        record = cursor.next()?;
    }
    out.write_end()?;

    debug!(bucket, records, "exported bucket");
    Ok(records)
}

/// Writes each named bucket, deprecated ones included.
pub fn export_buckets<T, W, N>(tx: &T, buckets: &[N], out: &mut DumpWriter<W>) -> CoreResult<ExportStats>
where
    T: KvReadTx,
    W: Write,
    N: AsRef<str>,
{
    let mut stats = ExportStats::default();
    for bucket in buckets {
        stats.records += export_bucket(tx, bucket.as_ref(), out)?;
        stats.buckets += 1;
    }
    out.flush()?;
    Ok(stats)
}

/// Writes every non-deprecated bucket of `store` in catalog order.
pub fn export_database<S, W>(store: &S, out: &mut DumpWriter<W>) -> CoreResult<ExportStats>
where
    S: KvStore,
    W: Write,
{
    let tx = store.begin_read()?;
    let buckets: Vec<String> = tx
        .catalog()?
        .iter()
        .filter(|info| !info.is_deprecated())
        .map(|info| info.name.clone())
        .collect();
    let stats = export_buckets(&tx, &buckets, out)?;
    tx.rollback();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketdb_kv::{BucketFlags, Database, KvWriteCursor, KvWriteTx};
    use bytes::Bytes;

    #[test]
    fn writes_dup_sort_block() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket("D", BucketFlags::DUP_SORT)?;
            let mut cursor = tx.rw_cursor("D")?;
            cursor.append_dup(Bytes::from_static(b"k"), Bytes::from_static(&[1]))?;
            cursor.append_dup(Bytes::from_static(b"k"), Bytes::from_static(&[2]))
        })
        .unwrap();

        let mut out = DumpWriter::new(Vec::new());
        let count = export_bucket(&db.begin_read().unwrap(), "D", &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out.into_inner()).unwrap(),
            "VERSION=3\nformat=bytevalue\ndatabase=D\ntype=btree\nduplicates=1\nHEADER=END\n 6b\n 01\n 6b\n 02\nDATA=END\n"
        );
    }

    #[test]
    fn database_export_skips_deprecated() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.create_bucket("A", BucketFlags::PLAIN)?;
            tx.create_bucket("Old", BucketFlags::PLAIN.deprecated())?;
            Ok(())
        })
        .unwrap();

        let mut out = DumpWriter::new(Vec::new());
        let stats = export_database(&db, &mut out).unwrap();
        assert_eq!(stats.buckets, 1);
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("database=A\n"));
        assert!(!text.contains("database=Old"));

        let mut out = DumpWriter::new(Vec::new());
        let stats = export_buckets(&db.begin_read().unwrap(), &["Old"], &mut out).unwrap();
        assert_eq!(stats.buckets, 1);
    }

    #[test]
    fn missing_bucket_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        let mut out = DumpWriter::new(Vec::new());
        assert!(export_bucket(&db.begin_read().unwrap(), "Nope", &mut out).is_err());
    }
}
