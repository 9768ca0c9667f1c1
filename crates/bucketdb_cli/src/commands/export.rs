//! Export command implementation.

use bucketdb_core::dump::{export_buckets, export_database, DumpWriter};
use bucketdb_core::ExportStats;
use bucketdb_kv::{Database, KvConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Writes buckets of the database at `path` to `file` (`-` for stdout).
///
/// With no bucket names every live bucket is exported.
pub fn run(path: &Path, file: &Path, buckets: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(path, KvConfig::read_only())?;

    let to_stdout = file == Path::new("-");
    let out: Box<dyn Write> = if to_stdout {
        Box::new(io::stdout().lock())
    } else {
        Box::new(File::create(file)?)
    };
    let mut writer = DumpWriter::new(BufWriter::new(out));

    let stats = export(&db, buckets, &mut writer)?;
    writer.flush()?;

    if to_stdout {
        info!(buckets = stats.buckets, records = stats.records, "export complete");
    } else {
        println!("✓ Dump written");
        println!("  Path: {}", file.display());
        println!("  Buckets: {}", stats.buckets);
        println!("  Records: {}", stats.records);
    }
    Ok(())
}

fn export<W: Write>(
    db: &Database,
    buckets: &[String],
    writer: &mut DumpWriter<W>,
) -> bucketdb_core::CoreResult<ExportStats> {
    if buckets.is_empty() {
        export_database(db, writer)
    } else {
        export_buckets(&db.begin_read()?, buckets, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketdb_testkit::{BucketSpec, TempDatabases};

    #[test]
    fn exports_named_buckets_to_file() {
        let dbs = TempDatabases::new();
        let db = dbs.create(
            "db",
            &[
                BucketSpec::plain("A", vec![(vec![0xab], vec![0xcd])]),
                BucketSpec::plain("B", vec![]),
            ],
        );
        let file = dbs.path("out.txt");

        run(&db, &file, &["A".to_string()]).unwrap();

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.contains("database=A\n"));
        assert!(text.contains(" ab\n cd\n"));
        assert!(!text.contains("database=B"));
    }
}
