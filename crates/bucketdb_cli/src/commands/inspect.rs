//! Inspect command implementation.

use crate::OutputFormat;
use bucketdb_kv::{Database, KvConfig, KvCursor, KvReadTx};
use serde::Serialize;
use std::path::Path;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database path.
    pub path: String,
    /// Commit log size in bytes.
    pub log_size: u64,
    /// Per-bucket statistics in catalog order.
    pub buckets: Vec<BucketStats>,
}

/// Statistics for a single bucket.
#[derive(Debug, Serialize)]
pub struct BucketStats {
    /// Bucket name.
    pub name: String,
    /// Duplicate-sort flag.
    pub dup_sort: bool,
    /// Deprecated flag.
    pub deprecated: bool,
    /// Number of records ((key, value) pairs).
    pub records: u64,
    /// Number of distinct keys.
    pub keys: u64,
    /// Sequence counter.
    pub sequence: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let db = Database::open(path, KvConfig::read_only())?;
    let log_size = std::fs::metadata(path.join("data.log")).map_or(0, |m| m.len());
    let tx = db.begin_read()?;

    let mut buckets = Vec::new();
    for info in db.catalog().iter() {
        let mut cursor = tx.cursor(&info.name)?;
        let mut records = 0u64;
        let mut keys = 0u64;
        let mut last_key = None;
        while let Some((key, _)) = cursor.next()? {
            records += 1;
            if last_key.as_ref() != Some(&key) {
                keys += 1;
                last_key = Some(key);
            }
        }
        buckets.push(BucketStats {
            name: info.name.clone(),
            dup_sort: info.is_dup_sort(),
            deprecated: info.is_deprecated(),
            records,
            keys,
            sequence: tx.sequence(&info.name)?,
        });
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        log_size,
        buckets,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Database: {}", result.path);
    println!("  Commit log: {} bytes", result.log_size);
    println!("  Buckets: {}", result.buckets.len());
    println!();
    for bucket in &result.buckets {
        let mut flags = Vec::new();
        if bucket.dup_sort {
            flags.push("dupsort");
        }
        if bucket.deprecated {
            flags.push("deprecated");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {}{flags}", bucket.name);
        println!(
            "    records: {}, keys: {}, sequence: {}",
            bucket.records, bucket.keys, bucket.sequence
        );
    }
}
