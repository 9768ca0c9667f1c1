//! Import command implementation.

use bucketdb_core::{import_dump_file, CancellationToken, ImportConfig};
use std::path::Path;

/// Imports the dump at `file` into the database at `to`.
pub fn run(
    cancel: &CancellationToken,
    file: &Path,
    to: &Path,
    bucket: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ImportConfig::new();
    if let Some(bucket) = bucket {
        config = config.bucket_override(bucket);
    }

    let stats = import_dump_file(cancel, file, to, &config)?;

    println!("✓ Dump imported");
    println!("  From: {}", file.display());
    println!("  To: {}", to.display());
    println!("  Blocks: {}", stats.blocks);
    println!("  Records: {}", stats.records);
    println!("  Buckets created: {}", stats.buckets_created);

    Ok(())
}
