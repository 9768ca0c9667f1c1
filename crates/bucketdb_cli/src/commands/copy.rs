//! Copy command implementation.

use bucketdb_core::{copy_all, CancellationToken, CopyConfig};
use std::path::Path;
use std::time::Duration;

/// Copies the database at `path` into a fresh database at `to`.
pub fn run(
    cancel: &CancellationToken,
    path: &Path,
    to: &Path,
    commit_interval_secs: u64,
    migrate_sequences: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = CopyConfig::new()
        .commit_interval(Duration::from_secs(commit_interval_secs))
        .migrate_sequences(migrate_sequences);

    let stats = copy_all(cancel, path, to, &config)?;

    println!("✓ Database copied");
    println!("  From: {}", path.display());
    println!("  To: {}", to.display());
    println!("  Buckets: {} ({} deprecated skipped)", stats.buckets_copied, stats.buckets_skipped);
    println!("  Records: {}", stats.records);
    println!("  Intermediate commits: {}", stats.rotations);
    println!("  Sequences migrated: {}", stats.sequences_migrated);

    Ok(())
}
