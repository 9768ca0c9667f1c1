//! compare-bucket and compare-states.

use crate::OutputFormat;
use bucketdb_core::{
    compare_bucket_pair_between_databases, compare_states_between_databases, CancellationToken,
    CoreResult, DiffConfig, DiffEntry, DiffSink, DiffSummary, TextReport, STATE_BUCKETS,
};
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Drops every entry; the summary carries the counts.
struct Discard;

impl DiffSink for Discard {
    fn entry(&mut self, _entry: DiffEntry) -> CoreResult<()> {
        Ok(())
    }
}

/// Compares `bucket` in `path` with `reference_bucket` in `reference`.
pub fn run_bucket(
    cancel: &CancellationToken,
    path: &Path,
    bucket: &str,
    reference: &Path,
    reference_bucket: &str,
    progress_every: u64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = DiffConfig::new().progress_every(progress_every);
    let summary = match format {
        OutputFormat::Text => {
            let stdout = io::stdout();
            let mut report = TextReport::new(io::BufWriter::new(stdout.lock()));
            let summary = compare_bucket_pair_between_databases(
                cancel,
                path,
                bucket,
                reference,
                reference_bucket,
                &config,
                &mut report,
            );
            report.into_inner().flush()?;
            summary?
        }
        OutputFormat::Json => compare_bucket_pair_between_databases(
            cancel,
            path,
            bucket,
            reference,
            reference_bucket,
            &config,
            &mut Discard,
        )?,
    };
    finish(summary, format)
}

/// Compares the state buckets, or `buckets` when not empty.
pub fn run_states(
    cancel: &CancellationToken,
    path: &Path,
    reference: &Path,
    buckets: &[String],
    progress_every: u64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = DiffConfig::new().progress_every(progress_every);
    let names: Vec<&str> = if buckets.is_empty() {
        STATE_BUCKETS.to_vec()
    } else {
        buckets.iter().map(String::as_str).collect()
    };

    let summary = match format {
        OutputFormat::Text => {
            let stdout = io::stdout();
            let mut report = TextReport::new(io::BufWriter::new(stdout.lock()));
            let summary = compare_states_between_databases(
                cancel, path, reference, &names, &config, &mut report,
            );
            report.into_inner().flush()?;
            summary?
        }
        OutputFormat::Json => compare_states_between_databases(
            cancel,
            path,
            reference,
            &names,
            &config,
            &mut Discard,
        )?,
    };
    finish(summary, format)
}

fn finish(summary: DiffSummary, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => info!(
            processed = summary.processed,
            missing_in_db = summary.missing_in_left,
            missing_in_reference = summary.missing_in_right,
            mismatched = summary.mismatched,
            "comparison finished"
        ),
    }
    Ok(())
}
