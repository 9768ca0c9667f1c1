//! bucketdb CLI
//!
//! Command-line tools for comparing and migrating bucketdb databases.
//!
//! # Commands
//!
//! - `compare-bucket` - Diff one bucket against a reference database
//! - `compare-states` - Diff the state buckets against a reference database
//! - `copy` - Copy every live bucket into a fresh database
//! - `import` - Load a text dump into a database
//! - `export` - Write buckets as a text dump
//! - `inspect` - List buckets and their sizes

mod commands;
mod signal;

use bucketdb_core::CoreError;
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C or SIGTERM.
const EXIT_INTERRUPTED: u8 = 130;

/// bucketdb command-line database tools.
#[derive(Parser)]
#[command(name = "bucketdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// A JSON summary.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one bucket against the reference database
    CompareBucket {
        /// Bucket to compare
        #[arg(short, long)]
        bucket: String,

        /// Reference database (defaults to <path>-copy)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Bucket name in the reference database, if different
        #[arg(long)]
        reference_bucket: Option<String>,

        /// Report progress every N compared records
        #[arg(long, default_value_t = 10_000_000)]
        progress_every: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Compare the account and contract state buckets against the reference
    CompareStates {
        /// Reference database (defaults to <path>-copy)
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// Buckets to compare instead of the state bucket list
        #[arg(short, long, value_delimiter = ',')]
        buckets: Vec<String>,

        /// Report progress every N compared records
        #[arg(long, default_value_t = 10_000_000)]
        progress_every: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Copy every non-deprecated bucket into a fresh database
    Copy {
        /// Destination database; anything there is removed first
        #[arg(short, long)]
        to: PathBuf,

        /// Seconds between intermediate commits
        #[arg(long, default_value_t = 30)]
        commit_interval_secs: u64,

        /// Do not carry bucket sequence counters over
        #[arg(long)]
        no_sequences: bool,
    },

    /// Import a text dump
    Import {
        /// Destination database (created if missing)
        #[arg(short, long)]
        to: PathBuf,

        /// Dump file to read
        #[arg(short, long)]
        file: PathBuf,

        /// Import every block into this bucket
        #[arg(short, long)]
        bucket: Option<String>,
    },

    /// Export buckets as a text dump
    Export {
        /// Output file, or `-` for stdout
        #[arg(short, long)]
        file: PathBuf,

        /// Bucket to export (repeatable); all live buckets when omitted
        #[arg(short, long)]
        bucket: Vec<String>,
    },

    /// List buckets, flags and record counts
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// `<path>-copy`, the reference database used when none is given.
fn default_reference(path: &Path) -> PathBuf {
    let mut reference = path.as_os_str().to_owned();
    reference.push("-copy");
    PathBuf::from(reference)
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cancel = signal::install();

    match cli.command {
        Commands::CompareBucket {
            bucket,
            reference,
            reference_bucket,
            progress_every,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for compare-bucket")?;
            let reference = reference.unwrap_or_else(|| default_reference(&path));
            let reference_bucket = reference_bucket.unwrap_or_else(|| bucket.clone());
            commands::compare::run_bucket(
                &cancel,
                &path,
                &bucket,
                &reference,
                &reference_bucket,
                progress_every,
                format,
            )?;
        }
        Commands::CompareStates {
            reference,
            buckets,
            progress_every,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for compare-states")?;
            let reference = reference.unwrap_or_else(|| default_reference(&path));
            commands::compare::run_states(
                &cancel,
                &path,
                &reference,
                &buckets,
                progress_every,
                format,
            )?;
        }
        Commands::Copy {
            to,
            commit_interval_secs,
            no_sequences,
        } => {
            let path = cli.path.ok_or("Database path required for copy")?;
            commands::copy::run(&cancel, &path, &to, commit_interval_secs, !no_sequences)?;
        }
        Commands::Import { to, file, bucket } => {
            commands::import::run(&cancel, &file, &to, bucket)?;
        }
        Commands::Export { file, bucket } => {
            let path = cli.path.ok_or("Database path required for export")?;
            commands::export::run(&path, &file, &bucket)?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Database path required for inspect")?;
            commands::inspect::run(&path, format)?;
        }
    }

    Ok(())
}

fn is_interrupted(err: &(dyn Error + 'static)) -> bool {
    err.downcast_ref::<CoreError>()
        .is_some_and(CoreError::is_interrupted)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_interrupted(e.as_ref()) => {
            warn!("interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
