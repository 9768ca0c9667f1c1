//! Engine configuration.

use std::time::Duration;

/// Configuration for the diff engine.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Poll cancellation and report progress every this many processed
    /// records. Zero is treated as one.
    pub progress_every: u64,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            progress_every: 10_000_000,
        }
    }
}

impl DiffConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress interval in records.
    #[must_use]
    pub const fn progress_every(mut self, records: u64) -> Self {
        self.progress_every = records;
        self
    }
}

/// Configuration for the bulk copy engine.
#[derive(Debug, Clone)]
pub struct CopyConfig {
    /// Commit and reopen the destination transaction this often.
    pub commit_interval: Duration,

    /// Carry non-zero bucket sequence counters over to the destination.
    pub migrate_sequences: bool,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            commit_interval: Duration::from_secs(30),
            migrate_sequences: true,
        }
    }
}

impl CopyConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the commit rotation interval.
    #[must_use]
    pub const fn commit_interval(mut self, interval: Duration) -> Self {
        self.commit_interval = interval;
        self
    }

    /// Sets whether sequence counters are copied.
    #[must_use]
    pub const fn migrate_sequences(mut self, value: bool) -> Self {
        self.migrate_sequences = value;
        self
    }
}

/// Configuration for the text import engine.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Log import progress this often.
    pub log_interval: Duration,

    /// Import every block into this bucket instead of the one named in its
    /// header.
    pub bucket_override: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            log_interval: Duration::from_secs(5),
            bucket_override: None,
        }
    }
}

impl ImportConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress log interval.
    #[must_use]
    pub const fn log_interval(mut self, interval: Duration) -> Self {
        self.log_interval = interval;
        self
    }

    /// Routes every block into `bucket`.
    #[must_use]
    pub fn bucket_override(mut self, bucket: impl Into<String>) -> Self {
        self.bucket_override = Some(bucket.into());
        self
    }
}
