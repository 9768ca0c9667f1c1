//! Database open configuration.

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Open without write access. Write transactions are refused and the
    /// directory lock is taken shared.
    pub read_only: bool,

    /// Create the database directory if it does not exist.
    pub create_if_missing: bool,

    /// Sync the commit log after every commit.
    pub sync_on_commit: bool,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            create_if_missing: true,
            sync_on_commit: true,
        }
    }
}

impl KvConfig {
    /// Creates a read-write configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for opening an existing database read-only.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only: true,
            create_if_missing: false,
            sync_on_commit: false,
        }
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync the log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}
