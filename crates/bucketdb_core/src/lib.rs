//! # bucketdb core
//!
//! Store-to-store tooling for bucketdb databases.
//!
//! This crate provides:
//! - [`diff`]: merge-join comparison of a bucket across two databases
//! - [`copy`]: streaming copy of every live bucket into a fresh database
//!   with periodic commit rotation
//! - [`import`] and [`dump`]: the line-oriented text dump format
//!
//! Every engine is generic over the [`bucketdb_kv`] capability traits and
//! takes a [`Cancellation`] it polls between records.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod append;
pub mod cancel;
pub mod config;
pub mod copy;
pub mod diff;
pub mod dump;
pub mod error;
pub mod import;
mod ticker;

pub use append::{AppendCursor, AppendMode, WriteSession};
pub use cancel::{Cancellation, CancellationToken, NeverCancel};
pub use config::{CopyConfig, DiffConfig, ImportConfig};
pub use copy::{copy_all, copy_database, CopyStats};
pub use diff::{
    compare_bucket_between_databases, compare_bucket_pair_between_databases, compare_buckets,
    compare_states, compare_states_between_databases, DiffEntry, DiffSink, DiffSummary,
    TextReport, STATE_BUCKETS,
};
pub use dump::{DumpReader, DumpWriter, ExportStats};
pub use error::{CoreError, CoreResult, DumpError, DumpResult};
pub use import::{import_dump, import_dump_file, ImportStats};
