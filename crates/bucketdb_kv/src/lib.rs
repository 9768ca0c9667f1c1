//! # bucketdb kv
//!
//! An embedded ordered key-value store made of named buckets.
//!
//! Each bucket maps byte-string keys to values in byte-lexicographic order.
//! Duplicate-sort buckets hold several sorted values per key. Writes are
//! append-only: a record must sort strictly after the bucket's last record.
//!
//! This crate provides:
//! - [`Database`] with snapshot read transactions and a single writer
//! - forward [`Cursor`]s and append-only [`WriteCursor`]s
//! - a checksummed commit log replayed on open
//! - the capability traits ([`KvStore`] and friends) the bucketdb engines
//!   are generic over

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod config;
mod cursor;
mod database;
mod dir;
mod error;
mod log;
mod state;
mod traits;
mod transaction;

pub use catalog::{BucketCatalog, BucketFlags, BucketInfo, MAX_BUCKET_NAME_LEN};
pub use config::KvConfig;
pub use cursor::{Cursor, WriteCursor};
pub use database::Database;
pub use dir::DatabaseDir;
pub use error::{KvError, KvResult};
pub use log::{LOG_MAGIC, LOG_VERSION};
pub use traits::{KvCursor, KvReadTx, KvStore, KvWriteCursor, KvWriteTx, Record};
pub use transaction::{ReadTransaction, WriteTransaction};
