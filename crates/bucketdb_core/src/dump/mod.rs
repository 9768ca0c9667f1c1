//! Line-oriented text dump format.
//!
//! A dump is a sequence of blocks, one per bucket:
//!
//! ```text
//! VERSION=3
//! format=bytevalue
//! database=PlainState
//! type=btree
//! duplicates=1
//! HEADER=END
//!  6b6579
//!  76616c7565
//! DATA=END
//! ```
//!
//! Header lines are `key=value` pairs up to `HEADER=END`. Data lines
//! alternate key and value; each starts with a one-character tag followed
//! by the hex bytes. `duplicates=1` marks a duplicate-sort bucket.

mod format;
mod reader;
mod writer;

pub use format::{DumpBlock, DumpHeader, DATA_END, HEADER_END};
pub use reader::{DumpReader, MAX_LINE_LEN};
pub use writer::{export_bucket, export_buckets, export_database, DumpWriter, ExportStats};
