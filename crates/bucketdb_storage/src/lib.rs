//! # bucketdb storage
//!
//! Byte-level backends that hold a bucketdb commit log.
//!
//! A backend is an **opaque append-only byte store**. It knows nothing about
//! buckets, records or log framing; `bucketdb_kv` owns all interpretation of
//! the bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - shared in-process buffer, used by tests and
//!   throwaway databases
//! - [`FileBackend`] - a single file on disk
//!
//! ## Example
//!
//! ```rust
//! use bucketdb_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"batch").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"batch");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
