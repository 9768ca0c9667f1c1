//! # bucketdb testkit
//!
//! Test utilities for bucketdb.
//!
//! This crate provides:
//! - Temporary in-memory and on-disk databases
//! - Seeding a database from plain data and reading it back
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bucketdb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     let db = TestDatabase::memory();
//!     seed(&db, &[BucketSpec::plain("Code", vec![(b"k".to_vec(), b"v".to_vec())])]);
//!     assert_eq!(contents(&db).len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
