//! Shared setup for the bucketdb benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
