//! Error types for the bucketdb engines.

use bucketdb_kv::KvError;
use std::io;
use thiserror::Error;

/// Result type for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by the diff, copy, import and export engines.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store error, propagated unchanged.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// The text dump could not be parsed.
    #[error(transparent)]
    Dump(#[from] DumpError),

    /// A record did not sort strictly after the destination bucket's last
    /// record.
    #[error("ordering violation in bucket {bucket}: key {} is not past the last record", hex::encode(.key))]
    OrderingViolation {
        /// Destination bucket.
        bucket: String,
        /// The rejected key.
        key: Vec<u8>,
    },

    /// The run was cancelled.
    #[error("interrupted")]
    Interrupted,

    /// I/O error writing a report or dump.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Returns whether the run stopped because it was cancelled.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// Result type for dump parsing.
pub type DumpResult<T> = Result<T, DumpError>;

/// Text dump format errors. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Reading the input failed.
    #[error("line {line}: read failed: {source}")]
    Io {
        /// Line being read.
        line: u64,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A header line is not `key=value`.
    #[error("line {line}: malformed header line {text:?}")]
    MalformedHeader {
        /// Offending line.
        line: u64,
        /// Line contents.
        text: String,
    },

    /// The header block names no bucket.
    #[error("line {line}: header has no database name")]
    MissingDatabase {
        /// The `HEADER=END` line.
        line: u64,
    },

    /// Input ended inside a block.
    #[error("line {line}: unexpected end of input, expected {expected}")]
    Truncated {
        /// Line number of the missing line.
        line: u64,
        /// What was expected there.
        expected: &'static str,
    },

    /// A key or value line has no tag character.
    #[error("line {line}: malformed record line: {reason}")]
    MalformedRecord {
        /// Offending line.
        line: u64,
        /// What is wrong with it.
        reason: String,
    },

    /// A key or value is not valid hex.
    #[error("line {line}: invalid hex: {source}")]
    InvalidHex {
        /// Offending line.
        line: u64,
        /// Decoder error.
        #[source]
        source: hex::FromHexError,
    },
}

impl DumpError {
    /// Returns the 1-based line the error refers to.
    #[must_use]
    pub fn line(&self) -> u64 {
        match self {
            Self::Io { line, .. }
            | Self::MalformedHeader { line, .. }
            | Self::MissingDatabase { line }
            | Self::Truncated { line, .. }
            | Self::MalformedRecord { line, .. }
            | Self::InvalidHex { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_errors_pass_through_unchanged() {
        let err: CoreError = KvError::bucket_not_found("Code").into();
        assert_eq!(err.to_string(), "bucket not found: Code");
        assert!(matches!(err, CoreError::Kv(KvError::BucketNotFound { .. })));
    }

    #[test]
    fn ordering_violation_shows_hex_key() {
        let err = CoreError::OrderingViolation {
            bucket: "Code".to_string(),
            key: vec![0xab, 0x01],
        };
        assert!(err.to_string().contains("ab01"));
    }

    #[test]
    fn dump_errors_carry_line() {
        let err = DumpError::Truncated {
            line: 7,
            expected: "DATA=END",
        };
        assert_eq!(err.line(), 7);
        assert_eq!(
            err.to_string(),
            "line 7: unexpected end of input, expected DATA=END"
        );
    }
}
