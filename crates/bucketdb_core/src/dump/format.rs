use crate::error::{DumpError, DumpResult};
use bucketdb_kv::Record;
use bytes::Bytes;

/// Line that closes a header block.
pub const HEADER_END: &str = "HEADER=END";

/// Line that closes a data block.
pub const DATA_END: &str = "DATA=END";

pub(crate) const KEY_VERSION: &str = "VERSION";
pub(crate) const KEY_FORMAT: &str = "format";
pub(crate) const KEY_DATABASE: &str = "database";
pub(crate) const KEY_TYPE: &str = "type";
pub(crate) const KEY_DUPLICATES: &str = "duplicates";

/// Tag written before the hex of every key and value line.
pub(crate) const RECORD_TAG: char = ' ';

/// A parsed header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpHeader {
    /// Bucket named by the `database` field.
    pub database: String,
    /// Whether `duplicates=1` was present.
    pub dup_sort: bool,
    /// Every header field in input order, `database` included.
    pub fields: Vec<(String, String)>,
}

impl DumpHeader {
    /// Returns the last value of header field `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn from_fields(fields: Vec<(String, String)>, end_line: u64) -> DumpResult<Self> {
        let mut header = Self {
            database: String::new(),
            dup_sort: false,
            fields,
        };
        header.database = header.get(KEY_DATABASE).unwrap_or_default().to_string();
        header.dup_sort = header.get(KEY_DUPLICATES) == Some("1");
        if header.database.is_empty() {
            return Err(DumpError::MissingDatabase { line: end_line });
        }
        Ok(header)
    }
}

/// One bucket's header and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpBlock {
    /// The header block.
    pub header: DumpHeader,
    /// Records in input order.
    pub records: Vec<Record>,
}

/// Splits a header line at its first `=`.
pub(crate) fn parse_header_line(line: u64, text: &str) -> DumpResult<(String, String)> {
    text.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| DumpError::MalformedHeader {
            line,
            text: text.to_string(),
        })
}

/// Decodes a tagged hex key or value line.
pub(crate) fn decode_record_line(line: u64, text: &str) -> DumpResult<Bytes> {
    let mut chars = text.chars();
    if chars.next().is_none() {
        return Err(DumpError::MalformedRecord {
            line,
            reason: "empty line has no tag".to_string(),
        });
    }
    hex::decode(chars.as_str())
        .map(Bytes::from)
        .map_err(|source| DumpError::InvalidHex { line, source })
}
