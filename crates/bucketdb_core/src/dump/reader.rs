use super::format::{
    decode_record_line, parse_header_line, DumpBlock, DumpHeader, DATA_END, HEADER_END,
};
use crate::error::{DumpError, DumpResult};
use bucketdb_kv::Record;
use std::io::{BufRead, Read};

/// Longest line, terminator excluded, that [`DumpReader::new`] accepts.
pub const MAX_LINE_LEN: usize = 256 << 20;

/// Streaming dump parser.
///
/// Call [`DumpReader::next_header`] to enter a block, then
/// [`DumpReader::next_record`] until it returns `None`.
#[derive(Debug)]
pub struct DumpReader<R> {
    input: R,
    line: u64,
    raw: Vec<u8>,
    buf: String,
    in_data: bool,
    max_line_len: usize,
}

impl<R: BufRead> DumpReader<R> {
    /// Creates a reader over `input`.
    pub fn new(input: R) -> Self {
        Self::with_max_line_len(input, MAX_LINE_LEN)
    }

    /// Creates a reader that rejects lines longer than `max_line_len` bytes.
    pub fn with_max_line_len(input: R, max_line_len: usize) -> Self {
        Self {
            input,
            line: 0,
            raw: Vec::new(),
            buf: String::new(),
            in_data: false,
            max_line_len,
        }
    }

    /// Returns the number of the last line read.
    #[must_use]
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Reads the next line into `buf` without its terminator.
    ///
    /// At most `max_line_len` plus two terminator bytes are buffered.
    fn fill(&mut self) -> DumpResult<bool> {
        self.raw.clear();
        let limit = (self.max_line_len as u64).saturating_add(2);
        let read = (&mut self.input)
            .take(limit)
            .read_until(b'\n', &mut self.raw)
            .map_err(|source| DumpError::Io {
                line: self.line + 1,
                source,
            })?;
        if read == 0 {
            return Ok(false);
        }
        self.line += 1;
        if self.raw.last() == Some(&b'\n') {
            self.raw.pop();
            if self.raw.last() == Some(&b'\r') {
                self.raw.pop();
            }
        }
        if self.raw.len() > self.max_line_len {
            return Err(DumpError::MalformedRecord {
                line: self.line,
                reason: format!("line is longer than {} bytes", self.max_line_len),
            });
        }

        let text = std::str::from_utf8(&self.raw).map_err(|_| DumpError::MalformedRecord {
            line: self.line,
            reason: "line is not valid UTF-8".to_string(),
        })?;
        self.buf.clear();
        self.buf.push_str(text);
        Ok(true)
    }

    fn truncated(&self, expected: &'static str) -> DumpError {
        DumpError::Truncated {
            line: self.line + 1,
            expected,
        }
    }

    /// Parses the next header block.
    ///
    /// Returns `None` at a clean end of input. Records left unread in the
    /// current block are skipped first.
    pub fn next_header(&mut self) -> DumpResult<Option<DumpHeader>> {
        while self.in_data {
            self.next_record()?;
        }

        loop {
            if !self.fill()? {
                return Ok(None);
            }
            if !self.buf.is_empty() {
                break;
            }
        }

        let mut fields = Vec::new();
        while self.buf != HEADER_END {
            fields.push(parse_header_line(self.line, &self.buf)?);
            if !self.fill()? {
                return Err(self.truncated(HEADER_END));
            }
        }

        let header = DumpHeader::from_fields(fields, self.line)?;
        self.in_data = true;
        Ok(Some(header))
    }

    /// Parses the next (key, value) pair of the current block.
    ///
    /// Returns `None` after `DATA=END`, or when no block is open.
    pub fn next_record(&mut self) -> DumpResult<Option<Record>> {
        if !self.in_data {
            return Ok(None);
        }

        if !self.fill()? {
            return Err(self.truncated(DATA_END));
        }
        if self.buf == DATA_END {
            self.in_data = false;
            return Ok(None);
        }
        let key = decode_record_line(self.line, &self.buf)?;

        if !self.fill()? {
            return Err(self.truncated("value line"));
        }
        if self.buf == DATA_END {
            return Err(DumpError::MalformedRecord {
                line: self.line,
                reason: "key line has no value line".to_string(),
            });
        }
        let value = decode_record_line(self.line, &self.buf)?;
        Ok(Some((key, value)))
    }

    /// Reads a whole block into memory.
    pub fn read_block(&mut self) -> DumpResult<Option<DumpBlock>> {
        let Some(header) = self.next_header()? else {
            return Ok(None);
        };
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(Some(DumpBlock { header, records }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn reader(text: &str) -> DumpReader<&[u8]> {
        DumpReader::new(text.as_bytes())
    }

    #[test]
    fn minimal_block() {
        let mut r = reader("database=X\nHEADER=END\n#61\n#01\nDATA=END\n");
        let block = r.read_block().unwrap().unwrap();
        assert_eq!(block.header.database, "X");
        assert!(!block.header.dup_sort);
        assert_eq!(
            block.records,
            vec![(Bytes::from_static(b"a"), Bytes::from_static(&[1]))]
        );
        assert!(r.read_block().unwrap().is_none());
    }

    #[test]
    fn crlf_and_leading_blank_lines() {
        let mut r = reader("\r\n\nVERSION=3\r\ndatabase=X\r\nduplicates=1\r\nHEADER=END\r\n 00\r\n 01\r\nDATA=END\r\n");
        let block = r.read_block().unwrap().unwrap();
        assert!(block.header.dup_sort);
        assert_eq!(block.header.get("VERSION"), Some("3"));
        assert_eq!(block.records.len(), 1);
    }

    #[test]
    fn several_blocks_and_missing_final_newline() {
        let mut r = reader(
            "database=A\nHEADER=END\nDATA=END\ndatabase=B\nHEADER=END\n 01\n 02\nDATA=END",
        );
        assert_eq!(r.read_block().unwrap().unwrap().records.len(), 0);
        assert_eq!(r.read_block().unwrap().unwrap().header.database, "B");
        assert!(r.read_block().unwrap().is_none());
    }

    #[test]
    fn next_header_skips_unread_records() {
        let mut r = reader("database=A\nHEADER=END\n 01\n 02\nDATA=END\ndatabase=B\nHEADER=END\nDATA=END\n");
        r.next_header().unwrap().unwrap();
        let header = r.next_header().unwrap().unwrap();
        assert_eq!(header.database, "B");
    }

    #[test]
    fn truncated_header() {
        let err = reader("database=X\n").next_header().unwrap_err();
        assert!(matches!(err, DumpError::Truncated { line: 2, expected: "HEADER=END" }));
    }

    #[test]
    fn truncated_data() {
        let mut r = reader("database=X\nHEADER=END\n 01\n 02\n");
        r.next_header().unwrap();
        r.next_record().unwrap();
        let err = r.next_record().unwrap_err();
        assert!(matches!(err, DumpError::Truncated { line: 5, .. }));
    }

    #[test]
    fn key_without_value() {
        let mut r = reader("database=X\nHEADER=END\n 01\n");
        r.next_header().unwrap();
        assert!(matches!(
            r.next_record().unwrap_err(),
            DumpError::Truncated { line: 4, expected: "value line" }
        ));

        let mut r = reader("database=X\nHEADER=END\n 01\nDATA=END\n");
        r.next_header().unwrap();
        assert!(matches!(
            r.next_record().unwrap_err(),
            DumpError::MalformedRecord { line: 4, .. }
        ));
    }

    #[test]
    fn missing_database_and_bad_header_line() {
        assert!(matches!(
            reader("VERSION=3\nHEADER=END\n").next_header().unwrap_err(),
            DumpError::MissingDatabase { line: 2 }
        ));
        assert!(matches!(
            reader("database=X\nnonsense\nHEADER=END\n").next_header().unwrap_err(),
            DumpError::MalformedHeader { line: 2, .. }
        ));
    }

    #[test]
    fn overlong_lines_are_rejected() {
        let text = "database=X\nHEADER=END\n 0102\r\n 0102030405\n";
        let mut r = DumpReader::with_max_line_len(text.as_bytes(), 10);
        r.next_header().unwrap().unwrap();
        assert!(matches!(
            r.next_record().unwrap_err(),
            DumpError::MalformedRecord { line: 4, .. }
        ));

        let endless = std::io::repeat(b'0').take(1 << 20);
        let mut r = DumpReader::with_max_line_len(std::io::BufReader::new(endless), 64);
        assert!(matches!(
            r.next_header().unwrap_err(),
            DumpError::MalformedRecord { line: 1, .. }
        ));
    }

    #[test]
    fn line_at_the_limit_is_accepted() {
        let text = "database=X\r\nHEADER=END\n 01\n 02\nDATA=END\n";
        let mut r = DumpReader::with_max_line_len(text.as_bytes(), 10);
        let block = r.read_block().unwrap().unwrap();
        assert_eq!(block.header.database, "X");
        assert_eq!(block.records.len(), 1);
    }
}
