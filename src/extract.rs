//! Streaming record extraction
//!
//! Carves complete records out of a large concatenated-XML file one line at a time.
//! A record starts at a line beginning with the start tag and ends at a line equal to
//! the end tag. Only the record being assembled is buffered, so files far larger than
//! memory can be processed.
//!
//! Records are not validated beyond tag matching. A record still open when the stream
//! ends (no end tag) is dropped without an error, and a start tag seen while a record
//! is open discards the open record and starts a new one.

use std::io::{self, BufRead};

use serde::{Deserialize, Serialize};

/// Start and end sentinels of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTags {
    /// Prefix of the line that opens a record, e.g. `<lei:LEIRecord`
    pub start: String,
    /// The full line that closes a record, e.g. `</lei:LEIRecord>`
    pub end: String,
}

impl RecordTags {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// GLEIF level 1 entity records
    pub fn lei_records() -> Self {
        Self::new("<lei:LEIRecord", "</lei:LEIRecord>")
    }

    /// GLEIF level 2 relationship records
    pub fn relationship_records() -> Self {
        Self::new("<rr:RelationshipRecord", "</rr:RelationshipRecord>")
    }
}

/// One record's bytes, from the start line through the end line inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordBlock {
    /// 1-based line number of the start tag
    pub line: usize,
    pub data: Vec<u8>,
}

impl RawRecordBlock {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Lines of the block without line terminators
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.data
            .split_inclusive(|b| *b == b'\n')
            .map(strip_line_ending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating,
}

/// Lazy, forward-only sequence of [`RawRecordBlock`]s read from a stream
pub struct RecordExtractor<R> {
    reader: R,
    tags: RecordTags,
    state: State,
    block: Vec<u8>,
    block_line: usize,
    line_no: usize,
    line: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> RecordExtractor<R> {
    pub fn new(reader: R, tags: RecordTags) -> Self {
        Self {
            reader,
            tags,
            state: State::Idle,
            block: Vec::new(),
            block_line: 0,
            line_no: 0,
            line: Vec::new(),
            finished: false,
        }
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> usize {
        self.line_no
    }

    fn next_block(&mut self) -> io::Result<Option<RawRecordBlock>> {
        let start = self.tags.start.as_bytes();
        let end = self.tags.end.as_bytes();

        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                if self.state == State::Accumulating {
                    tracing::debug!(
                        line = self.block_line,
                        bytes = self.block.len(),
                        "Dropping unterminated record at end of stream"
                    );
                }
                self.state = State::Idle;
                self.block.clear();
                return Ok(None);
            }
            self.line_no += 1;

            if self.line.starts_with(start) {
                if self.state == State::Accumulating {
                    tracing::debug!(line = self.block_line, "Discarding record without end tag");
                }
                self.block.clear();
                self.block.extend_from_slice(&self.line);
                self.block_line = self.line_no;
                self.state = State::Accumulating;
                if strip_line_ending(&self.line) == end {
                    return Ok(Some(self.take_block()));
                }
                continue;
            }

            if self.state == State::Idle {
                continue;
            }

            self.block.extend_from_slice(&self.line);
            if strip_line_ending(&self.line) == end {
                return Ok(Some(self.take_block()));
            }
        }
    }

    fn take_block(&mut self) -> RawRecordBlock {
        self.state = State::Idle;
        RawRecordBlock {
            line: self.block_line,
            data: std::mem::take(&mut self.block),
        }
    }
}

impl<R: BufRead> Iterator for RecordExtractor<R> {
    type Item = io::Result<RawRecordBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Extract records of one type from a stream
pub fn extract<R: BufRead>(reader: R, tags: RecordTags) -> RecordExtractor<R> {
    RecordExtractor::new(reader, tags)
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
