// SPDX-License-Identifier: Apache-2.0

//! Logical record assembly over a byte range of a log file.
//!
//! Without a start pattern every line is its own record. With one, a record
//! begins at a matching line and absorbs the continuation lines that follow.
//! Records are only produced once complete: on a file that is still being
//! written, the trailing record (and any unterminated line) is held back so a
//! checkpoint never lands in the middle of a record.

use std::io;
use std::ops::Range;

use regex::Regex;

use crate::logs::checkpoint::RecordBoundary;
use crate::logs::config::ComponentLogConfiguration;
use crate::logs::input::file::{Line, LineReader};
use crate::logs::input::LogFileIdentity;

/// A complete logical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Byte offset of the first line of the record
    pub offset: u64,
    /// Bytes covered in the file, including line terminators
    pub len: u64,
    /// Record content with lines joined by `\n`
    pub data: Vec<u8>,
    /// Number of physical lines in the record
    pub line_count: usize,
}

impl Record {
    pub fn end_offset(&self) -> u64 {
        self.offset + self.len
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn boundary(&self) -> RecordBoundary {
        RecordBoundary::new(self.offset, self.len)
    }

    fn from_line(line: Line, max_bytes: usize) -> Self {
        let mut data = line.data;
        data.truncate(max_bytes);
        Self {
            offset: line.offset,
            len: line.len,
            data,
            line_count: 1,
        }
    }

    /// Append a continuation line, or hand it back if it would overflow.
    fn push_line(&mut self, line: Line, max_bytes: usize) -> Option<Line> {
        if self.data.len() + 1 + line.data.len() > max_bytes {
            return Some(line);
        }
        self.data.push(b'\n');
        self.data.extend_from_slice(&line.data);
        self.len += line.len;
        self.line_count += 1;
        None
    }
}

/// RecordAssembler turns byte ranges into record sequences.
#[derive(Debug, Clone)]
pub struct RecordAssembler {
    start_pattern: Option<Regex>,
    max_record_bytes: usize,
}

impl RecordAssembler {
    pub fn new(start_pattern: Option<Regex>, max_record_bytes: usize) -> Self {
        Self {
            start_pattern,
            max_record_bytes: max_record_bytes.max(1),
        }
    }

    pub fn from_config(config: &ComponentLogConfiguration) -> Self {
        Self::new(
            config.multi_line_start_pattern.clone(),
            config.max_record_bytes,
        )
    }

    /// Lazily assemble the records in `range` of `file`.
    ///
    /// `closed` marks a generation that will not receive further writes, in
    /// which case the trailing record is complete at the end of the range.
    /// Fails with `NotFound` when the path no longer holds `file`.
    pub fn records(
        &self,
        file: &LogFileIdentity,
        range: Range<u64>,
        closed: bool,
    ) -> io::Result<Records> {
        let lines = LineReader::new(file.open()?, file.path(), range.start, range.end)?
            .with_max_line_bytes(self.max_record_bytes);
        Ok(Records {
            lines,
            start_pattern: self.start_pattern.clone(),
            max_record_bytes: self.max_record_bytes,
            closed,
            current: None,
            pending: None,
            done: false,
        })
    }
}

/// Iterator over the complete records of a byte range.
pub struct Records {
    lines: LineReader,
    start_pattern: Option<Regex>,
    max_record_bytes: usize,
    closed: bool,
    current: Option<Record>,
    pending: Option<Line>,
    done: bool,
}

impl Records {
    fn next_record(&mut self) -> io::Result<Option<Record>> {
        if self.done {
            return Ok(None);
        }

        loop {
            let line = match self.pending.take() {
                Some(line) => Some(line),
                None => self.lines.next_line()?,
            };

            let line = match line {
                Some(line) if line.terminated || self.closed => line,
                // End of range, or a partial line still being written
                _ => {
                    self.done = true;
                    return Ok(if self.closed { self.current.take() } else { None });
                }
            };

            let Some(pattern) = &self.start_pattern else {
                return Ok(Some(Record::from_line(line, self.max_record_bytes)));
            };

            let Some(current) = self.current.as_mut() else {
                self.current = Some(Record::from_line(line, self.max_record_bytes));
                continue;
            };

            if pattern.is_match(&String::from_utf8_lossy(&line.data)) {
                self.pending = Some(line);
                return Ok(self.current.take());
            }

            if let Some(overflow) = current.push_line(line, self.max_record_bytes) {
                let next = Record::from_line(overflow, self.max_record_bytes);
                return Ok(self.current.replace(next));
            }
        }
    }
}

impl Iterator for Records {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> LogFileIdentity {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        LogFileIdentity::stat(&path).unwrap()
    }

    fn collect(records: Records) -> Vec<Record> {
        records.collect::<io::Result<Vec<_>>>().unwrap()
    }

    fn timestamp_pattern() -> Option<Regex> {
        Some(Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap())
    }

    #[test]
    fn test_single_line_records() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "app.log", "one\ntwo\nthree\n");

        let assembler = RecordAssembler::new(None, 1024);
        let records = collect(assembler.records(&file, 0..file.size(), false).unwrap());

        let texts: Vec<_> = records.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert_eq!(records[2].end_offset(), file.size());
    }

    #[test]
    fn test_partial_line_held_back_on_active_file() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "app.log", "done\nstill writ");

        let assembler = RecordAssembler::new(None, 1024);
        let active = collect(assembler.records(&file, 0..file.size(), false).unwrap());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].end_offset(), 5);

        let closed = collect(assembler.records(&file, 0..file.size(), true).unwrap());
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[1].text(), "still writ");
        assert_eq!(closed[1].end_offset(), file.size());
    }

    #[test]
    fn test_multi_line_records() {
        let dir = TempDir::new().unwrap();
        let content = "2024-01-01 first\n  at frame 1\n  at frame 2\n2024-01-01 second\n2024-01-01 third\n  more\n";
        let file = write_file(&dir, "app.log", content);

        let assembler = RecordAssembler::new(timestamp_pattern(), 1024);
        let records = collect(assembler.records(&file, 0..file.size(), true).unwrap());

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text(), "2024-01-01 first\n  at frame 1\n  at frame 2");
        assert_eq!(records[0].line_count, 3);
        assert_eq!(records[1].offset, records[0].end_offset());
        assert_eq!(records[2].text(), "2024-01-01 third\n  more");
        assert_eq!(records[2].end_offset(), file.size());
    }

    #[test]
    fn test_trailing_multi_line_record_withheld_while_active() {
        let dir = TempDir::new().unwrap();
        let content = "2024-01-01 first\n  cont\n2024-01-01 second\n  cont\n";
        let file = write_file(&dir, "app.log", content);

        let assembler = RecordAssembler::new(timestamp_pattern(), 1024);
        let records = collect(assembler.records(&file, 0..file.size(), false).unwrap());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(), "2024-01-01 first\n  cont");
        assert_eq!(records[0].end_offset(), 24);
    }

    #[test]
    fn test_lines_before_first_start_form_a_record() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "app.log", "orphan a\norphan b\n2024-01-01 real\n");

        let assembler = RecordAssembler::new(timestamp_pattern(), 1024);
        let records = collect(assembler.records(&file, 0..file.size(), true).unwrap());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text(), "orphan a\norphan b");
        assert_eq!(records[1].text(), "2024-01-01 real");
    }

    #[test]
    fn test_restart_from_record_boundary() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "app.log", "alpha\nbeta\ngamma\n");

        let assembler = RecordAssembler::new(None, 1024);
        let records = collect(assembler.records(&file, 6..file.size(), false).unwrap());
        let texts: Vec<_> = records.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["beta", "gamma"]);
    }

    #[test]
    fn test_oversized_records_are_split_and_truncated() {
        let dir = TempDir::new().unwrap();
        let long_line = "x".repeat(40);
        let content = format!("2024-01-01 a\nbbbbbbbb\ncccccccc\n{}\n", long_line);
        let file = write_file(&dir, "app.log", &content);

        let assembler = RecordAssembler::new(timestamp_pattern(), 24);
        let records = collect(assembler.records(&file, 0..file.size(), true).unwrap());

        assert_eq!(records[0].text(), "2024-01-01 a\nbbbbbbbb");
        assert_eq!(records[1].text(), "cccccccc");
        assert_eq!(records[2].data.len(), 24);
        assert_eq!(records[2].len, 41);
        assert_eq!(records[2].end_offset(), file.size());
    }

    #[test]
    fn test_rotated_path_is_not_read_as_old_generation() {
        let dir = TempDir::new().unwrap();
        let file = write_file(&dir, "app.log", "old one\nold two\n");

        fs::rename(dir.path().join("app.log"), dir.path().join("app.log.1")).unwrap();
        fs::write(dir.path().join("app.log"), "new content that is longer\n").unwrap();

        let assembler = RecordAssembler::new(None, 1024);
        let err = assembler.records(&file, 0..file.size(), true).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
