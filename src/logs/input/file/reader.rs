// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Take};
use std::path::{Path, PathBuf};

/// A single raw line read from a log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Byte offset of the first byte of the line
    pub offset: u64,
    /// Bytes consumed from the file, including the terminator
    pub len: u64,
    /// Line content without the trailing newline (or CRLF)
    pub data: Vec<u8>,
    /// Whether the line ended with a newline
    pub terminated: bool,
}

impl Line {
    /// Offset immediately after this line
    pub fn end_offset(&self) -> u64 {
        self.offset + self.len
    }
}

/// LineReader reads newline-delimited lines from a bounded byte range of a
/// file. Bytes past the range end are never observed, even if the file keeps
/// growing while reading.
pub struct LineReader {
    path: PathBuf,
    reader: BufReader<Take<File>>,
    offset: u64,
    end: u64,
    max_line_bytes: usize,
}

impl LineReader {
    /// Open `path` and position the reader at `start`, stopping at `end`.
    pub fn open(path: impl AsRef<Path>, start: u64, end: u64) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(file, path, start, end)
    }

    /// Read from an already open handle to `path`.
    pub fn new(mut file: File, path: impl AsRef<Path>, start: u64, end: u64) -> io::Result<Self> {
        let end = end.max(start);
        file.seek(SeekFrom::Start(start))?;

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            reader: BufReader::new(file.take(end - start)),
            offset: start,
            end,
            max_line_bytes: usize::MAX,
        })
    }

    /// Keep at most `max` bytes of each line. The rest of a longer line is
    /// still consumed and counted in [`Line::len`].
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset of the next byte to be read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the whole range has been consumed
    pub fn is_eof(&self) -> bool {
        self.offset >= self.end
    }

    /// Read the next line, or `None` at the end of the range.
    pub fn next_line(&mut self) -> io::Result<Option<Line>> {
        let mut buf = Vec::new();
        let mut read = 0usize;
        let mut content = 0usize;
        let mut terminated = false;

        while !terminated {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                break;
            }

            let (chunk, used) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => {
                    terminated = true;
                    (&available[..i], i + 1)
                }
                None => (available, available.len()),
            };

            let room = self.max_line_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            content += chunk.len();

            self.reader.consume(used);
            read += used;
        }

        if read == 0 {
            return Ok(None);
        }

        let offset = self.offset;
        self.offset += read as u64;

        // A cut line has no CR left to strip
        if terminated && content == buf.len() && buf.last() == Some(&b'\r') {
            buf.pop();
        }

        Ok(Some(Line {
            offset,
            len: read as u64,
            data: buf,
            terminated,
        }))
    }
}

impl Iterator for LineReader {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
