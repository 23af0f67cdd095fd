// SPDX-License-Identifier: Apache-2.0

//! Content fingerprint: the first bytes of a file.
//!
//! Filesystems hand a freed inode to the next new file, so a `FileId` alone
//! cannot tell a recycled inode from the file it used to belong to. Log files
//! only ever grow at the end, so a file whose leading bytes no longer start
//! with the recorded ones is a different file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// Number of leading bytes captured per file
pub const FINGERPRINT_SIZE: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    first_bytes: Vec<u8>,
}

impl Fingerprint {
    /// Read up to `size` bytes from the start of `file`.
    pub fn new(file: &mut File, size: usize) -> io::Result<Self> {
        file.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::with_capacity(size);
        file.take(size as u64).read_to_end(&mut buf)?;

        Ok(Self { first_bytes: buf })
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            first_bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.first_bytes
    }

    pub fn len(&self) -> usize {
        self.first_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_bytes.is_empty()
    }

    /// Whether this fingerprint extends `other`. Empty fingerprints never match.
    pub fn starts_with(&self, other: &Fingerprint) -> bool {
        !other.is_empty() && self.first_bytes.starts_with(&other.first_bytes)
    }
}
