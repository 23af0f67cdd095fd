// SPDX-License-Identifier: Apache-2.0

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::file_id::FileId;
use super::fingerprint::{FINGERPRINT_SIZE, Fingerprint};

/// Point-in-time snapshot of one log file.
///
/// Every field comes from a single open handle, so id, times, size and
/// fingerprint are consistent with each other even if the path is replaced
/// right after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileIdentity {
    path: PathBuf,
    file_id: FileId,
    created: SystemTime,
    modified: SystemTime,
    size: u64,
    fingerprint: Fingerprint,
}

impl LogFileIdentity {
    /// Build an identity from explicit values, with an empty fingerprint.
    pub fn new(
        path: impl Into<PathBuf>,
        file_id: FileId,
        created: SystemTime,
        modified: SystemTime,
        size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            file_id,
            created,
            modified,
            size,
            fingerprint: Fingerprint::default(),
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Stat a path. Filesystems that do not report a birth time fall back to
    /// the modification time.
    pub fn stat(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        // Opening a FIFO for reading blocks until a writer shows up
        ensure_regular_file(path, &fs::metadata(path)?)?;

        let mut file = File::open(path)?;
        let metadata = file.metadata()?;
        ensure_regular_file(path, &metadata)?;

        let file_id = FileId::from_file(&file)?;
        let modified = metadata.modified()?;
        let created = metadata.created().unwrap_or(modified);
        let fingerprint = Fingerprint::new(&mut file, FINGERPRINT_SIZE)?;

        Ok(Self {
            path: path.to_path_buf(),
            file_id,
            created,
            modified,
            size: metadata.len(),
            fingerprint,
        })
    }

    /// Open the file this snapshot describes.
    ///
    /// Fails with `NotFound` when the path now holds another file, so bytes
    /// of a newer generation are never read under this snapshot's identity.
    pub fn open(&self) -> io::Result<File> {
        ensure_regular_file(&self.path, &fs::metadata(&self.path)?)?;

        let mut file = File::open(&self.path)?;
        let file_id = FileId::from_file(&file)?;
        if file_id != self.file_id {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!(
                    "{:?} is now file {}, expected {}",
                    self.path, file_id, self.file_id
                ),
            ));
        }

        if !self.fingerprint.is_empty() {
            let current = Fingerprint::new(&mut file, self.fingerprint.len())?;
            if !current.starts_with(&self.fingerprint) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{:?} was replaced in place", self.path),
                ));
            }
        }

        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Read the whole file as it currently exists on disk.
    pub fn read_content(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.size as usize);
        File::open(&self.path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Whether the path still refers to the same file.
    pub fn still_exists(&self) -> bool {
        FileId::from_path(&self.path)
            .map(|id| id == self.file_id)
            .unwrap_or(false)
    }
}

fn ensure_regular_file(path: &Path, metadata: &fs::Metadata) -> io::Result<()> {
    if metadata.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{:?} is not a regular file", path),
        ))
    }
}
