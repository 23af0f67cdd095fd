// SPDX-License-Identifier: Apache-2.0

//! JSON file-based persistence with atomic writes.
//!
//! Writes go to a uniquely named temp file in the target directory, are
//! synced to disk, then renamed over the target. Readers therefore observe
//! either the previous document or the new one, never a partial write.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::logs::error::{Error, Result};

/// A single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. A missing file is `Ok(None)`; malformed JSON is
    /// reported as `Error::Json` so callers can decide how to recover.
    pub fn read(&self) -> Result<Option<serde_json::Value>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::transient(&self.path, e)),
        };
        let value = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(value))
    }

    /// Replace the document atomically. Returns only once the new content is
    /// durable.
    pub fn write<T: Serialize>(&self, state: &T) -> Result<()> {
        atomic_write(&self.path, state)
    }

    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Persistence(format!(
                "failed to remove {:?}: {}",
                self.path, e
            ))),
        }
    }
}

/// Write state to file atomically (write to temp, sync, then rename)
fn atomic_write<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    use portable_atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Persistence(format!("failed to create parent directory: {}", e))
            })?;
        }
    }

    // Process ID plus counter keeps concurrent writers off each other's temp file
    let unique_id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let temp_path = path.with_extension(format!("tmp.{}.{}", std::process::id(), unique_id));

    let result = write_and_sync(&temp_path, state).and_then(|_| {
        fs::rename(&temp_path, path)
            .map_err(|e| Error::Persistence(format!("failed to rename state file: {}", e)))
    });
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
        return result;
    }

    sync_parent_dir(path)
}

fn write_and_sync<T: Serialize>(temp_path: &Path, state: &T) -> Result<()> {
    let file = File::create(temp_path)
        .map_err(|e| Error::Persistence(format!("failed to create temp file: {}", e)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, state)
        .map_err(|e| Error::Persistence(format!("failed to write state: {}", e)))?;
    writer
        .flush()
        .map_err(|e| Error::Persistence(format!("failed to flush state: {}", e)))?;

    let file = writer
        .into_inner()
        .map_err(|e| Error::Persistence(format!("failed to flush state: {}", e.error())))?;
    file.sync_all()
        .map_err(|e| Error::Persistence(format!("failed to sync state: {}", e)))?;
    Ok(())
}

/// Make the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    File::open(parent)
        .and_then(|dir| dir.sync_all())
        .map_err(|e| Error::Persistence(format!("failed to sync directory {:?}: {}", parent, e)))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
