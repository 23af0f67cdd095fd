// SPDX-License-Identifier: Apache-2.0

//! One refresh-and-ship pass over a component's log group.
//!
//! The transport is abstracted behind `LogUploader`. A batch only advances the
//! checkpoint after the uploader acknowledged it, so a crash in between means
//! the batch is shipped again (at-least-once).

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::logs::checkpoint::CheckpointStore;
use crate::logs::config::ComponentLogConfiguration;
use crate::logs::error::{Error, Result};
use crate::logs::group::{LogFile, LogFileGroup};
use crate::logs::input::FileId;
use crate::logs::level::LogLevel;
use crate::logs::record::{Record, RecordAssembler};
use crate::logs::retention::{RetentionEnforcer, RetentionReport};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Batch rejected: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<UploadError> for Error {
    fn from(e: UploadError) -> Self {
        Error::Upload(e.to_string())
    }
}

/// Consecutive complete records from one file.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub component: String,
    /// Level filter the transport applies
    pub minimum_level: LogLevel,
    pub file_path: PathBuf,
    pub file_id: FileId,
    pub records: Vec<Record>,
    /// Offset of the first record
    pub start_offset: u64,
    /// Offset right after the last record
    pub end_offset: u64,
}

impl UploadBatch {
    pub fn bytes(&self) -> u64 {
        self.end_offset - self.start_offset
    }
}

/// Transport that ships batches to the log sink.
///
/// Called from blocking worker threads; an `Ok` return is the acknowledgment
/// that lets the checkpoint move past the batch. Records are not filtered by
/// level before they get here. Applying `UploadBatch::minimum_level` is up to
/// the transport, and dropped records still count as acknowledged.
pub trait LogUploader: Send + Sync {
    fn upload(&self, batch: &UploadBatch) -> std::result::Result<(), UploadError>;
}

/// Acknowledges everything without shipping it.
#[derive(Debug, Default)]
pub struct BlackholeUploader {
    records: AtomicU64,
}

impl BlackholeUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records acknowledged so far
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

impl LogUploader for BlackholeUploader {
    fn upload(&self, batch: &UploadBatch) -> std::result::Result<(), UploadError> {
        self.records
            .fetch_add(batch.records.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// Writes each record as a JSON line on stdout.
///
/// Every record is written. The batch's minimum level is carried on each line
/// for the consumer to filter on.
#[derive(Debug, Default)]
pub struct StdoutUploader;

#[derive(Serialize)]
struct JsonLine<'a> {
    component: &'a str,
    minimum_level: LogLevel,
    file: &'a str,
    offset: u64,
    lines: usize,
    message: String,
}

impl StdoutUploader {
    fn write_batch<W: Write>(
        writer: &mut W,
        batch: &UploadBatch,
    ) -> std::result::Result<(), UploadError> {
        let file = batch.file_path.to_string_lossy();
        for record in &batch.records {
            let line = JsonLine {
                component: &batch.component,
                minimum_level: batch.minimum_level,
                file: &file,
                offset: record.offset,
                lines: record.line_count,
                message: record.text(),
            };
            serde_json::to_writer(&mut *writer, &line)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl LogUploader for StdoutUploader {
    fn upload(&self, batch: &UploadBatch) -> std::result::Result<(), UploadError> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        Self::write_batch(&mut lock, batch)
    }
}

/// Outcome of one cycle for a component
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub component: String,
    pub files_seen: usize,
    pub records_uploaded: u64,
    pub bytes_uploaded: u64,
    /// The uploader rejected a batch; the rest waits for the next cycle
    pub upload_failed: bool,
    pub cancelled: bool,
    pub retention: Option<RetentionReport>,
}

enum Shipped {
    Acknowledged,
    Failed,
    Cancelled,
}

pub struct UploadCycle {
    store: Arc<CheckpointStore>,
    uploader: Arc<dyn LogUploader>,
}

impl UploadCycle {
    pub fn new(store: Arc<CheckpointStore>, uploader: Arc<dyn LogUploader>) -> Self {
        Self { store, uploader }
    }

    /// Refresh the group, ship unread records oldest first, then apply
    /// retention.
    ///
    /// Stops at the first rejected batch. Cancellation is checked before each
    /// batch, so a cancelled cycle leaves every checkpoint at an acknowledged
    /// boundary.
    pub fn run(
        &self,
        config: &ComponentLogConfiguration,
        not_before: SystemTime,
        cancel: &CancellationToken,
    ) -> Result<CycleReport> {
        let group = LogFileGroup::create_with_store(config, not_before, &self.store)?;
        let assembler = RecordAssembler::from_config(config);

        let mut report = CycleReport {
            component: config.name.clone(),
            files_seen: group.len(),
            ..Default::default()
        };

        'files: for (file, _) in group.unread_ranges() {
            let records = match group.records(file, &assembler) {
                Ok(records) => records,
                Err(e) if e.is_transient() => {
                    debug!(component = %config.name, path = ?file.path(), error = %e, "Skipping unreadable file");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut batch: Vec<Record> = Vec::new();
            let mut batch_bytes = 0usize;
            for record in records {
                let record = match record {
                    Ok(record) => record,
                    Err(e) => {
                        debug!(component = %config.name, path = ?file.path(), error = %e, "Read interrupted");
                        break;
                    }
                };

                let full = batch.len() >= config.max_batch_records
                    || batch_bytes + record.data.len() > config.max_batch_bytes;
                if !batch.is_empty() && full {
                    match self.ship(config, file, std::mem::take(&mut batch), cancel, &mut report)? {
                        Shipped::Acknowledged => batch_bytes = 0,
                        Shipped::Failed | Shipped::Cancelled => break 'files,
                    }
                }
                batch_bytes += record.data.len();
                batch.push(record);
            }

            if !batch.is_empty() {
                match self.ship(config, file, batch, cancel, &mut report)? {
                    Shipped::Acknowledged => {}
                    Shipped::Failed | Shipped::Cancelled => break,
                }
            }
        }

        if !report.cancelled {
            let retention = RetentionEnforcer::new(&self.store).reclaim(&group, config)?;
            report.retention = Some(retention);
        }

        Ok(report)
    }

    fn ship(
        &self,
        config: &ComponentLogConfiguration,
        file: &LogFile,
        records: Vec<Record>,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> Result<Shipped> {
        if cancel.is_cancelled() {
            debug!(component = %config.name, "Cycle cancelled, leaving remaining records for later");
            report.cancelled = true;
            return Ok(Shipped::Cancelled);
        }

        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Ok(Shipped::Acknowledged);
        };
        let boundary = last.boundary();
        let batch = UploadBatch {
            component: config.name.clone(),
            minimum_level: config.minimum_log_level,
            file_path: file.path().to_path_buf(),
            file_id: file.file_id(),
            start_offset: first.offset,
            end_offset: boundary.end_offset(),
            records,
        };

        if let Err(e) = self.uploader.upload(&batch) {
            warn!(
                component = %config.name,
                path = ?batch.file_path,
                offset = batch.start_offset,
                error = %e,
                "Upload failed, will retry on the next cycle"
            );
            report.upload_failed = true;
            return Ok(Shipped::Failed);
        }

        self.store
            .advance(&config.name, file.identity(), batch.end_offset, boundary)?;
        report.records_uploaded += batch.records.len() as u64;
        report.bytes_uploaded += batch.bytes();
        Ok(Shipped::Acknowledged)
    }
}
