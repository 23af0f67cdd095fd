// SPDX-License-Identifier: Apache-2.0

//! Log file group tracking for rotating component logs.
//!
//! Each component writes a bounded set of rotation generations into a
//! directory. This module discovers them, decides which one is still being
//! written, remembers how far each generation has been shipped, and reclaims
//! disk space once content has been acknowledged.
//!
//! Features:
//! - Inode-based file identity so checkpoints follow files across renames
//! - Atomic, fsync'd checkpoint persistence that survives restarts
//! - Multi-line record assembly over lazily read byte ranges
//! - Disk-space retention that never touches unread bytes or the active file

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod group;
pub mod input;
pub mod level;
pub mod persistence;
pub mod record;
pub mod resolver;
pub mod retention;
pub mod scheduler;
pub mod upload;

pub use checkpoint::{Checkpoint, CheckpointStore, RecordBoundary};
pub use config::{ComponentLogConfiguration, DiskSpaceLimitUnit};
pub use error::{Error, Result};
pub use group::{LogFile, LogFileGroup};
pub use input::{FileId, FileMatcher, Fingerprint, LogFileIdentity};
pub use level::LogLevel;
pub use record::{Record, RecordAssembler, Records};
pub use resolver::{ActiveFileResolver, MIN_ACTIVE_FILE_SIZE_BYTES, Resolution};
pub use retention::{RetentionEnforcer, RetentionReport};
pub use scheduler::LogScheduler;
pub use upload::{
    BlackholeUploader, CycleReport, LogUploader, StdoutUploader, UploadBatch, UploadCycle,
    UploadError,
};
