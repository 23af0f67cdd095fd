// SPDX-License-Identifier: Apache-2.0

//! Persistence schema for component checkpoints.
//!
//! Entries are keyed by "dev:ino" so an offset follows its file across
//! renames. Path and file name are kept for human inspection and for
//! detecting a reused name during reconciliation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logs::checkpoint::RecordBoundary;
use crate::logs::input::{FileId, Fingerprint};

/// Current schema version for persisted checkpoints
pub const CHECKPOINT_STATE_VERSION: u8 = 1;

/// Persisted checkpoints of one component (v1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedCheckpointV1 {
    /// Schema version (always 1 for this format)
    pub version: u8,
    /// Owning component
    pub component: String,
    /// Map from file key (dev:ino) to file entry
    pub files: BTreeMap<String, PersistedFileEntryV1>,
}

impl PersistedCheckpointV1 {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            version: CHECKPOINT_STATE_VERSION,
            component: component.into(),
            files: BTreeMap::new(),
        }
    }
}

/// Persisted state for a single file (v1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedFileEntryV1 {
    /// Last known path to the file
    pub path: String,
    /// Last known filename
    pub filename: String,

    /// Device ID (Unix) or volume serial (Windows)
    pub dev: u64,
    /// Inode number (Unix) or file index (Windows)
    pub ino: u64,

    /// Acknowledged offset; everything before it has been shipped
    pub offset: u64,
    /// Last acknowledged record, ending at `offset`
    #[serde(default)]
    pub last_record: Option<RecordBoundary>,
    /// Leading bytes of the file, to tell a recycled inode from the original
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    pub updated_at: DateTime<Utc>,
    /// When the file was first found missing from its directory
    #[serde(default)]
    pub missing_since: Option<DateTime<Utc>>,
}

impl PersistedFileEntryV1 {
    /// Generate the map key for this entry ("dev:ino" format)
    pub fn key(&self) -> String {
        FileId::new(self.dev, self.ino).key()
    }
}
