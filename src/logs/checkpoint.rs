// SPDX-License-Identifier: Apache-2.0

//! Durable per-component read positions.
//!
//! ## Offset Semantics
//!
//! A checkpoint offset is the byte position right after the last record the
//! uploader acknowledged. It always sits on a record boundary, so reading can
//! resume there without splitting a record. Offsets only move forward for a
//! given file identity; a reused path gets a fresh identity and starts at 0.
//!
//! ## Reconciliation
//!
//! On every refresh the stored entries are compared with the files currently
//! in the directory:
//! - identity still present: keep the offset and follow the file to its new
//!   path (reset to 0 if the file shrank below the offset, or if its leading
//!   bytes changed, which means the inode was recycled for a new file)
//! - identity gone and its path now holds another file: the name was reused by
//!   rotation, the entry is stale and dropped
//! - identity gone and path gone: kept for `CHECKPOINT_GRACE_PERIOD`, then dropped

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::logs::error::{Error, Result};
use crate::logs::input::{FileId, Fingerprint, LogFileIdentity};
use crate::logs::persistence::{
    CHECKPOINT_STATE_VERSION, JsonStateFile, PersistedCheckpointV1, PersistedFileEntryV1,
};

/// How long an entry for a vanished file is retained.
pub const CHECKPOINT_GRACE_PERIOD: Duration = Duration::from_secs(60 * 60);

const CHECKPOINT_FILE_NAME: &str = "checkpoints.json";

/// Position and length of an acknowledged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBoundary {
    /// Byte position where the record begins
    pub offset: u64,
    /// Length of the record in bytes, including line terminators
    pub len: u64,
}

impl RecordBoundary {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    pub fn end_offset(&self) -> u64 {
        self.offset + self.len
    }
}

/// Checkpoint of a single file generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointEntry {
    pub file_id: FileId,
    pub path: PathBuf,
    pub offset: u64,
    pub last_record: Option<RecordBoundary>,
    /// Leading bytes of the file when it was last checkpointed, empty if unknown
    pub fingerprint: Fingerprint,
    pub updated_at: DateTime<Utc>,
    pub missing_since: Option<DateTime<Utc>>,
}

impl CheckpointEntry {
    fn to_persisted(&self) -> PersistedFileEntryV1 {
        PersistedFileEntryV1 {
            path: self.path.to_string_lossy().into_owned(),
            filename: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            dev: self.file_id.dev(),
            ino: self.file_id.ino(),
            offset: self.offset,
            last_record: self.last_record,
            fingerprint: (!self.fingerprint.is_empty()).then(|| self.fingerprint.clone()),
            updated_at: self.updated_at,
            missing_since: self.missing_since,
        }
    }

    fn from_persisted(entry: PersistedFileEntryV1) -> Self {
        Self {
            file_id: FileId::new(entry.dev, entry.ino),
            path: PathBuf::from(entry.path),
            offset: entry.offset,
            last_record: entry.last_record,
            fingerprint: entry.fingerprint.unwrap_or_default(),
            updated_at: entry.updated_at,
            missing_since: entry.missing_since,
        }
    }
}

/// In-memory working copy of one component's checkpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    component: String,
    entries: BTreeMap<FileId, CheckpointEntry>,
}

impl Checkpoint {
    fn empty(component: &str) -> Self {
        Self {
            component: component.to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Acknowledged offset for a file, 0 when it was never checkpointed.
    pub fn offset_for(&self, file_id: &FileId) -> u64 {
        self.entries.get(file_id).map(|e| e.offset).unwrap_or(0)
    }

    pub fn entry(&self, file_id: &FileId) -> Option<&CheckpointEntry> {
        self.entries.get(file_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CheckpointEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_persisted(&self) -> PersistedCheckpointV1 {
        let mut state = PersistedCheckpointV1::new(self.component.clone());
        for entry in self.entries.values() {
            let persisted = entry.to_persisted();
            state.files.insert(persisted.key(), persisted);
        }
        state
    }
}

/// CheckpointStore owns the persisted offsets of every component under a
/// work directory.
///
/// Operations on the same component are serialized; different components
/// never contend.
pub struct CheckpointStore {
    work_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CheckpointStore {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Location of a component's checkpoint document
    pub fn checkpoint_path(&self, component: &str) -> PathBuf {
        self.work_dir
            .join(sanitize_component(component))
            .join(CHECKPOINT_FILE_NAME)
    }

    /// Load the persisted checkpoint. Corrupted content is dropped with a
    /// warning, which resets the affected files to offset 0.
    pub fn load(&self, component: &str) -> Result<Checkpoint> {
        let lock = self.component_lock(component)?;
        let _guard = lock
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        self.read(component)
    }

    /// Record that everything before `new_offset` in `file` was acknowledged.
    ///
    /// Moves that go backwards or beyond the file's size are ignored. The new
    /// offset is durable once this returns `Ok`.
    pub fn advance(
        &self,
        component: &str,
        file: &LogFileIdentity,
        new_offset: u64,
        boundary: RecordBoundary,
    ) -> Result<()> {
        let lock = self.component_lock(component)?;
        let _guard = lock
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        if new_offset > file.size() {
            warn!(
                component,
                path = ?file.path(),
                offset = new_offset,
                size = file.size(),
                "Ignoring checkpoint beyond the end of the file"
            );
            return Ok(());
        }

        let mut checkpoint = self.read(component)?;
        let file_id = file.file_id();
        let existing = checkpoint.entries.get(&file_id);
        let current = existing.map(|e| e.offset).unwrap_or(0);
        if existing.is_some() && new_offset <= current {
            debug!(
                component,
                file_id = %file_id,
                offset = new_offset,
                current,
                "Ignoring checkpoint that does not move forward"
            );
            return Ok(());
        }

        let fingerprint = match existing {
            Some(entry) if file.fingerprint().is_empty() => entry.fingerprint.clone(),
            _ => file.fingerprint().clone(),
        };
        checkpoint.entries.insert(
            file_id,
            CheckpointEntry {
                file_id,
                path: file.path().to_path_buf(),
                offset: new_offset,
                last_record: Some(boundary),
                fingerprint,
                updated_at: Utc::now(),
                missing_since: None,
            },
        );
        self.write(&checkpoint)?;

        debug!(component, file_id = %file_id, offset = new_offset, "Advanced checkpoint");
        Ok(())
    }

    /// Drop the entry for a file that no longer needs tracking.
    pub fn forget(&self, component: &str, file_id: FileId) -> Result<()> {
        let lock = self.component_lock(component)?;
        let _guard = lock
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let mut checkpoint = self.read(component)?;
        if checkpoint.entries.remove(&file_id).is_some() {
            self.write(&checkpoint)?;
            debug!(component, file_id = %file_id, "Forgot checkpoint");
        }
        Ok(())
    }

    /// Bring stored entries in line with the files currently on disk.
    ///
    /// `current` must list every file matching the component's pattern, not
    /// only the members of the group, so held-back files keep their entries.
    pub fn reconcile(
        &self,
        component: &str,
        current: &[LogFileIdentity],
        now: DateTime<Utc>,
    ) -> Result<Checkpoint> {
        let lock = self.component_lock(component)?;
        let _guard = lock
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        let mut checkpoint = self.read(component)?;
        if checkpoint.is_empty() {
            return Ok(checkpoint);
        }

        let by_id: HashMap<FileId, &LogFileIdentity> =
            current.iter().map(|f| (f.file_id(), f)).collect();
        let by_path: HashMap<&Path, FileId> =
            current.iter().map(|f| (f.path(), f.file_id())).collect();
        let grace = chrono::Duration::from_std(CHECKPOINT_GRACE_PERIOD)
            .unwrap_or_else(|_| chrono::Duration::hours(1));

        let mut changed = false;
        let mut stale = Vec::new();
        for entry in checkpoint.entries.values_mut() {
            if let Some(file) = by_id.get(&entry.file_id) {
                if entry.path != file.path() {
                    debug!(
                        component,
                        file_id = %entry.file_id,
                        from = ?entry.path,
                        to = ?file.path(),
                        "File was renamed by rotation"
                    );
                    entry.path = file.path().to_path_buf();
                    changed = true;
                }
                if entry.missing_since.take().is_some() {
                    changed = true;
                }
                if !entry.fingerprint.is_empty()
                    && !file.fingerprint().is_empty()
                    && !file.fingerprint().starts_with(&entry.fingerprint)
                {
                    debug!(
                        component,
                        path = ?file.path(),
                        file_id = %entry.file_id,
                        "File id was recycled by a new file, reading it from the start"
                    );
                    entry.offset = 0;
                    entry.last_record = None;
                    entry.fingerprint = file.fingerprint().clone();
                    changed = true;
                    continue;
                }
                if entry.offset > file.size() {
                    warn!(
                        component,
                        path = ?file.path(),
                        offset = entry.offset,
                        size = file.size(),
                        "File shrank below its checkpoint, reading it again from the start"
                    );
                    entry.offset = 0;
                    entry.last_record = None;
                    changed = true;
                }
                continue;
            }

            if let Some(other) = by_path.get(entry.path.as_path()) {
                debug!(
                    component,
                    path = ?entry.path,
                    old = %entry.file_id,
                    new = %other,
                    "File name was reused by a new file, dropping stale checkpoint"
                );
                stale.push(entry.file_id);
                continue;
            }

            match entry.missing_since {
                None => {
                    entry.missing_since = Some(now);
                    changed = true;
                }
                Some(since) if now - since > grace => {
                    debug!(
                        component,
                        path = ?entry.path,
                        file_id = %entry.file_id,
                        "File has been missing past the grace period, dropping checkpoint"
                    );
                    stale.push(entry.file_id);
                }
                Some(_) => {}
            }
        }

        for file_id in stale {
            checkpoint.entries.remove(&file_id);
            changed = true;
        }

        if changed {
            self.write(&checkpoint)?;
        }
        Ok(checkpoint)
    }

    fn component_lock(&self, component: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(locks.entry(component.to_string()).or_default().clone())
    }

    fn read(&self, component: &str) -> Result<Checkpoint> {
        let file = JsonStateFile::new(self.checkpoint_path(component));
        let value = match file.read() {
            Ok(Some(value)) => value,
            Ok(None) => return Ok(Checkpoint::empty(component)),
            Err(Error::Json(e)) => {
                report_corruption(component, format!("unparseable checkpoint file: {}", e));
                return Ok(Checkpoint::empty(component));
            }
            Err(e) => return Err(e),
        };
        Ok(decode(component, value))
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        JsonStateFile::new(self.checkpoint_path(&checkpoint.component))
            .write(&checkpoint.to_persisted())
    }
}

/// Decode a persisted document entry by entry, so one damaged entry does not
/// cost the others their offsets.
fn decode(component: &str, value: serde_json::Value) -> Checkpoint {
    let mut checkpoint = Checkpoint::empty(component);

    let version = value.get("version").and_then(|v| v.as_u64());
    if version != Some(CHECKPOINT_STATE_VERSION as u64) {
        report_corruption(component, format!("unsupported version {:?}", version));
        return checkpoint;
    }

    let Some(files) = value.get("files").and_then(|f| f.as_object()) else {
        report_corruption(component, "missing files map".to_string());
        return checkpoint;
    };

    for (key, raw) in files {
        match serde_json::from_value::<PersistedFileEntryV1>(raw.clone()) {
            Ok(entry) if entry.key() == *key => {
                let entry = CheckpointEntry::from_persisted(entry);
                checkpoint.entries.insert(entry.file_id, entry);
            }
            Ok(entry) => report_corruption(
                component,
                format!("entry {} describes file {}", key, entry.key()),
            ),
            Err(e) => report_corruption(component, format!("entry {}: {}", key, e)),
        }
    }

    checkpoint
}

fn report_corruption(component: &str, reason: String) {
    let error = Error::CheckpointCorruption {
        component: component.to_string(),
        reason,
    };
    warn!(component, error = %error, "Resetting affected offsets to 0");
}

/// Map a component name to a single safe path segment.
fn sanitize_component(component: &str) -> String {
    let sanitized: String = component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => format!("_{}", sanitized),
        _ => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str, content: &[u8]) -> LogFileIdentity {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        LogFileIdentity::stat(&path).unwrap()
    }

    #[test]
    fn test_load_missing_is_empty() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let checkpoint = store.load("app").unwrap();
        assert!(checkpoint.is_empty());
        assert_eq!(checkpoint.offset_for(&FileId::new(1, 1)), 0);
    }

    #[test]
    fn test_advance_survives_restart() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let file = write_log(logs.path(), "app.log", b"one\ntwo\n");

        CheckpointStore::new(work.path())
            .advance("app", &file, 4, RecordBoundary::new(0, 4))
            .unwrap();

        let checkpoint = CheckpointStore::new(work.path()).load("app").unwrap();
        assert_eq!(checkpoint.offset_for(&file.file_id()), 4);
        let entry = checkpoint.entry(&file.file_id()).unwrap();
        assert_eq!(entry.path, file.path());
        assert_eq!(entry.last_record, Some(RecordBoundary::new(0, 4)));
    }

    #[test]
    fn test_advance_is_forward_only_and_bounded() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "app.log", b"one\ntwo\n");

        store.advance("app", &file, 8, RecordBoundary::new(4, 4)).unwrap();
        store.advance("app", &file, 4, RecordBoundary::new(0, 4)).unwrap();
        store.advance("app", &file, 100, RecordBoundary::new(8, 92)).unwrap();

        assert_eq!(store.load("app").unwrap().offset_for(&file.file_id()), 8);
    }

    #[test]
    fn test_forget_removes_entry() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "app.log", b"one\n");

        store.advance("app", &file, 4, RecordBoundary::new(0, 4)).unwrap();
        store.forget("app", file.file_id()).unwrap();
        assert!(store.load("app").unwrap().is_empty());
    }

    #[test]
    fn test_components_are_isolated() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "shared.log", b"one\n");

        store.advance("a", &file, 4, RecordBoundary::new(0, 4)).unwrap();
        assert!(store.load("b").unwrap().is_empty());
        assert_ne!(store.checkpoint_path("a"), store.checkpoint_path("b"));
    }

    #[test]
    fn test_corrupted_file_resets_offsets() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let path = store.checkpoint_path("app");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{\"version\": 1, \"files\": {").unwrap();

        assert!(store.load("app").unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_entry_is_dropped_individually() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let path = store.checkpoint_path("app");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let doc = serde_json::json!({
            "version": 1,
            "component": "app",
            "files": {
                "1:10": {
                    "path": "/logs/app.log.1", "filename": "app.log.1",
                    "dev": 1, "ino": 10, "offset": 42,
                    "updated_at": "2024-05-01T12:00:00Z"
                },
                "1:11": { "path": "/logs/app.log", "offset": "not a number" },
                "1:12": {
                    "path": "/logs/app.log.2", "filename": "app.log.2",
                    "dev": 1, "ino": 99, "offset": 7,
                    "updated_at": "2024-05-01T12:00:00Z"
                }
            }
        });
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let checkpoint = store.load("app").unwrap();
        assert_eq!(checkpoint.len(), 1);
        assert_eq!(checkpoint.offset_for(&FileId::new(1, 10)), 42);
        assert_eq!(checkpoint.offset_for(&FileId::new(1, 11)), 0);
    }

    #[test]
    fn test_unknown_version_resets_offsets() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let path = store.checkpoint_path("app");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, br#"{"version": 9, "files": {}}"#).unwrap();

        assert!(store.load("app").unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_follows_rename() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "app.log", b"one\ntwo\n");
        store.advance("app", &file, 4, RecordBoundary::new(0, 4)).unwrap();

        let rotated_path = logs.path().join("app.log.1");
        fs::rename(file.path(), &rotated_path).unwrap();
        let rotated = LogFileIdentity::stat(&rotated_path).unwrap();

        let checkpoint = store.reconcile("app", &[rotated.clone()], Utc::now()).unwrap();
        let entry = checkpoint.entry(&rotated.file_id()).unwrap();
        assert_eq!(entry.offset, 4);
        assert_eq!(entry.path, rotated_path);
    }

    #[test]
    fn test_reconcile_drops_reused_path() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let old = write_log(logs.path(), "app.log", b"old generation\n");
        store.advance("app", &old, 15, RecordBoundary::new(0, 15)).unwrap();

        // Keep the old inode alive elsewhere so it cannot be recycled
        let keep = TempDir::new().unwrap();
        fs::rename(old.path(), keep.path().join("held")).unwrap();
        let new = write_log(logs.path(), "app.log", b"new generation, longer\n");

        let checkpoint = store.reconcile("app", &[new.clone()], Utc::now()).unwrap();
        assert!(checkpoint.is_empty());
        assert_eq!(checkpoint.offset_for(&new.file_id()), 0);
        assert!(store.load("app").unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_resets_truncated_file() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "app.log", b"one\ntwo\n");
        store.advance("app", &file, 8, RecordBoundary::new(4, 4)).unwrap();

        fs::write(file.path(), b"x\n").unwrap();
        let truncated = LogFileIdentity::stat(file.path()).unwrap();
        assert_eq!(truncated.file_id(), file.file_id());

        let checkpoint = store.reconcile("app", &[truncated.clone()], Utc::now()).unwrap();
        assert_eq!(checkpoint.offset_for(&truncated.file_id()), 0);
    }

    #[test]
    fn test_reconcile_missing_file_grace_period() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let file = write_log(logs.path(), "app.log.3", b"one\n");
        store.advance("app", &file, 4, RecordBoundary::new(0, 4)).unwrap();
        fs::remove_file(file.path()).unwrap();

        let now = Utc::now();
        let checkpoint = store.reconcile("app", &[], now).unwrap();
        let entry = checkpoint.entry(&file.file_id()).unwrap();
        assert_eq!(entry.missing_since, Some(now));

        let later = now + chrono::Duration::minutes(30);
        assert_eq!(store.reconcile("app", &[], later).unwrap().len(), 1);

        let expired = now + chrono::Duration::minutes(61);
        assert!(store.reconcile("app", &[], expired).unwrap().is_empty());
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("aws.greengrass.Nucleus"), "aws.greengrass.Nucleus");
        assert_eq!(sanitize_component("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_component(".."), "_..");
    }

    fn identity(name: &str, file_id: FileId, size: u64, head: &[u8]) -> LogFileIdentity {
        let t = std::time::SystemTime::UNIX_EPOCH;
        LogFileIdentity::new(format!("/logs/{}", name), file_id, t, t, size)
            .with_fingerprint(Fingerprint::from_bytes(head.to_vec()))
    }

    #[test]
    fn test_reconcile_resets_recycled_file_id() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let id = FileId::new(1, 42);

        let old = identity("app.log.1", id, 6000, b"2024-05-01 first generation");
        store.advance("app", &old, 5000, RecordBoundary::new(4900, 100)).unwrap();

        // The old file was deleted and a new one got its inode
        let recycled = identity("app.log", id, 8000, b"2024-06-09 unrelated content");
        let checkpoint = store.reconcile("app", &[recycled.clone()], Utc::now()).unwrap();
        let entry = checkpoint.entry(&id).unwrap();
        assert_eq!(entry.offset, 0);
        assert_eq!(entry.last_record, None);
        assert_eq!(entry.fingerprint, *recycled.fingerprint());

        // The reset is durable
        assert_eq!(store.load("app").unwrap().offset_for(&id), 0);
    }

    #[test]
    fn test_reconcile_keeps_offset_of_grown_file() {
        let work = TempDir::new().unwrap();
        let store = CheckpointStore::new(work.path());
        let id = FileId::new(1, 42);

        let small = identity("app.log", id, 6000, b"2024-05-01 first");
        store.advance("app", &small, 5000, RecordBoundary::new(4900, 100)).unwrap();

        let grown = identity("app.log", id, 8000, b"2024-05-01 first generation");
        let checkpoint = store.reconcile("app", &[grown], Utc::now()).unwrap();
        assert_eq!(checkpoint.offset_for(&id), 5000);
    }

    #[test]
    fn test_fingerprint_survives_restart() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let file = write_log(logs.path(), "app.log", b"one\ntwo\n");
        CheckpointStore::new(work.path())
            .advance("app", &file, 4, RecordBoundary::new(0, 4))
            .unwrap();

        let checkpoint = CheckpointStore::new(work.path()).load("app").unwrap();
        let entry = checkpoint.entry(&file.file_id()).unwrap();
        assert_eq!(entry.fingerprint.bytes(), b"one\ntwo\n");
    }
}
