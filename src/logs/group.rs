// SPDX-License-Identifier: Apache-2.0

//! Per-refresh snapshot of a component's log files.

use std::io;
use std::ops::Range;
use std::path::Path;
use std::time::SystemTime;

use chrono::Utc;
use tracing::debug;

use crate::logs::checkpoint::{Checkpoint, CheckpointStore};
use crate::logs::config::ComponentLogConfiguration;
use crate::logs::error::{Error, Result};
use crate::logs::input::{FileId, FileMatcher, LogFileIdentity};
use crate::logs::record::{RecordAssembler, Records};
use crate::logs::resolver::ActiveFileResolver;

/// A member of a group: the file snapshot plus where reading resumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    identity: LogFileIdentity,
    start_offset: u64,
}

impl LogFile {
    pub fn identity(&self) -> &LogFileIdentity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        self.identity.path()
    }

    pub fn file_id(&self) -> FileId {
        self.identity.file_id()
    }

    pub fn size(&self) -> u64 {
        self.identity.size()
    }

    /// First byte not yet acknowledged
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    pub fn unread_range(&self) -> Range<u64> {
        self.start_offset..self.identity.size()
    }

    pub fn is_fully_read(&self) -> bool {
        self.start_offset >= self.identity.size()
    }
}

/// LogFileGroup is a consistent view of one component's rotation generations:
/// oldest first, with the active file last when it is a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileGroup {
    component: String,
    files: Vec<LogFile>,
    active: Option<FileId>,
    checkpoint: Checkpoint,
}

impl LogFileGroup {
    /// Enumerate, classify and checkpoint a component's files.
    ///
    /// Files last modified before `not_before` are left out; pass
    /// `SystemTime::UNIX_EPOCH` to include everything.
    pub fn create(
        config: &ComponentLogConfiguration,
        not_before: SystemTime,
        work_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let store = CheckpointStore::new(work_dir.as_ref());
        Self::create_with_store(config, not_before, &store)
    }

    pub fn create_with_store(
        config: &ComponentLogConfiguration,
        not_before: SystemTime,
        store: &CheckpointStore,
    ) -> Result<Self> {
        let matcher = FileMatcher::new(&config.directory_path, config.file_name_regex.clone());
        let matched = matcher.find_files();

        let checkpoint = store.reconcile(&config.name, &matched, Utc::now())?;
        let resolution = ActiveFileResolver::default().resolve(matched);
        let active = resolution.active.as_ref().map(|f| f.file_id());

        let files: Vec<LogFile> = resolution
            .files
            .into_iter()
            .filter(|f| f.modified() >= not_before)
            .map(|identity| LogFile {
                start_offset: checkpoint.offset_for(&identity.file_id()),
                identity,
            })
            .collect();

        debug!(
            component = %config.name,
            files = files.len(),
            active = ?active,
            "Refreshed log file group"
        );

        Ok(Self {
            component: config.name.clone(),
            files,
            active,
            checkpoint,
        })
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// Members ordered from oldest to newest generation
    pub fn log_files(&self) -> &[LogFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_active_file(&self, file: &LogFile) -> bool {
        self.is_active(file.identity())
    }

    pub fn is_active(&self, identity: &LogFileIdentity) -> bool {
        self.active == Some(identity.file_id())
    }

    pub fn active_file(&self) -> Option<&LogFile> {
        let active = self.active?;
        self.files.iter().find(|f| f.file_id() == active)
    }

    pub fn unread_range(&self, file: &LogFile) -> Range<u64> {
        file.unread_range()
    }

    /// Unread byte ranges of every member with something left to read.
    pub fn unread_ranges(&self) -> impl Iterator<Item = (&LogFile, Range<u64>)> {
        self.files
            .iter()
            .filter(|f| !f.is_fully_read())
            .map(|f| (f, f.unread_range()))
    }

    pub fn has_unread(&self) -> bool {
        self.files.iter().any(|f| !f.is_fully_read())
    }

    /// Bytes on disk across all members
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size()).sum()
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Records of a member's unread range. Only the active file may hold back
    /// its trailing record.
    pub fn records(&self, file: &LogFile, assembler: &RecordAssembler) -> Result<Records> {
        let closed = !self.is_active_file(file);
        assembler
            .records(file.identity(), file.unread_range(), closed)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::transient(file.path(), e),
                _ => Error::Io(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::checkpoint::RecordBoundary;
    use std::fs;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(dir: &Path) -> ComponentLogConfiguration {
        ComponentLogConfiguration::builder("app")
            .directory_path(dir)
            .file_name_regex(r"^app\.log\w*$")
            .build()
            .unwrap()
    }

    fn write_generation(dir: &Path, name: &str, size: usize) {
        let line = "0123456789abcde\n";
        fs::write(dir.join(name), line.repeat(size / line.len())).unwrap();
        thread::sleep(Duration::from_millis(20));
    }

    #[test]
    fn test_empty_directory_is_empty_group() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let group =
            LogFileGroup::create(&config(logs.path()), SystemTime::UNIX_EPOCH, work.path())
                .unwrap();
        assert!(group.is_empty());
        assert!(group.active_file().is_none());
        assert!(!group.has_unread());
    }

    #[test]
    fn test_active_file_is_last() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log_1", 2048);
        write_generation(logs.path(), "app.log_2", 2048);

        let group =
            LogFileGroup::create(&config(logs.path()), SystemTime::UNIX_EPOCH, work.path())
                .unwrap();
        let files = group.log_files();
        assert_eq!(files.len(), 2);
        assert!(!group.is_active_file(&files[0]));
        assert!(group.is_active_file(&files[1]));
        assert_eq!(group.total_bytes(), 4096);
    }

    #[test]
    fn test_unread_range_resumes_at_checkpoint() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log", 2048);

        let store = CheckpointStore::new(work.path());
        let identity = LogFileIdentity::stat(logs.path().join("app.log")).unwrap();
        store
            .advance("app", &identity, 1024, RecordBoundary::new(1008, 16))
            .unwrap();

        let group =
            LogFileGroup::create_with_store(&config(logs.path()), SystemTime::UNIX_EPOCH, &store)
                .unwrap();
        let file = &group.log_files()[0];
        assert_eq!(group.unread_range(file), 1024..2048);
        assert_eq!(group.unread_ranges().count(), 1);
    }

    #[test]
    fn test_not_before_filters_old_generations() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log_1", 2048);
        thread::sleep(Duration::from_millis(50));
        let boundary = SystemTime::now();
        thread::sleep(Duration::from_millis(50));
        write_generation(logs.path(), "app.log_2", 2048);

        let group = LogFileGroup::create(&config(logs.path()), boundary, work.path()).unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group.log_files()[0].identity().file_name(), Some("app.log_2"));
        assert!(group.is_active_file(&group.log_files()[0]));
    }

    #[test]
    fn test_records_hold_back_only_on_active_file() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        fs::write(logs.path().join("app.log_1"), b"rotated\ntail without newline").unwrap();
        thread::sleep(Duration::from_millis(20));
        write_generation(logs.path(), "app.log_2", 2048);
        let mut f = fs::OpenOptions::new()
            .append(true)
            .open(logs.path().join("app.log_2"))
            .unwrap();
        std::io::Write::write_all(&mut f, b"partial").unwrap();
        drop(f);

        let group =
            LogFileGroup::create(&config(logs.path()), SystemTime::UNIX_EPOCH, work.path())
                .unwrap();
        let assembler = RecordAssembler::new(None, 1024);

        let rotated: Vec<_> = group
            .records(&group.log_files()[0], &assembler)
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(rotated.len(), 2);

        let active: Vec<_> = group
            .records(&group.log_files()[1], &assembler)
            .unwrap()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(active.len(), 128);
    }

    #[test]
    fn test_records_refuse_a_path_rotated_since_create() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log_1", 2048);
        write_generation(logs.path(), "app.log_2", 2048);

        let group =
            LogFileGroup::create(&config(logs.path()), SystemTime::UNIX_EPOCH, work.path())
                .unwrap();
        let backup = &group.log_files()[0];

        // Rotation shifts every generation along before records are read
        fs::rename(logs.path().join("app.log_2"), logs.path().join("app.log_3")).unwrap();
        fs::rename(logs.path().join("app.log_1"), logs.path().join("app.log_2")).unwrap();
        fs::write(logs.path().join("app.log_1"), "y".repeat(4096)).unwrap();

        let assembler = RecordAssembler::new(None, 1024);
        let err = group.records(backup, &assembler).err().unwrap();
        assert!(matches!(err, Error::TransientIo { .. }));

        let store = CheckpointStore::new(work.path());
        assert!(store.load("app").unwrap().is_empty());
    }
}
