// SPDX-License-Identifier: Apache-2.0

//! Disk space retention for a component's log group.
//!
//! Only closed generations whose content has been fully acknowledged are
//! candidates, oldest first. The active file and unread bytes are never
//! touched. Deleting continues past individual failures; whatever could not
//! be reclaimed is reported as over budget.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::logs::checkpoint::CheckpointStore;
use crate::logs::config::ComponentLogConfiguration;
use crate::logs::error::{Error, Result};
use crate::logs::group::{LogFile, LogFileGroup};
use crate::logs::input::LogFileIdentity;

/// Outcome of one retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub component: String,
    /// Files removed (or found already gone), oldest first
    pub deleted: Vec<PathBuf>,
    pub reclaimed_bytes: u64,
    /// Bytes still held by group members
    pub remaining_bytes: u64,
    pub limit: Option<u64>,
    pub over_budget: bool,
}

impl RetentionReport {
    /// The over-budget condition as an error, for surfacing to operators.
    pub fn over_budget_error(&self) -> Option<Error> {
        match self.limit {
            Some(limit) if self.over_budget => Some(Error::RetentionOverBudget {
                component: self.component.clone(),
                usage: self.remaining_bytes,
                limit,
            }),
            _ => None,
        }
    }
}

enum Removal {
    Deleted,
    AlreadyGone,
    Skipped,
}

pub struct RetentionEnforcer<'a> {
    store: &'a CheckpointStore,
}

impl<'a> RetentionEnforcer<'a> {
    pub fn new(store: &'a CheckpointStore) -> Self {
        Self { store }
    }

    /// Delete fully uploaded backups until the group fits its limit, or all
    /// of them when delete-after-upload is set.
    pub fn reclaim(
        &self,
        group: &LogFileGroup,
        config: &ComponentLogConfiguration,
    ) -> Result<RetentionReport> {
        let mut report = RetentionReport {
            component: group.component().to_string(),
            remaining_bytes: group.total_bytes(),
            limit: config.disk_space_limit,
            ..Default::default()
        };

        let delete_all_uploaded = config.delete_log_file_after_cloud_upload;
        if report.limit.is_none() && !delete_all_uploaded {
            return Ok(report);
        }

        // Offsets may have advanced since the group was created
        let checkpoint = self.store.load(group.component())?;

        for file in group.log_files() {
            let within_limit = report
                .limit
                .is_none_or(|limit| report.remaining_bytes <= limit);
            if within_limit && !delete_all_uploaded {
                break;
            }
            if group.is_active_file(file) {
                continue;
            }
            if checkpoint.offset_for(&file.file_id()) < file.size() {
                debug!(
                    component = group.component(),
                    path = ?file.path(),
                    "Keeping file with unread content"
                );
                continue;
            }

            match self.remove(group.component(), file) {
                Removal::Deleted | Removal::AlreadyGone => {
                    report.deleted.push(file.path().to_path_buf());
                    report.reclaimed_bytes += file.size();
                    report.remaining_bytes = report.remaining_bytes.saturating_sub(file.size());
                    self.store.forget(group.component(), file.file_id())?;
                }
                Removal::Skipped => {}
            }
        }

        report.over_budget = report
            .limit
            .is_some_and(|limit| report.remaining_bytes > limit);
        if let Some(error) = report.over_budget_error() {
            warn!(component = group.component(), error = %error, "Log group is over budget");
        }

        Ok(report)
    }

    fn remove(&self, component: &str, file: &LogFile) -> Removal {
        // The path may have been reused, or the file reopened, since the snapshot
        match LogFileIdentity::stat(file.path()) {
            Ok(current) if current.file_id() != file.file_id() => {
                debug!(component, path = ?file.path(), "Path now holds a different file, skipping");
                return Removal::Skipped;
            }
            Ok(current)
                if !file.identity().fingerprint().is_empty()
                    && !current.fingerprint().starts_with(file.identity().fingerprint()) =>
            {
                debug!(component, path = ?file.path(), "File was rewritten in place, skipping");
                return Removal::Skipped;
            }
            Ok(current) if current.size() > file.size() => {
                debug!(component, path = ?file.path(), "File grew since it was uploaded, skipping");
                return Removal::Skipped;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Removal::AlreadyGone,
            Err(e) => {
                warn!(component, path = ?file.path(), error = %e, "Failed to inspect file before deletion");
                return Removal::Skipped;
            }
        }

        match fs::remove_file(file.path()) {
            Ok(()) => {
                info!(
                    component,
                    path = ?file.path(),
                    size = file.size(),
                    "Deleted uploaded log file"
                );
                Removal::Deleted
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Removal::AlreadyGone,
            Err(e) => {
                warn!(component, path = ?file.path(), error = %e, "Failed to delete log file");
                Removal::Skipped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::checkpoint::RecordBoundary;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const KB: usize = 1024;

    fn write_generation(dir: &Path, name: &str, size: usize) {
        let mut content = vec![b'x'; size - 1];
        content.push(b'\n');
        fs::write(dir.join(name), content).unwrap();
        thread::sleep(Duration::from_millis(20));
    }

    fn config(dir: &Path, limit: Option<u64>, delete_after_upload: bool) -> ComponentLogConfiguration {
        ComponentLogConfiguration::builder("app")
            .directory_path(dir)
            .file_name_regex(r"^app\.log")
            .disk_space_limit(limit)
            .delete_log_file_after_cloud_upload(delete_after_upload)
            .build()
            .unwrap()
    }

    fn acknowledge_all(store: &CheckpointStore, group: &LogFileGroup) {
        for file in group.log_files() {
            store
                .advance("app", file.identity(), file.size(), RecordBoundary::new(0, file.size()))
                .unwrap();
        }
    }

    #[test]
    fn test_unbounded_limit_disables_enforcement() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.1", 4 * KB);
        write_generation(logs.path(), "app.log", 4 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), None, false);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();
        acknowledge_all(&store, &group);

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert!(report.deleted.is_empty());
        assert!(!report.over_budget);
        assert!(logs.path().join("app.log.1").exists());
    }

    #[test]
    fn test_unread_files_are_never_deleted() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.1", 4 * KB);
        write_generation(logs.path(), "app.log", 4 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), Some(KB as u64), false);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert!(report.deleted.is_empty());
        assert!(report.over_budget);
        assert!(matches!(
            report.over_budget_error(),
            Some(Error::RetentionOverBudget { usage: 8192, limit: 1024, .. })
        ));
    }

    #[test]
    fn test_delete_after_upload_ignores_limit() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.2", 2 * KB);
        write_generation(logs.path(), "app.log.1", 2 * KB);
        write_generation(logs.path(), "app.log", 2 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), None, true);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();
        acknowledge_all(&store, &group);

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert_eq!(report.deleted.len(), 2);
        assert!(logs.path().join("app.log").exists());
        assert!(!logs.path().join("app.log.1").exists());
        assert_eq!(store.load("app").unwrap().len(), 1);
    }

    #[test]
    fn test_reused_path_is_not_deleted() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.1", 2 * KB);
        write_generation(logs.path(), "app.log", 2 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), Some(0), false);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();
        acknowledge_all(&store, &group);

        // Rotation replaces app.log.1 with a new file before retention runs
        let keep = TempDir::new().unwrap();
        fs::rename(logs.path().join("app.log.1"), keep.path().join("held")).unwrap();
        fs::write(logs.path().join("app.log.1"), b"fresh content\n").unwrap();

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert!(report.deleted.is_empty());
        assert!(logs.path().join("app.log.1").exists());
    }

    #[test]
    fn test_vanished_file_counts_as_reclaimed() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.1", 2 * KB);
        write_generation(logs.path(), "app.log", 2 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), Some(2 * KB as u64), false);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();
        acknowledge_all(&store, &group);
        fs::remove_file(logs.path().join("app.log.1")).unwrap();

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert_eq!(report.reclaimed_bytes, 2 * KB as u64);
        assert_eq!(report.remaining_bytes, 2 * KB as u64);
        assert!(!report.over_budget);
    }

    #[test]
    fn test_file_rewritten_in_place_is_not_deleted() {
        let logs = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        write_generation(logs.path(), "app.log.1", 2 * KB);
        write_generation(logs.path(), "app.log", 2 * KB);

        let store = CheckpointStore::new(work.path());
        let config = config(logs.path(), Some(0), false);
        let group = LogFileGroup::create_with_store(&config, SystemTime::UNIX_EPOCH, &store).unwrap();
        acknowledge_all(&store, &group);

        // Same inode, new content nobody has uploaded
        fs::write(logs.path().join("app.log.1"), b"fresh content\n").unwrap();

        let report = RetentionEnforcer::new(&store).reclaim(&group, &config).unwrap();
        assert!(report.deleted.is_empty());
        assert!(logs.path().join("app.log.1").exists());
    }
}
