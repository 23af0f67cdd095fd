// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::identity::LogFileIdentity;

/// FileMatcher lists a single directory and keeps the regular files whose
/// name matches a pattern.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    directory: PathBuf,
    pattern: Regex,
}

impl FileMatcher {
    pub fn new(directory: impl Into<PathBuf>, pattern: Regex) -> Self {
        Self {
            directory: directory.into(),
            pattern,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Whether a bare file name belongs to the group
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Find all matching files, ordered oldest generation first.
    ///
    /// A missing or unreadable directory yields no files: the component may
    /// not have started logging yet. Files that vanish between listing and
    /// stat are skipped.
    pub fn find_files(&self) -> Vec<LogFileIdentity> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    directory = ?self.directory,
                    error = %e,
                    "Log directory is not readable, treating as empty"
                );
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(directory = ?self.directory, error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !self.matches(name) {
                continue;
            }

            let path = entry.path();
            match LogFileIdentity::stat(&path) {
                Ok(identity) => files.push(identity),
                Err(e) => {
                    // Deleted, rotated away or not a regular file
                    debug!(path = ?path, error = %e, "Skipping unmatched or vanished file");
                }
            }
        }

        sort_generations(&mut files);
        files
    }
}

/// Order by creation time, then modification time, then path.
pub(crate) fn sort_generations(files: &mut [LogFileIdentity]) {
    files.sort_by(|a, b| {
        a.created()
            .cmp(&b.created())
            .then_with(|| a.modified().cmp(&b.modified()))
            .then_with(|| a.path().cmp(b.path()))
    });
}
