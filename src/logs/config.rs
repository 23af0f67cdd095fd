// SPDX-License-Identifier: Apache-2.0

//! Per-component log configuration snapshots.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::logs::error::{Error, Result};
use crate::logs::level::LogLevel;

/// Default number of records shipped in one upload batch
pub const DEFAULT_MAX_BATCH_RECORDS: usize = 10_000;
/// Default payload size of one upload batch
pub const DEFAULT_MAX_BATCH_BYTES: usize = 1024 * 1024;
/// Default upper bound for a single assembled record
pub const DEFAULT_MAX_RECORD_BYTES: usize = 256 * 1024;

/// Unit applied to a configured disk space limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiskSpaceLimitUnit {
    #[default]
    KB,
    MB,
    GB,
}

impl DiskSpaceLimitUnit {
    /// Convert a limit expressed in this unit to bytes.
    pub fn to_bytes(self, limit: u64) -> u64 {
        let multiplier: u64 = match self {
            Self::KB => 1024,
            Self::MB => 1024 * 1024,
            Self::GB => 1024 * 1024 * 1024,
        };
        limit.saturating_mul(multiplier)
    }
}

impl std::str::FromStr for DiskSpaceLimitUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KB" => Ok(Self::KB),
            "MB" => Ok(Self::MB),
            "GB" => Ok(Self::GB),
            _ => Err(format!(
                "Invalid disk space limit unit '{}'. Valid options: KB, MB, GB",
                s
            )),
        }
    }
}

/// Default file name pattern for a component: its name followed by word
/// characters and a `.log` extension.
pub fn default_file_name_regex(component: &str) -> String {
    format!(r"^{}\w*\.log", regex::escape(component))
}

/// Default directory holding component logs under the given root.
pub fn default_directory_path(root: &Path) -> PathBuf {
    root.join("logs")
}

/// Immutable configuration for one component's log group.
#[derive(Debug, Clone)]
pub struct ComponentLogConfiguration {
    /// Component name, also used to scope checkpoints
    pub name: String,
    /// Directory holding the component's rotation generations
    pub directory_path: PathBuf,
    /// Pattern a file name must match to be part of the group
    pub file_name_regex: Regex,
    /// Pattern marking the first line of a multi-line record
    pub multi_line_start_pattern: Option<Regex>,
    /// Minimum level forwarded to the uploader
    pub minimum_log_level: LogLevel,
    /// Disk space ceiling in bytes; `None` disables enforcement
    pub disk_space_limit: Option<u64>,
    /// Delete rotated files as soon as they are fully uploaded
    pub delete_log_file_after_cloud_upload: bool,
    /// Maximum records per upload batch
    pub max_batch_records: usize,
    /// Maximum payload bytes per upload batch
    pub max_batch_bytes: usize,
    /// Maximum bytes of a single assembled record
    pub max_record_bytes: usize,
}

impl ComponentLogConfiguration {
    pub fn builder(name: impl Into<String>) -> ComponentLogConfigurationBuilder {
        ComponentLogConfigurationBuilder::new(name)
    }
}

// Compiled patterns compare by their source text
impl PartialEq for ComponentLogConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.directory_path == other.directory_path
            && self.file_name_regex.as_str() == other.file_name_regex.as_str()
            && self.multi_line_start_pattern.as_ref().map(Regex::as_str)
                == other.multi_line_start_pattern.as_ref().map(Regex::as_str)
            && self.minimum_log_level == other.minimum_log_level
            && self.disk_space_limit == other.disk_space_limit
            && self.delete_log_file_after_cloud_upload == other.delete_log_file_after_cloud_upload
            && self.max_batch_records == other.max_batch_records
            && self.max_batch_bytes == other.max_batch_bytes
            && self.max_record_bytes == other.max_record_bytes
    }
}

/// Builder that compiles patterns and validates a configuration snapshot.
#[derive(Debug, Clone)]
pub struct ComponentLogConfigurationBuilder {
    name: String,
    directory_path: Option<PathBuf>,
    file_name_regex: Option<String>,
    multi_line_start_pattern: Option<String>,
    minimum_log_level: LogLevel,
    disk_space_limit: Option<u64>,
    delete_log_file_after_cloud_upload: bool,
    max_batch_records: usize,
    max_batch_bytes: usize,
    max_record_bytes: usize,
}

impl ComponentLogConfigurationBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory_path: None,
            file_name_regex: None,
            multi_line_start_pattern: None,
            minimum_log_level: LogLevel::default(),
            disk_space_limit: None,
            delete_log_file_after_cloud_upload: false,
            max_batch_records: DEFAULT_MAX_BATCH_RECORDS,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }

    pub fn directory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory_path = Some(path.into());
        self
    }

    pub fn file_name_regex(mut self, pattern: impl Into<String>) -> Self {
        self.file_name_regex = Some(pattern.into());
        self
    }

    pub fn multi_line_start_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.multi_line_start_pattern = Some(pattern.into());
        self
    }

    pub fn minimum_log_level(mut self, level: LogLevel) -> Self {
        self.minimum_log_level = level;
        self
    }

    /// Disk space ceiling in bytes
    pub fn disk_space_limit(mut self, limit: Option<u64>) -> Self {
        self.disk_space_limit = limit;
        self
    }

    pub fn delete_log_file_after_cloud_upload(mut self, delete: bool) -> Self {
        self.delete_log_file_after_cloud_upload = delete;
        self
    }

    pub fn max_batch_records(mut self, records: usize) -> Self {
        self.max_batch_records = records;
        self
    }

    pub fn max_batch_bytes(mut self, bytes: usize) -> Self {
        self.max_batch_bytes = bytes;
        self
    }

    pub fn max_record_bytes(mut self, bytes: usize) -> Self {
        self.max_record_bytes = bytes;
        self
    }

    pub fn build(self) -> Result<ComponentLogConfiguration> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("component name cannot be empty".to_string()));
        }

        let directory_path = self.directory_path.ok_or_else(|| {
            Error::Config(format!("component {} has no log directory", self.name))
        })?;
        if !directory_path.is_absolute() {
            return Err(Error::Config(format!(
                "log directory {:?} for component {} must be absolute",
                directory_path, self.name
            )));
        }

        let pattern = self
            .file_name_regex
            .unwrap_or_else(|| default_file_name_regex(&self.name));
        let file_name_regex = Regex::new(&pattern).map_err(|e| {
            Error::Config(format!(
                "invalid file name pattern for component {}: {}",
                self.name, e
            ))
        })?;

        let multi_line_start_pattern = match self.multi_line_start_pattern {
            Some(p) if !p.is_empty() => Some(Regex::new(&p).map_err(|e| {
                Error::Config(format!(
                    "invalid multi-line start pattern for component {}: {}",
                    self.name, e
                ))
            })?),
            _ => None,
        };

        if self.max_batch_records == 0 {
            return Err(Error::Config("max_batch_records must be positive".to_string()));
        }
        if self.max_batch_bytes == 0 {
            return Err(Error::Config("max_batch_bytes must be positive".to_string()));
        }
        if self.max_record_bytes == 0 {
            return Err(Error::Config("max_record_bytes must be positive".to_string()));
        }

        Ok(ComponentLogConfiguration {
            name: self.name,
            directory_path,
            file_name_regex,
            multi_line_start_pattern,
            minimum_log_level: self.minimum_log_level,
            disk_space_limit: self.disk_space_limit,
            delete_log_file_after_cloud_upload: self.delete_log_file_after_cloud_upload,
            max_batch_records: self.max_batch_records,
            max_batch_bytes: self.max_batch_bytes,
            max_record_bytes: self.max_record_bytes,
        })
    }
}
