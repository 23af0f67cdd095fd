// SPDX-License-Identifier: Apache-2.0

//! Loads component log configurations from a JSON document merged with
//! `LOGKEEPER_`-prefixed environment overrides.
//!
//! ```json
//! {
//!   "periodicUploadIntervalSec": 300,
//!   "systemLogsConfiguration": { "uploadToCloudWatch": true, "minimumLogLevel": "WARN" },
//!   "componentLogsConfigurationMap": {
//!     "UserComponentA": { "logFileRegex": "^UserComponentA\\w*\\.log", "diskSpaceLimit": 10, "diskSpaceLimitUnit": "MB" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Json};
use serde::Deserialize;
use tower::BoxError;
use tracing::{error, warn};

use crate::logs::config::{
    ComponentLogConfiguration, DiskSpaceLimitUnit, default_directory_path,
};
use crate::logs::level::LogLevel;

/// Refresh interval when the document does not set one
pub const DEFAULT_PERIODIC_UPLOAD_INTERVAL_SEC: u64 = 300;

/// Name of the component covering the device's own logs
pub const SYSTEM_LOGS_COMPONENT_NAME: &str = "System";

/// File pattern of the system logs
pub const SYSTEM_LOGS_FILE_REGEX: &str = r"^system\w*\.log";

const ENV_PREFIX: &str = "LOGKEEPER_";

/// Scalars may be written as numbers/booleans or as strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar<T> {
    Value(T),
    Text(String),
}

impl<T: std::str::FromStr> Scalar<T>
where
    T::Err: std::fmt::Display,
{
    fn get(self, key: &str) -> Result<T, String> {
        match self {
            Scalar::Value(v) => Ok(v),
            Scalar::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("invalid value '{}' for {}: {}", s, key, e)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LogsUploaderDocument {
    periodic_upload_interval_sec: Option<Scalar<u64>>,
    system_logs_configuration: Option<SystemLogsDocument>,
    component_logs_configuration_map: BTreeMap<String, ComponentLogsDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SystemLogsDocument {
    upload_to_cloud_watch: Option<Scalar<bool>>,
    minimum_log_level: Option<String>,
    disk_space_limit: Option<Scalar<u64>>,
    disk_space_limit_unit: Option<String>,
    delete_log_file_after_cloud_upload: Option<Scalar<bool>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ComponentLogsDocument {
    log_file_regex: Option<String>,
    log_file_directory_path: Option<PathBuf>,
    multi_line_start_pattern: Option<String>,
    minimum_log_level: Option<String>,
    disk_space_limit: Option<Scalar<u64>>,
    disk_space_limit_unit: Option<String>,
    delete_log_file_after_cloud_upload: Option<Scalar<bool>>,
}

/// Fully resolved configuration of the log keeper
#[derive(Debug, Clone)]
pub struct LogKeeperConfig {
    pub interval: Duration,
    pub components: Vec<ComponentLogConfiguration>,
}

/// Load the configuration document, if any, plus environment overrides.
pub fn load(config_file: Option<&Path>, root_path: &Path) -> Result<LogKeeperConfig, BoxError> {
    let mut figment = Figment::new();
    if let Some(path) = config_file {
        if !path.exists() {
            return Err(format!("configuration file {:?} does not exist", path).into());
        }
        figment = figment.merge(Json::file(path));
    }
    figment = figment.merge(env_provider());

    from_figment(&figment, root_path)
}

/// Resolve configuration from an already assembled figment.
///
/// A component whose settings are invalid is logged and left out; the others
/// are still returned.
pub fn from_figment(figment: &Figment, root_path: &Path) -> Result<LogKeeperConfig, BoxError> {
    let document: LogsUploaderDocument = match figment.extract() {
        Ok(document) => document,
        Err(e) => return Err(format!("failed to parse log configuration: {}", e).into()),
    };

    let interval_secs = match document.periodic_upload_interval_sec {
        Some(v) => v.get("periodicUploadIntervalSec")?,
        None => DEFAULT_PERIODIC_UPLOAD_INTERVAL_SEC,
    };
    if interval_secs == 0 {
        return Err("periodicUploadIntervalSec must be positive".into());
    }

    let mut components = Vec::new();
    if let Some(system) = document.system_logs_configuration {
        match system_config(system, root_path) {
            Ok(Some(config)) => components.push(config),
            Ok(None) => {}
            Err(e) => error!(component = SYSTEM_LOGS_COMPONENT_NAME, error = %e, "Invalid log configuration, skipping"),
        }
    }

    for (name, doc) in document.component_logs_configuration_map {
        if name == SYSTEM_LOGS_COMPONENT_NAME {
            warn!(component = %name, "Component name is reserved for system logs, skipping");
            continue;
        }
        match component_config(&name, doc, root_path) {
            Ok(config) => components.push(config),
            Err(e) => error!(component = %name, error = %e, "Invalid log configuration, skipping"),
        }
    }

    Ok(LogKeeperConfig {
        interval: Duration::from_secs(interval_secs),
        components,
    })
}

fn system_config(
    doc: SystemLogsDocument,
    root_path: &Path,
) -> Result<Option<ComponentLogConfiguration>, BoxError> {
    let upload = match doc.upload_to_cloud_watch {
        Some(v) => v.get("uploadToCloudWatch")?,
        None => false,
    };
    if !upload {
        return Ok(None);
    }

    let config = ComponentLogConfiguration::builder(SYSTEM_LOGS_COMPONENT_NAME)
        .directory_path(default_directory_path(root_path))
        .file_name_regex(SYSTEM_LOGS_FILE_REGEX)
        .minimum_log_level(parse_level(doc.minimum_log_level)?)
        .disk_space_limit(parse_limit(doc.disk_space_limit, doc.disk_space_limit_unit)?)
        .delete_log_file_after_cloud_upload(parse_flag(
            doc.delete_log_file_after_cloud_upload,
            "deleteLogFileAfterCloudUpload",
        )?)
        .build()?;
    Ok(Some(config))
}

fn component_config(
    name: &str,
    doc: ComponentLogsDocument,
    root_path: &Path,
) -> Result<ComponentLogConfiguration, BoxError> {
    let directory = doc
        .log_file_directory_path
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| default_directory_path(root_path));

    let mut builder = ComponentLogConfiguration::builder(name)
        .directory_path(directory)
        .minimum_log_level(parse_level(doc.minimum_log_level)?)
        .disk_space_limit(parse_limit(doc.disk_space_limit, doc.disk_space_limit_unit)?)
        .delete_log_file_after_cloud_upload(parse_flag(
            doc.delete_log_file_after_cloud_upload,
            "deleteLogFileAfterCloudUpload",
        )?);

    if let Some(regex) = doc.log_file_regex.filter(|r| !r.is_empty()) {
        builder = builder.file_name_regex(regex);
    }
    if let Some(pattern) = doc.multi_line_start_pattern {
        builder = builder.multi_line_start_pattern(pattern);
    }

    Ok(builder.build()?)
}

fn parse_level(level: Option<String>) -> Result<LogLevel, BoxError> {
    match level {
        Some(level) => Ok(level.parse()?),
        None => Ok(LogLevel::default()),
    }
}

fn parse_limit(
    limit: Option<Scalar<u64>>,
    unit: Option<String>,
) -> Result<Option<u64>, BoxError> {
    let Some(limit) = limit else {
        return Ok(None);
    };
    let limit = limit.get("diskSpaceLimit")?;
    let unit = match unit {
        Some(unit) => unit.parse::<DiskSpaceLimitUnit>()?,
        None => DiskSpaceLimitUnit::default(),
    };
    Ok(Some(unit.to_bytes(limit)))
}

fn parse_flag(flag: Option<Scalar<bool>>, key: &str) -> Result<bool, BoxError> {
    match flag {
        Some(flag) => Ok(flag.get(key)?),
        None => Ok(false),
    }
}

/// Environment overrides use upper snake case with `__` between nesting
/// levels, e.g. `LOGKEEPER_SYSTEM_LOGS_CONFIGURATION__UPLOAD_TO_CLOUD_WATCH`.
/// Component entries are keyed by case-sensitive names and are only read from
/// the document.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
        .split("__")
        .lowercase(false)
        .filter(|key| {
            !key.as_str()
                .to_ascii_lowercase()
                .starts_with("component_logs_configuration_map")
        })
        .map(|key| camel_case_path(key.as_str()).into())
}

fn camel_case_path(key: &str) -> String {
    key.split('.')
        .map(|segment| {
            let mut out = String::with_capacity(segment.len());
            let mut upper = false;
            for c in segment.chars() {
                if c == '_' {
                    upper = true;
                } else if upper {
                    out.push(c.to_ascii_uppercase());
                    upper = false;
                } else {
                    out.push(c.to_ascii_lowercase());
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(".")
}
