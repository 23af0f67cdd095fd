// SPDX-License-Identifier: Apache-2.0

use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Args, Clone)]
pub struct AgentRun {
    /// Root directory; component logs default to <root>/logs
    #[arg(long, env = "LOGKEEPER_ROOT_PATH", default_value = "/greengrass/v2")]
    pub root_path: PathBuf,

    /// Directory holding checkpoint state
    #[arg(long, env = "LOGKEEPER_WORK_DIR", default_value = "/var/lib/logkeeper")]
    pub work_dir: PathBuf,

    /// JSON configuration document
    #[arg(long, env = "LOGKEEPER_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Destination for assembled records
    #[arg(value_enum, long, env = "LOGKEEPER_UPLOADER", default_value = "blackhole")]
    pub uploader: Uploader,

    /// Ignore files last modified before this Unix timestamp (seconds)
    #[arg(long, env = "LOGKEEPER_NOT_BEFORE_SECS", default_value = "0")]
    pub not_before_secs: u64,

    /// Time allowed for in-flight refreshes to finish on shutdown
    #[arg(long, env = "LOGKEEPER_SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
    pub shutdown_timeout_secs: u64,
}

impl Default for AgentRun {
    fn default() -> Self {
        AgentRun {
            root_path: PathBuf::from("/greengrass/v2"),
            work_dir: PathBuf::from("/var/lib/logkeeper"),
            config_file: None,
            uploader: Uploader::Blackhole,
            not_before_secs: 0,
            shutdown_timeout_secs: 5,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum Uploader {
    /// Acknowledge records without shipping them
    Blackhole,
    /// Print records as JSON lines
    Stdout,
}
