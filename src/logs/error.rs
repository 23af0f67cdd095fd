// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transient IO error on {path:?}: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Checkpoint for component {component} is corrupted: {reason}")]
    CheckpointCorruption { component: String, reason: String },

    #[error("Component {component} uses {usage} bytes, over its limit of {limit} bytes")]
    RetentionOverBudget {
        component: String,
        usage: u64,
        limit: u64,
    },

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Errors that are expected to clear up on a later refresh cycle.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::TransientIo { .. } | Error::Io(_) | Error::Upload(_) | Error::Cancelled
        )
    }

    pub(crate) fn transient(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::TransientIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
