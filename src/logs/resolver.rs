// SPDX-License-Identifier: Apache-2.0

//! Active file determination for a set of rotation generations.

use tracing::debug;

use crate::logs::input::LogFileIdentity;
use crate::logs::input::file::sort_generations;

/// Smallest size at which the active file joins its group.
pub const MIN_ACTIVE_FILE_SIZE_BYTES: u64 = 1024;

/// Classification of matched files for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Eligible files, oldest generation first. Includes the active file when
    /// it passed the size floor.
    pub files: Vec<LogFileIdentity>,
    /// The generation currently being appended to, if it is eligible.
    pub active: Option<LogFileIdentity>,
    /// The newest generation when it was held back by the size floor.
    pub excluded: Option<LogFileIdentity>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ActiveFileResolver {
    min_active_size: u64,
}

impl Default for ActiveFileResolver {
    fn default() -> Self {
        Self {
            min_active_size: MIN_ACTIVE_FILE_SIZE_BYTES,
        }
    }
}

impl ActiveFileResolver {
    pub fn with_min_active_size(min_active_size: u64) -> Self {
        Self { min_active_size }
    }

    pub fn min_active_size(&self) -> u64 {
        self.min_active_size
    }

    /// Split candidates into closed backups and the active file.
    ///
    /// The newest generation is active. Backups are always eligible, whatever
    /// their size; the active file only once it reaches the floor.
    pub fn resolve(&self, mut candidates: Vec<LogFileIdentity>) -> Resolution {
        sort_generations(&mut candidates);

        let Some(newest) = candidates.pop() else {
            return Resolution {
                files: Vec::new(),
                active: None,
                excluded: None,
            };
        };

        if newest.size() < self.min_active_size {
            debug!(
                path = ?newest.path(),
                size = newest.size(),
                floor = self.min_active_size,
                "Active file is below the minimum size, excluding it for this cycle"
            );
            return Resolution {
                files: candidates,
                active: None,
                excluded: Some(newest),
            };
        }

        candidates.push(newest.clone());
        Resolution {
            files: candidates,
            active: Some(newest),
            excluded: None,
        }
    }
}
