// SPDX-License-Identifier: Apache-2.0

mod file_id;
mod fingerprint;
mod identity;
mod matcher;
mod reader;

pub use file_id::FileId;
pub use fingerprint::{FINGERPRINT_SIZE, Fingerprint};
pub use identity::LogFileIdentity;
pub use matcher::FileMatcher;
pub use reader::{Line, LineReader};

pub(crate) use matcher::sort_generations;
