// SPDX-License-Identifier: Apache-2.0

//! Persistence for checkpoint state.
//!
//! Each component owns one JSON document under the work directory, replaced
//! atomically on every write.

mod json_file;
mod schema;

pub use json_file::JsonStateFile;
pub use schema::{CHECKPOINT_STATE_VERSION, PersistedCheckpointV1, PersistedFileEntryV1};
