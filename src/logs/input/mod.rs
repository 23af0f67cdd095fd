// SPDX-License-Identifier: Apache-2.0

pub mod file;

pub use file::{FileId, FileMatcher, Fingerprint, LineReader, LogFileIdentity};
