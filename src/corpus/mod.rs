//! The corpus on disk: discovery, categorization and content hashing

pub mod hasher;
pub mod scanner;

pub use scanner::{CorpusScanner, ScanResult, UnreadablePath};

use crate::extract::Format;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// A file discovered by a scan, ready to be diffed
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Corpus-relative path with `/` separators; the file's identity
    pub path: String,
    pub abs_path: PathBuf,
    pub category: String,
    pub format: Format,
    /// Content hash of the raw bytes
    pub hash: String,
    pub size: u64,
    /// Advisory only, never used for change detection
    pub modified: Option<DateTime<Utc>>,
}
