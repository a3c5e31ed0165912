use crate::extract::{Format, FormatSupport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata stored alongside every chunk in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Corpus-relative path of the source file (`/` separators)
    pub source: String,
    pub category: String,
    pub format: Format,
    pub chunk_index: usize,
    /// Character offsets into the extracted text
    pub start_char: usize,
    pub end_char: usize,
    /// Content hash of the source file this chunk was produced from
    pub file_hash: String,
}

/// How a sync pass treats existing state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Only added, modified and removed files are processed
    Incremental,
    /// Every scanned file is rebuilt, ignoring recorded hashes
    Force,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Incremental => f.write_str("incremental"),
            SyncMode::Force => f.write_str("force"),
        }
    }
}

/// Why a scanned file took no part in the diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SkipReason {
    UnknownFormat,
    FormatUnavailable { format: Format },
    TooLarge { size: u64, limit: u64 },
    Unreadable { cause: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownFormat => f.write_str("unrecognized format"),
            SkipReason::FormatUnavailable { format } => {
                write!(f, "FormatUnavailable ({})", format)
            }
            SkipReason::TooLarge { size, limit } => {
                write!(f, "TooLarge ({} bytes, limit {})", size, limit)
            }
            SkipReason::Unreadable { cause } => write!(f, "unreadable: {}", cause),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: SkipReason,
}

/// Result of diffing a scan against the sync state; paths are sorted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl ChangeSet {
    /// True when nothing needs to be applied to the index
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// Number of files the apply phase will touch
    pub fn pending(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// Skipped files per unavailable format
    pub fn unavailable_counts(&self) -> BTreeMap<Format, usize> {
        let mut counts = BTreeMap::new();
        for skipped in &self.skipped {
            if let SkipReason::FormatUnavailable { format } = skipped.reason {
                *counts.entry(format).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            modified: self.modified.len(),
            removed: self.removed.len(),
            unchanged: self.unchanged.len(),
            skipped: self.skipped.len(),
            failed: 0,
        }
    }
}

/// File counts printed at the end of every run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Which step of the apply phase failed for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Extraction,
    Embedding,
    Index,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Extraction => f.write_str("extraction"),
            FailureStage::Embedding => f.write_str("embedding"),
            FailureStage::Index => f.write_str("index"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub stage: FailureStage,
    pub error: String,
}

/// Output of `check`: the diff, nothing applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub mode: SyncMode,
    pub counts: ChangeCounts,
    pub changes: ChangeSet,
}

/// Output of a `sync` or `force` pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub mode: Option<SyncMode>,
    pub counts: ChangeCounts,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
    /// Files whose index entries may not match the recorded state yet
    pub unreconciled: Vec<String>,
    pub chunks_upserted: usize,
    pub chunks_deleted: usize,
    /// Total chunks recorded in state after the pass
    pub total_chunks: usize,
    /// Whether the updated state was written to disk
    pub committed: bool,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    /// True when some work was left for the next run
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() || self.cancelled || !self.unreconciled.is_empty()
    }
}

/// Files and chunks under one category or format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub files: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub path: String,
    pub category: String,
    pub format: Format,
    pub chunks: usize,
}

/// Output of `status`: read-only view of the persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub state_path: String,
    pub total_files: usize,
    pub total_chunks: usize,
    pub last_sync: Option<DateTime<Utc>>,
    pub by_category: BTreeMap<String, Totals>,
    pub by_format: BTreeMap<Format, Totals>,
    pub format_support: Vec<FormatSupport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileStatus>,
}
