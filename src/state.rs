//! Persisted sync state: the ledger of what the vector index currently reflects

use crate::error::StateError;
use crate::extract::Format;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// What the index holds for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Content hash of the bytes that produced `chunk_ids`; empty when invalidated
    pub hash: String,
    pub category: String,
    pub format: Format,
    pub chunk_ids: Vec<String>,
}

/// Sync state, loaded at the start of a pass and committed once at the end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub schema_version: u32,
    /// Corpus-relative path -> record
    pub files: BTreeMap<String, FileRecord>,
    pub total_chunks: usize,
    pub last_sync: Option<DateTime<Utc>>,
    /// Which extractors were available in the run that wrote this state
    #[serde(default)]
    pub format_support: BTreeMap<Format, bool>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            files: BTreeMap::new(),
            total_chunks: 0,
            last_sync: None,
            format_support: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionHeader {
    schema_version: Option<u32>,
}

impl SyncState {
    /// Load state from disk; a missing file is an empty state
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            tracing::debug!("State file {:?} not found, starting with empty state", path);
            return Ok(Self::default());
        }

        let corrupt = |reason: String| StateError::Corrupt {
            path: path.display().to_string(),
            reason,
        };

        let content = fs::read(path).map_err(|e| corrupt(format!("unreadable: {}", e)))?;

        let header: VersionHeader =
            serde_json::from_slice(&content).map_err(|e| corrupt(e.to_string()))?;
        let found = header
            .schema_version
            .ok_or_else(|| corrupt("missing schemaVersion".to_string()))?;
        if found != SCHEMA_VERSION {
            return Err(StateError::UnsupportedVersion {
                path: path.display().to_string(),
                found,
                expected: SCHEMA_VERSION,
            });
        }

        let state: SyncState =
            serde_json::from_slice(&content).map_err(|e| corrupt(e.to_string()))?;

        let recorded = state.recorded_chunks();
        if recorded != state.total_chunks {
            return Err(corrupt(format!(
                "totalChunks is {} but records list {} chunk ids",
                state.total_chunks, recorded
            )));
        }

        tracing::info!(
            "Loaded sync state: {} files, {} chunks",
            state.files.len(),
            state.total_chunks
        );
        Ok(state)
    }

    /// Atomically write state: temp file in the same directory, fsync, rename
    pub fn save(&mut self, path: &Path) -> Result<(), StateError> {
        self.total_chunks = self.recorded_chunks();

        let save_failed = |reason: String| StateError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .map_err(|e| save_failed(format!("failed to create directory: {}", e)))?;
        }

        let content = serde_json::to_vec_pretty(self)
            .map_err(|e| save_failed(format!("failed to serialize: {}", e)))?;

        let tmp_path = temp_path(path);
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()
        };
        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(save_failed(format!("failed to write temp file: {}", e)));
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            save_failed(format!("failed to rename temp file: {}", e))
        })?;

        tracing::debug!("Saved sync state to {:?}", path);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Record the chunks now in the index for `path`
    pub fn record(&mut self, path: String, record: FileRecord) {
        self.files.insert(path, record);
        self.total_chunks = self.recorded_chunks();
    }

    /// Drop the record for `path`, returning it
    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        let removed = self.files.remove(path);
        self.total_chunks = self.recorded_chunks();
        removed
    }

    /// Clear every hash so the next incremental run treats all files as modified
    pub fn invalidate_hashes(&mut self) {
        for record in self.files.values_mut() {
            record.hash.clear();
        }
    }

    pub fn recorded_chunks(&self) -> usize {
        self.files.values().map(|r| r.chunk_ids.len()).sum()
    }
}

/// Sibling temp file used by [`SyncState::save`]
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sync_state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
