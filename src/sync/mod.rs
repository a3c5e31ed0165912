//! Sync orchestrator: scan, diff, apply, commit
//!
//! One [`SyncEngine`] is built per configuration. Each pass holds an advisory
//! lock next to the state file, so a second concurrent pass fails fast with
//! [`SyncError::AlreadySyncing`] instead of interleaving.

pub mod apply;
pub mod diff;
pub mod fs_lock;

pub use apply::{ApplySettings, RetryPolicy};
pub use diff::compute_changes;
pub use fs_lock::FsLockGuard;

use crate::chunker::TextChunker;
use crate::config::Config;
use crate::corpus::{CorpusScanner, ScanResult};
use crate::embedding::EmbeddingProvider;
use crate::error::SyncError;
use crate::extract::{ExtractorRegistry, Format};
use crate::state::{self, SyncState};
use crate::types::{
    ChangeSet, CheckReport, FileStatus, StatusReport, SyncMode, SyncReport, Totals,
};
use crate::vector_db::VectorIndex;
use apply::Applier;
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// External collaborators a pass writes through
#[derive(Clone)]
pub struct SyncClients {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<dyn VectorIndex>,
}

pub struct SyncEngine {
    config: Config,
    registry: ExtractorRegistry,
    scanner: Arc<CorpusScanner>,
    chunker: TextChunker,
    state_path: PathBuf,
    lock_path: PathBuf,
}

impl SyncEngine {
    /// Validate `config` and build the registry, scanner and chunker
    ///
    /// Fails with a configuration error before anything is touched on disk.
    pub fn new(config: Config) -> Result<Self, SyncError> {
        config.validate()?;

        let registry = ExtractorRegistry::new(&config.sync.disabled_formats);
        let chunker = TextChunker::from_config(&config.chunking)?;
        let state_path = config.sync.state_path.clone();
        let lock_path = fs_lock::lock_path_for(&state_path);

        // The state may live inside the corpus; never index our own files
        let scanner = CorpusScanner::new(&config.corpus, registry.clone())?
            .with_threads(config.sync.concurrency)
            .with_ignored_path(state_path.clone())
            .with_ignored_path(state::temp_path(&state_path))
            .with_ignored_path(lock_path.clone());

        Ok(Self {
            config,
            registry,
            scanner: Arc::new(scanner),
            chunker,
            state_path,
            lock_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Scan and diff against the recorded state without mutating anything
    pub async fn check(&self) -> Result<CheckReport, SyncError> {
        let state = SyncState::load(&self.state_path)?;
        let scan = self.scan().await?;
        let changes = compute_changes(&scan, &state, SyncMode::Incremental);
        warn_unavailable(&changes);

        tracing::info!(
            "Check: {} added, {} modified, {} removed, {} unchanged, {} skipped",
            changes.added.len(),
            changes.modified.len(),
            changes.removed.len(),
            changes.unchanged.len(),
            changes.skipped.len()
        );

        Ok(CheckReport {
            mode: SyncMode::Incremental,
            counts: changes.counts(),
            changes,
        })
    }

    /// Run one full pass
    ///
    /// Incremental mode refuses to run on a corrupt state file. Force mode
    /// rebuilds every scanned file; if the prior state is unreadable it clears
    /// the index and starts from an empty state.
    pub async fn sync(
        &self,
        clients: &SyncClients,
        mode: SyncMode,
        cancel: CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let started = Instant::now();

        let _lock = FsLockGuard::try_acquire(&self.lock_path)?.ok_or_else(|| {
            SyncError::AlreadySyncing {
                lock_path: self.lock_path.display().to_string(),
            }
        })?;

        let loaded = match SyncState::load(&self.state_path) {
            Ok(state) => Some(state),
            Err(e) if mode == SyncMode::Force => {
                tracing::warn!("Discarding unreadable sync state: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let scan = self.scan().await?;

        let applier = Applier::new(
            self.registry.clone(),
            self.chunker,
            Arc::clone(&clients.embedder),
            Arc::clone(&clients.index),
            ApplySettings::from_config(&self.config),
        );

        let mut state = match loaded {
            Some(mut state) if mode == SyncMode::Force => {
                // A crash mid-rebuild must leave every file pending
                state.invalidate_hashes();
                state.save(&self.state_path)?;
                state
            }
            Some(state) => state,
            None => {
                tracing::info!("Clearing vector index before rebuild");
                applier.clear_index().await?;
                SyncState::default()
            }
        };

        let changes = compute_changes(&scan, &state, mode);
        warn_unavailable(&changes);

        let mut report = SyncReport {
            mode: Some(mode),
            counts: changes.counts(),
            skipped: changes.skipped.clone(),
            ..SyncReport::default()
        };

        if mode == SyncMode::Incremental && changes.is_empty() {
            tracing::info!(
                "Nothing to sync: {} files unchanged",
                changes.unchanged.len()
            );
            report.total_chunks = state.total_chunks;
            report.duration_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        tracing::info!(
            "Applying {} changes ({} mode) with {}: {} added, {} modified, {} removed",
            changes.pending(),
            mode,
            clients.embedder.model_name(),
            changes.added.len(),
            changes.modified.len(),
            changes.removed.len()
        );

        let outcome = applier
            .apply(&changes, &scan.files, &mut state, &cancel)
            .await;

        report.chunks_upserted = outcome.chunks_upserted;
        report.chunks_deleted = outcome.chunks_deleted;
        report.cancelled = !outcome.cancelled.is_empty();
        report.counts.failed = outcome.failed.len();

        if outcome.index_failed {
            tracing::warn!(
                "Index mutations failed; leaving sync state at {:?} untouched",
                self.state_path
            );
            report.unreconciled = pending_paths(&changes);
        } else {
            state.last_sync = Some(Utc::now());
            state.format_support = self
                .registry
                .support()
                .into_iter()
                .map(|s| (s.format, s.available))
                .collect();
            state.save(&self.state_path)?;
            report.committed = true;

            let mut unreconciled: Vec<String> = outcome
                .failed
                .iter()
                .map(|f| f.path.clone())
                .chain(outcome.cancelled.iter().cloned())
                .collect();
            unreconciled.sort();
            unreconciled.dedup();
            report.unreconciled = unreconciled;

            index_drift(clients.index.as_ref(), state.recorded_chunks()).await;
        }

        report.failed = outcome.failed;
        report.total_chunks = state.recorded_chunks();
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "Sync finished in {}ms: {} chunks upserted, {} deleted, {} failed, committed={}",
            report.duration_ms,
            report.chunks_upserted,
            report.chunks_deleted,
            report.failed.len(),
            report.committed
        );

        Ok(report)
    }

    /// Totals of the persisted state, by category and by format
    pub fn status(&self, include_files: bool) -> Result<StatusReport, SyncError> {
        let state = SyncState::load(&self.state_path)?;

        let mut by_category: BTreeMap<String, Totals> = BTreeMap::new();
        let mut by_format: BTreeMap<Format, Totals> = BTreeMap::new();
        let mut files = Vec::new();

        for (path, record) in &state.files {
            let chunks = record.chunk_ids.len();

            let totals = by_category.entry(record.category.clone()).or_default();
            totals.files += 1;
            totals.chunks += chunks;

            let totals = by_format.entry(record.format).or_default();
            totals.files += 1;
            totals.chunks += chunks;

            if include_files {
                files.push(FileStatus {
                    path: path.clone(),
                    category: record.category.clone(),
                    format: record.format,
                    chunks,
                });
            }
        }

        Ok(StatusReport {
            state_path: self.state_path.display().to_string(),
            total_files: state.files.len(),
            total_chunks: state.total_chunks,
            last_sync: state.last_sync,
            by_category,
            by_format,
            format_support: self.registry.support(),
            files,
        })
    }

    async fn scan(&self) -> Result<ScanResult, SyncError> {
        let scanner = Arc::clone(&self.scanner);
        tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| SyncError::other(format!("Scan task failed: {}", e)))?
    }
}

/// Log each unavailable format once per run
fn warn_unavailable(changes: &ChangeSet) {
    for (format, count) in changes.unavailable_counts() {
        tracing::warn!(
            "{} {} file(s) skipped: format unavailable in this build or disabled",
            count,
            format.label()
        );
    }
}

/// Row count of the index when it disagrees with the committed state
async fn index_drift(index: &dyn VectorIndex, recorded: usize) -> Option<usize> {
    match index.count().await {
        Ok(rows) if rows != recorded => {
            tracing::warn!(
                "Vector index holds {} chunks but the sync state records {}; run a force sync to rebuild",
                rows,
                recorded
            );
            Some(rows)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Could not count vector index rows: {:#}", e);
            None
        }
    }
}

fn pending_paths(changes: &ChangeSet) -> Vec<String> {
    let mut paths: Vec<String> = changes
        .added
        .iter()
        .chain(&changes.modified)
        .chain(&changes.removed)
        .cloned()
        .collect();
    paths.sort();
    paths
}
