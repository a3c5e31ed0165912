//! Apply phase: project a change set onto the vector index
//!
//! Removed files are processed first. Each added or modified file is then
//! extracted, chunked and embedded before any index mutation for it, after
//! which its recorded ids are deleted and its new ids upserted. Results are
//! folded into the in-memory state only once every file has finished.

use crate::chunker::{TextChunk, TextChunker};
use crate::config::Config;
use crate::corpus::SourceFile;
use crate::corpus::hasher::chunk_id;
use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, ExtractionError, IndexError};
use crate::extract::ExtractorRegistry;
use crate::state::{FileRecord, SyncState};
use crate::types::{ChangeSet, ChunkMetadata, FailedFile, FailureStage};
use crate::vector_db::VectorIndex;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RETRY_DELAY)
    }
}

/// Run `op` until it succeeds or the retry budget is spent
pub(crate) async fn retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    what,
                    attempt + 1,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Limits and timeouts for one apply phase
#[derive(Debug, Clone, Copy)]
pub struct ApplySettings {
    pub concurrency: usize,
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub extraction_timeout: Duration,
    pub embedding_timeout: Duration,
    pub index_timeout: Duration,
    pub retry: RetryPolicy,
}

impl ApplySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.sync.concurrency.max(1),
            batch_size: config.embedding.batch_size.max(1),
            max_in_flight: config.embedding.max_in_flight.max(1),
            extraction_timeout: Duration::from_secs(config.sync.extraction_timeout_secs),
            embedding_timeout: Duration::from_secs(config.embedding.timeout_secs),
            index_timeout: Duration::from_secs(config.sync.index_timeout_secs),
            retry: RetryPolicy {
                max_retries: config.embedding.max_retries,
                base_delay: Duration::from_millis(config.embedding.retry_base_delay_ms),
            },
        }
    }
}

/// What the apply phase did, for the pass summary
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub failed: Vec<FailedFile>,
    /// Pending files left untouched because the pass was cancelled
    pub cancelled: Vec<String>,
    pub chunks_upserted: usize,
    pub chunks_deleted: usize,
    /// An index mutation failed; the state must not be committed
    pub index_failed: bool,
}

struct Job {
    file: SourceFile,
    previous: Option<FileRecord>,
}

enum FileResult {
    Applied {
        path: String,
        record: FileRecord,
        upserted: usize,
        deleted: usize,
    },
    Failed {
        failure: FailedFile,
        /// The file's recorded ids were deleted before the failure
        record_dropped: bool,
    },
    Cancelled(String),
}

impl FileResult {
    fn failed(
        path: String,
        stage: FailureStage,
        error: impl fmt::Display,
        record_dropped: bool,
    ) -> Self {
        tracing::warn!("Failed to apply {} ({}): {}", path, stage, error);
        FileResult::Failed {
            failure: FailedFile {
                path,
                stage,
                error: error.to_string(),
            },
            record_dropped,
        }
    }
}

/// Drives extraction, embedding and index mutations for one pass
pub struct Applier {
    registry: ExtractorRegistry,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    settings: ApplySettings,
    embed_slots: Arc<Semaphore>,
}

impl Applier {
    pub fn new(
        registry: ExtractorRegistry,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        settings: ApplySettings,
    ) -> Self {
        Self {
            registry,
            chunker,
            embedder,
            index,
            embed_slots: Arc::new(Semaphore::new(settings.max_in_flight)),
            settings,
        }
    }

    /// Apply `changes` to the index and fold the results into `state`
    pub async fn apply(
        &self,
        changes: &ChangeSet,
        files: &[SourceFile],
        state: &mut SyncState,
        cancel: &CancellationToken,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for path in &changes.removed {
            if cancel.is_cancelled() {
                outcome.cancelled.push(path.clone());
                continue;
            }

            let ids = state
                .get(path)
                .map(|r| r.chunk_ids.clone())
                .unwrap_or_default();
            match self.delete_ids(&ids).await {
                Ok(()) => {
                    tracing::info!("Removed {} ({} chunks)", path, ids.len());
                    outcome.chunks_deleted += ids.len();
                    state.remove(path);
                }
                Err(e) => {
                    tracing::warn!("Failed to remove chunks for {}: {}", path, e);
                    outcome.index_failed = true;
                    outcome.failed.push(FailedFile {
                        path: path.clone(),
                        stage: FailureStage::Index,
                        error: e.to_string(),
                    });
                }
            }
        }

        let by_path: HashMap<&str, &SourceFile> =
            files.iter().map(|f| (f.path.as_str(), f)).collect();
        let jobs: Vec<Job> = changes
            .modified
            .iter()
            .chain(&changes.added)
            .filter_map(|path| {
                by_path.get(path.as_str()).map(|file| Job {
                    file: (*file).clone(),
                    previous: state.get(path).cloned(),
                })
            })
            .collect();

        let results: Vec<FileResult> = stream::iter(jobs)
            .map(|job| self.apply_file(job, cancel))
            .buffer_unordered(self.settings.concurrency)
            .collect()
            .await;

        // Single writer: state is only touched once every file has finished
        for result in results {
            match result {
                FileResult::Applied {
                    path,
                    record,
                    upserted,
                    deleted,
                } => {
                    outcome.chunks_upserted += upserted;
                    outcome.chunks_deleted += deleted;
                    state.record(path, record);
                }
                FileResult::Failed {
                    failure,
                    record_dropped,
                } => {
                    if record_dropped {
                        state.remove(&failure.path);
                    }
                    if failure.stage == FailureStage::Index {
                        outcome.index_failed = true;
                    }
                    outcome.failed.push(failure);
                }
                FileResult::Cancelled(path) => outcome.cancelled.push(path),
            }
        }

        outcome.failed.sort_by(|a, b| a.path.cmp(&b.path));
        outcome.cancelled.sort();
        outcome
    }

    async fn apply_file(&self, job: Job, cancel: &CancellationToken) -> FileResult {
        let file = job.file;
        if cancel.is_cancelled() {
            return FileResult::Cancelled(file.path);
        }

        let chunks = match self.extract_and_chunk(&file).await {
            Ok(chunks) => chunks,
            Err(e) => return FileResult::failed(file.path, FailureStage::Extraction, e, false),
        };

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = match self.embed_all(texts, cancel).await {
            Ok(Some(vectors)) => vectors,
            Ok(None) => {
                tracing::info!("Cancelled before indexing {}", file.path);
                return FileResult::Cancelled(file.path);
            }
            Err(e) => return FileResult::failed(file.path, FailureStage::Embedding, e, false),
        };

        let old_ids = job.previous.map(|r| r.chunk_ids).unwrap_or_default();
        if let Err(e) = self.delete_ids(&old_ids).await {
            return FileResult::failed(file.path, FailureStage::Index, e, false);
        }

        let ids: Vec<String> = chunks.iter().map(|c| chunk_id(&file.path, c.index)).collect();
        if !ids.is_empty() {
            let metadata: Vec<ChunkMetadata> = chunks
                .iter()
                .map(|c| ChunkMetadata {
                    source: file.path.clone(),
                    category: file.category.clone(),
                    format: file.format,
                    chunk_index: c.index,
                    start_char: c.start_char,
                    end_char: c.end_char,
                    file_hash: file.hash.clone(),
                })
                .collect();
            let contents: Vec<String> = chunks.into_iter().map(|c| c.text).collect();

            if let Err(e) = self.upsert(&ids, &vectors, &metadata, &contents).await {
                self.discard(&ids).await;
                return FileResult::failed(file.path, FailureStage::Index, e, true);
            }
        }

        tracing::info!(
            "Indexed {} ({} chunks, {} replaced)",
            file.path,
            ids.len(),
            old_ids.len()
        );

        FileResult::Applied {
            upserted: ids.len(),
            deleted: old_ids.len(),
            record: FileRecord {
                hash: file.hash,
                category: file.category,
                format: file.format,
                chunk_ids: ids,
            },
            path: file.path,
        }
    }

    async fn extract_and_chunk(&self, file: &SourceFile) -> Result<Vec<TextChunk>, ExtractionError> {
        let registry = self.registry.clone();
        let chunker = self.chunker;
        let format = file.format;
        let abs_path = file.abs_path.clone();

        let task = tokio::task::spawn_blocking(move || {
            registry
                .extract_as(format, &abs_path)
                .map(|text| chunker.chunk(&text))
        });

        match tokio::time::timeout(self.settings.extraction_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(ExtractionError::Failed {
                path: file.path.clone(),
                cause: format!("extraction task failed: {}", e),
            }),
            Err(_) => Err(ExtractionError::Timeout {
                path: file.path.clone(),
                secs: self.settings.extraction_timeout.as_secs(),
            }),
        }
    }

    /// Embed all texts in batches; `None` if cancelled between batches
    async fn embed_all(
        &self,
        texts: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Vec<f32>>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.settings.batch_size) {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let embedded = retry(self.settings.retry, "Embedding batch", || {
                self.embed_batch(batch.to_vec())
            })
            .await?;
            vectors.extend(embedded);
        }
        Ok(Some(vectors))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let permit = Arc::clone(&self.embed_slots)
            .acquire_owned()
            .await
            .map_err(|e| EmbeddingError::TaskFailed(e.to_string()))?;

        let expected = texts.len();
        let provider = Arc::clone(&self.embedder);
        // The slot stays taken until the model call returns, even past a timeout
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            provider.embed_batch(texts)
        });

        match tokio::time::timeout(self.settings.embedding_timeout, task).await {
            Ok(Ok(Ok(vectors))) if vectors.len() == expected => Ok(vectors),
            Ok(Ok(Ok(vectors))) => Err(EmbeddingError::CountMismatch {
                expected,
                actual: vectors.len(),
            }),
            Ok(Ok(Err(e))) => Err(EmbeddingError::GenerationFailed(format!("{:#}", e))),
            Ok(Err(e)) => Err(EmbeddingError::TaskFailed(e.to_string())),
            Err(_) => Err(EmbeddingError::Timeout(
                self.settings.embedding_timeout.as_secs(),
            )),
        }
    }

    /// Await one index call under the index timeout
    async fn index_call<F>(
        &self,
        call: F,
        on_error: impl FnOnce(String) -> IndexError,
    ) -> Result<(), IndexError>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        match tokio::time::timeout(self.settings.index_timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(on_error(format!("{:#}", e))),
            Err(_) => Err(IndexError::Timeout(self.settings.index_timeout.as_secs())),
        }
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<(), IndexError> {
        if ids.is_empty() {
            return Ok(());
        }
        let count = ids.len();
        retry(self.settings.retry, "Index delete", || {
            self.index_call(self.index.delete(ids.to_vec()), move |reason| {
                IndexError::DeleteFailed { count, reason }
            })
        })
        .await
    }

    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        metadata: &[ChunkMetadata],
        contents: &[String],
    ) -> Result<(), IndexError> {
        let count = ids.len();
        retry(self.settings.retry, "Index upsert", || {
            self.index_call(
                self.index.upsert(
                    ids.to_vec(),
                    vectors.to_vec(),
                    metadata.to_vec(),
                    contents.to_vec(),
                ),
                move |reason| IndexError::UpsertFailed { count, reason },
            )
        })
        .await
    }

    /// Best-effort removal of ids a failed upsert may have left behind
    async fn discard(&self, ids: &[String]) {
        let count = ids.len();
        let result = self
            .index_call(self.index.delete(ids.to_vec()), move |reason| {
                IndexError::DeleteFailed { count, reason }
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("Failed to discard {} attempted chunks: {}", count, e);
        }
    }

    /// Remove every entry from the index
    pub async fn clear_index(&self) -> Result<(), IndexError> {
        self.index_call(self.index.clear(), IndexError::ClearFailed)
            .await
    }
}
