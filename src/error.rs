/// Centralized error types for knowledge-sync using thiserror
///
/// Per-file errors (extraction, embedding, index) are caught at the file
/// boundary and folded into the pass summary. Pass-level errors (config, state,
/// lock) abort before any mutation is attempted.
use crate::extract::Format;
use thiserror::Error;

/// Main error type for a sync pass
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),

    #[error("Another sync is already running (lock held on {lock_path})")]
    AlreadySyncing { lock_path: String },

    #[error("Corpus root not found: {0}")]
    CorpusNotFound(String),

    #[error("Cannot read corpus at '{path}': {cause}")]
    ScanFailed { path: String, cause: String },

    #[error("{0}")]
    Other(String),
}

/// Errors raised while turning a source file into text
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to extract '{path}': {cause}")]
    Failed { path: String, cause: String },

    #[error("Format unavailable in this run: {format}")]
    FormatUnavailable { format: Format },

    #[error("Extraction of '{path}' timed out after {secs} seconds")]
    Timeout { path: String, secs: u64 },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding task panicked: {0}")]
    TaskFailed(String),
}

/// Errors related to vector index mutations
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to upsert {count} entries: {reason}")]
    UpsertFailed { count: usize, reason: String },

    #[error("Failed to delete {count} entries: {reason}")]
    DeleteFailed { count: usize, reason: String },

    #[error("Failed to clear vector index: {0}")]
    ClearFailed(String),

    #[error("Vector index call timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to the persisted sync state
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Sync state at '{path}' is corrupt ({reason}); run a forced rebuild")]
    Corrupt { path: String, reason: String },

    #[error(
        "Sync state at '{path}' has schema version {found}, expected {expected}; run a forced rebuild"
    )]
    UnsupportedVersion {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("Failed to save sync state to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Other(format!("{:#}", err))
    }
}

impl SyncError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        SyncError::Other(msg.into())
    }

    /// True when the error means incremental mode cannot run and `force` is required
    pub fn requires_force(&self) -> bool {
        matches!(
            self,
            SyncError::State(StateError::Corrupt { .. } | StateError::UnsupportedVersion { .. })
        )
    }

    /// True when the pass never started (lock, state, config), i.e. a non-zero exit
    pub fn is_fatal_for_invocation(&self) -> bool {
        matches!(
            self,
            SyncError::AlreadySyncing { .. }
                | SyncError::Config(_)
                | SyncError::CorpusNotFound(_)
        ) || self.requires_force()
    }
}
