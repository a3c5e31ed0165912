/// Configuration system for knowledge-sync
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, SyncError};
use crate::extract::Format;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Corpus location and scan filters
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Chunking parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Sync pass configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Root directory; its immediate subdirectories are categories
    #[serde(default = "default_corpus_root")]
    pub root: PathBuf,

    /// Glob patterns a file must match (empty means everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Glob patterns that exclude a file
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Category for files placed directly in the corpus root
    #[serde(default = "default_category")]
    pub default_category: String,
}

/// Chunking configuration (sizes in characters)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Texts per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt of a batch or index call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum embedding batches in flight at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Table holding the chunk vectors
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Sync pass configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sync state file (the lock file sits next to it)
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Files extracted and applied concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Timeout for extracting a single file
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,

    /// Timeout for a single upsert or delete call
    #[serde(default = "default_index_timeout")]
    pub index_timeout_secs: u64,

    /// Formats to treat as unavailable for this deployment
    #[serde(default)]
    pub disabled_formats: Vec<Format>,
}

fn default_corpus_root() -> PathBuf {
    PathBuf::from("data/knowledge")
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/.DS_Store".to_string(),
        "**/~$*".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_category() -> String {
    "general".to_string()
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_max_in_flight() -> usize {
    2
}

fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_table_name() -> String {
    "knowledge_chunks".to_string()
}

fn default_state_path() -> PathBuf {
    crate::paths::PlatformPaths::default_state_path()
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4)
}

fn default_extraction_timeout() -> u64 {
    60
}

fn default_index_timeout() -> u64 {
    30
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            root: default_corpus_root(),
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
            max_file_size: default_max_file_size(),
            default_category: default_category(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            lancedb_path: default_lancedb_path(),
            table_name: default_table_name(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            concurrency: default_concurrency(),
            extraction_timeout_secs: default_extraction_timeout(),
            index_timeout_secs: default_index_timeout(),
            disabled_formats: Vec::new(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> SyncError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, SyncError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be greater than 0"));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(invalid(
                "chunking.chunk_overlap",
                format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.chunking.chunk_size, self.chunking.chunk_overlap
                ),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.embedding.timeout_secs == 0 {
            return Err(invalid("embedding.timeout_secs", "must be greater than 0"));
        }

        if self.embedding.max_in_flight == 0 {
            return Err(invalid("embedding.max_in_flight", "must be greater than 0"));
        }

        if self.sync.concurrency == 0 {
            return Err(invalid("sync.concurrency", "must be greater than 0"));
        }

        if self.sync.extraction_timeout_secs == 0 {
            return Err(invalid(
                "sync.extraction_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.sync.index_timeout_secs == 0 {
            return Err(invalid("sync.index_timeout_secs", "must be greater than 0"));
        }

        if self.corpus.max_file_size == 0 {
            return Err(invalid("corpus.max_file_size", "must be greater than 0"));
        }

        if self.corpus.default_category.trim().is_empty() {
            return Err(invalid("corpus.default_category", "must not be empty"));
        }

        if self.vector_db.table_name.trim().is_empty() {
            return Err(invalid("vector_db.table_name", "must not be empty"));
        }

        for pattern in self
            .corpus
            .include_patterns
            .iter()
            .chain(&self.corpus.exclude_patterns)
        {
            if let Err(e) = globset::Glob::new(pattern) {
                return Err(invalid("corpus patterns", format!("'{}': {}", pattern, e)));
            }
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("KSYNC_CORPUS_ROOT") {
            self.corpus.root = PathBuf::from(root);
        }

        if let Ok(path) = std::env::var("KSYNC_STATE_PATH") {
            self.sync.state_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("KSYNC_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(model) = std::env::var("KSYNC_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(batch_size) = std::env::var("KSYNC_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Ok(concurrency) = std::env::var("KSYNC_CONCURRENCY")
            && let Ok(n) = concurrency.parse()
        {
            self.sync.concurrency = n;
        }
    }

    /// Load from `path` (or the default location), apply env overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self, SyncError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::load_or_default()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
