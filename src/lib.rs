//! # Knowledge Sync - incremental sync of a document corpus into a vector index
//!
//! Keeps a semantic search index consistent with a file-based knowledge corpus
//! by doing as little work as possible on each run: only new, changed and
//! deleted documents are extracted, re-chunked, embedded and written.
//!
//! ## Overview
//!
//! A sync pass has four phases:
//!
//! 1. **Scan**: walk the corpus, categorize files by top-level directory,
//!    detect the format by extension and hash the raw bytes
//! 2. **Diff**: compare hashes against the persisted sync state
//! 3. **Apply**: delete chunk ids of removed and modified files, then
//!    extract, chunk, embed and upsert added and modified files
//! 4. **Commit**: atomically write the new sync state once every index
//!    mutation has succeeded
//!
//! ## Architecture
//!
//! ```text
//! corpus/ ──► CorpusScanner ──► compute_changes ◄── SyncState (JSON)
//!                                     │
//!                                     ▼
//!            ExtractorRegistry ──► TextChunker ──► EmbeddingProvider
//!                                                        │
//!                                                        ▼
//!                                                  VectorIndex (LanceDB)
//! ```
//!
//! ## Modules
//!
//! - [`corpus`]: corpus walking, categorization and content hashing
//! - [`extract`]: per-format text extractors behind an explicit registry
//! - [`chunker`]: separator-priority chunking with overlap
//! - [`embedding`]: embedding provider trait and FastEmbed implementation
//! - [`vector_db`]: vector index trait, LanceDB and in-memory implementations
//! - [`state`]: versioned, atomically written sync state
//! - [`sync`]: the orchestrator tying the phases together
//! - [`config`]: configuration with environment variable overrides
//! - [`report`]: text rendering of reports for the CLI
//!
//! ## Usage Example
//!
//! ```no_run
//! use knowledge_sync::config::Config;
//! use knowledge_sync::embedding::FastEmbedManager;
//! use knowledge_sync::sync::{SyncClients, SyncEngine};
//! use knowledge_sync::types::SyncMode;
//! use knowledge_sync::vector_db::LanceVectorIndex;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let index = LanceVectorIndex::with_path(
//!         &config.vector_db.lancedb_path.to_string_lossy(),
//!         &config.vector_db.table_name,
//!     )
//!     .await?;
//!     let clients = SyncClients {
//!         embedder: Arc::new(FastEmbedManager::from_name(&config.embedding.model_name)?),
//!         index: Arc::new(index),
//!     };
//!
//!     let engine = SyncEngine::new(config)?;
//!     let report = engine
//!         .sync(&clients, SyncMode::Incremental, CancellationToken::new())
//!         .await?;
//!     println!("{} chunks indexed", report.total_chunks);
//!     Ok(())
//! }
//! ```

/// Separator-priority text chunking with overlap
pub mod chunker;

/// Configuration management with environment variable overrides
pub mod config;

/// Corpus scanning and content hashing
pub mod corpus;

/// Embedding generation using FastEmbed (all-MiniLM-L6-v2)
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Per-format text extraction
pub mod extract;

/// Include/exclude glob matching for corpus paths
pub mod glob_utils;

/// Platform default locations
pub mod paths;

/// Text rendering of reports
pub mod report;

/// Persisted sync state
pub mod state;

/// Sync orchestrator: scan, diff, apply, commit
pub mod sync;

/// Change sets, reports and chunk metadata
pub mod types;

/// Vector index abstraction with LanceDB and in-memory backends
pub mod vector_db;
