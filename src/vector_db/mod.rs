// LanceDB is the default embedded vector index (no server required)
pub mod lance_client;
pub use lance_client::LanceVectorIndex;

// In-process index, used by tests and dry runs
pub mod memory;
pub use memory::{IndexOp, MemoryVectorIndex};

use crate::types::ChunkMetadata;
use anyhow::Result;

/// Trait for the vector index the corpus is projected into
///
/// Entries are keyed by chunk id. Both mutations are idempotent: upserting an
/// existing id overwrites it and deleting an unknown id is a no-op.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite entries; all vectors are the same length
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        contents: Vec<String>,
    ) -> Result<()>;

    /// Delete entries by id
    async fn delete(&self, ids: Vec<String>) -> Result<()>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Number of stored entries
    async fn count(&self) -> Result<usize>;
}

/// Check that the parallel upsert arguments line up
pub(crate) fn check_upsert_lengths(
    ids: &[String],
    vectors: &[Vec<f32>],
    metadata: &[ChunkMetadata],
    contents: &[String],
) -> Result<()> {
    let n = ids.len();
    if vectors.len() != n || metadata.len() != n || contents.len() != n {
        anyhow::bail!(
            "Mismatched upsert arguments: {} ids, {} vectors, {} metadata, {} contents",
            n,
            vectors.len(),
            metadata.len(),
            contents.len()
        );
    }
    if let Some(first) = vectors.first()
        && vectors.iter().any(|v| v.len() != first.len())
    {
        anyhow::bail!("Vectors in one upsert must share a dimension");
    }
    Ok(())
}
