mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use anyhow::Result;

/// Trait for embedding generation
///
/// Calls are blocking; the sync engine runs them on the blocking pool under a
/// timeout. Vector dimensionality is opaque to the caller.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one embedding per input text, in order
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}
