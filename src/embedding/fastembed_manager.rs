use super::EmbeddingProvider;
use anyhow::{Context, Result, anyhow, bail};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based embedding provider running the model locally
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    model_name: String,
}

impl FastEmbedManager {
    /// Create a manager for a model given by its configured name
    pub fn from_name(name: &str) -> Result<Self> {
        let model = model_from_name(name)?;
        tracing::info!("Initializing FastEmbed model: {} ({:?})", name, model);

        let embedding_model = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(true),
        )
        .context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            model_name: name.to_string(),
        })
    }
}

/// Map a configured model name to a FastEmbed model
pub(crate) fn model_from_name(name: &str) -> Result<EmbeddingModel> {
    let normalized = name.to_ascii_lowercase();
    let normalized = normalized
        .trim_start_matches("sentence-transformers/")
        .trim_start_matches("baai/")
        .trim_start_matches("nomic-ai/")
        .trim_start_matches("intfloat/");

    match normalized {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        other => bail!(
            "Unknown embedding model: '{}'. Supported models: \
             all-MiniLM-L6-v2, all-MiniLM-L12-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             bge-large-en-v1.5, nomic-embed-text-v1.5, multilingual-e5-small, multilingual-e5-base",
            other
        ),
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let batch_size = texts.len();
        let mut model = self
            .model
            .lock()
            .map_err(|_| anyhow!("Embedding model lock poisoned"))?;
        model
            .embed(texts, Some(batch_size))
            .context("Failed to generate embeddings")
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_from_name() {
        assert!(matches!(
            model_from_name("all-MiniLM-L6-v2").unwrap(),
            EmbeddingModel::AllMiniLML6V2
        ));
        assert!(matches!(
            model_from_name("sentence-transformers/all-MiniLM-L6-v2").unwrap(),
            EmbeddingModel::AllMiniLML6V2
        ));
        assert!(matches!(
            model_from_name("BAAI/bge-small-en-v1.5").unwrap(),
            EmbeddingModel::BGESmallENV15
        ));
        assert!(matches!(
            model_from_name("bge-base-en-v1.5").unwrap(),
            EmbeddingModel::BGEBaseENV15
        ));
    }

    #[test]
    fn test_unknown_model_rejected() {
        let err = model_from_name("gpt-embeddings-9000").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding model"));
    }
}
