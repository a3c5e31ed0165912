//! In-memory vector index with an operation log

use super::{VectorIndex, check_upsert_lengths};
use crate::types::ChunkMetadata;
use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
    pub content: String,
}

/// One mutation as received by the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    Upsert(Vec<String>),
    Delete(Vec<String>),
    Clear,
}

#[derive(Debug, Default)]
pub struct MemoryVectorIndex {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
    log: Mutex<Vec<IndexOp>>,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored ids, sorted
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<MemoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    /// Ids whose metadata names `source` as their file
    pub fn ids_for_source(&self, source: &str) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(_, entry)| entry.metadata.source == source)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the operation log
    pub fn take_operations(&self) -> Vec<IndexOp> {
        std::mem::take(&mut *self.log.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn record(&self, op: IndexOp) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        contents: Vec<String>,
    ) -> Result<()> {
        check_upsert_lengths(&ids, &vectors, &metadata, &contents)?;
        self.record(IndexOp::Upsert(ids.clone()));

        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire index write lock: {}", e))?;
        for (((id, vector), metadata), content) in
            ids.into_iter().zip(vectors).zip(metadata).zip(contents)
        {
            entries.insert(
                id,
                MemoryEntry {
                    vector,
                    metadata,
                    content,
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire index write lock: {}", e))?;
        for id in &ids {
            entries.remove(id);
        }
        drop(entries);
        self.record(IndexOp::Delete(ids));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire index write lock: {}", e))?
            .clear();
        self.record(IndexOp::Clear);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Format;

    fn meta(source: &str, index: usize) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            category: "faq".to_string(),
            format: Format::PlainText,
            chunk_index: index,
            start_char: 0,
            end_char: 10,
            file_hash: "h".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                vec!["a_0".into()],
                vec![vec![1.0, 0.0]],
                vec![meta("a.txt", 0)],
                vec!["old".into()],
            )
            .await
            .unwrap();
        index
            .upsert(
                vec!["a_0".into()],
                vec![vec![0.0, 1.0]],
                vec![meta("a.txt", 0)],
                vec!["new".into()],
            )
            .await
            .unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.get("a_0").unwrap().content, "new");
    }

    #[tokio::test]
    async fn test_delete_unknown_is_noop() {
        let index = MemoryVectorIndex::new();
        index.delete(vec!["missing".into()]).await.unwrap();
        assert!(index.is_empty());
        assert_eq!(
            index.take_operations(),
            vec![IndexOp::Delete(vec!["missing".into()])]
        );
        assert!(index.take_operations().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_lengths_rejected() {
        let index = MemoryVectorIndex::new();
        let result = index
            .upsert(
                vec!["a_0".into(), "a_1".into()],
                vec![vec![1.0]],
                vec![meta("a.txt", 0)],
                vec!["x".into()],
            )
            .await;
        assert!(result.is_err());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_ids_for_source_and_clear() {
        let index = MemoryVectorIndex::new();
        index
            .upsert(
                vec!["a_0".into(), "b_0".into()],
                vec![vec![1.0], vec![2.0]],
                vec![meta("a.txt", 0), meta("b.txt", 0)],
                vec!["a".into(), "b".into()],
            )
            .await
            .unwrap();

        assert_eq!(index.ids_for_source("a.txt"), vec!["a_0"]);
        assert_eq!(index.count().await.unwrap(), 2);

        index.clear().await.unwrap();
        assert!(index.is_empty());
    }
}
