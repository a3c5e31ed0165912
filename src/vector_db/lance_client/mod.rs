//! LanceDB vector index client
//!
//! The table is created lazily on the first upsert, with the vector dimension
//! taken from that batch. Upserts delete any existing rows with the same ids
//! before appending, so re-upserting an id overwrites it.

use crate::types::ChunkMetadata;
use crate::vector_db::{VectorIndex, check_upsert_lengths};
use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array,
    types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// Maximum ids per `id IN (...)` delete predicate
const DELETE_BATCH: usize = 256;

/// LanceDB vector index implementation (embedded, no server required)
pub struct LanceVectorIndex {
    connection: Connection,
    table_name: String,
    db_path: String,
}

impl LanceVectorIndex {
    /// Connect to (or create) the database at `db_path`
    pub async fn with_path(db_path: &str, table_name: &str) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            table_name: table_name.to_string(),
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Create schema for the chunks table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("format", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("start_char", DataType::UInt32, false),
            Field::new("end_char", DataType::UInt32, false),
            Field::new("file_hash", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    async fn table_exists(&self) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Option<Table>> {
        if !self.table_exists().await? {
            return Ok(None);
        }
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")?;
        Ok(Some(table))
    }

    /// Open the table, creating it empty with `dimension` if needed
    async fn ensure_table(&self, dimension: usize) -> Result<Table> {
        if let Some(table) = self.open_table().await? {
            return Ok(table);
        }

        tracing::info!(
            "Creating table '{}' with dimension {} at {}",
            self.table_name,
            dimension,
            self.db_path
        );

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")
    }

    /// Convert one upsert into a RecordBatch
    fn create_record_batch(
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        metadata: &[ChunkMetadata],
        contents: Vec<String>,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let dimension = vectors.first().map(|v| v.len()).unwrap_or(0);

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            vectors.into_iter().map(|v| Some(v.into_iter().map(Some))),
            dimension as i32,
        );

        let id_array = StringArray::from(ids);
        let source_array =
            StringArray::from(metadata.iter().map(|m| m.source.as_str()).collect::<Vec<_>>());
        let category_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.category.as_str())
                .collect::<Vec<_>>(),
        );
        let format_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.format.as_str())
                .collect::<Vec<_>>(),
        );
        let chunk_index_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.chunk_index as u32)
                .collect::<Vec<_>>(),
        );
        let start_char_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.start_char as u32)
                .collect::<Vec<_>>(),
        );
        let end_char_array = UInt32Array::from(
            metadata
                .iter()
                .map(|m| m.end_char as u32)
                .collect::<Vec<_>>(),
        );
        let file_hash_array = StringArray::from(
            metadata
                .iter()
                .map(|m| m.file_hash.as_str())
                .collect::<Vec<_>>(),
        );
        let content_array = StringArray::from(contents);

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(source_array),
                Arc::new(category_array),
                Arc::new(format_array),
                Arc::new(chunk_index_array),
                Arc::new(start_char_array),
                Arc::new(end_char_array),
                Arc::new(file_hash_array),
                Arc::new(content_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    async fn delete_ids(table: &Table, ids: &[String]) -> Result<()> {
        for group in ids.chunks(DELETE_BATCH) {
            let filter = id_filter(group);
            table
                .delete(&filter)
                .await
                .context("Failed to delete records")?;
        }
        Ok(())
    }

    /// All stored ids
    pub async fn ids(&self) -> Result<Vec<String>> {
        let Some(table) = self.open_table().await? else {
            return Ok(Vec::new());
        };

        let stream = table
            .query()
            .select(lancedb::query::Select::Columns(vec!["id".to_string()]))
            .execute()
            .await
            .context("Failed to query ids")?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect ids")?;

        let mut ids = Vec::new();
        for batch in batches {
            let id_array = batch
                .column_by_name("id")
                .context("Missing id column")?
                .as_any()
                .downcast_ref::<StringArray>()
                .context("Invalid id type")?;
            for i in 0..id_array.len() {
                ids.push(id_array.value(i).to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// SQL predicate matching any of `ids`; single quotes are doubled
fn id_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("'{}'", id.replace('\'', "''")))
        .collect();
    format!("id IN ({})", quoted.join(", "))
}

#[async_trait::async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
        contents: Vec<String>,
    ) -> Result<()> {
        check_upsert_lengths(&ids, &vectors, &metadata, &contents)?;
        if ids.is_empty() {
            return Ok(());
        }

        let dimension = vectors[0].len();
        let table = self.ensure_table(dimension).await?;
        Self::delete_ids(&table, &ids).await?;

        let schema = Self::create_schema(dimension);
        let count = ids.len();
        let batch = Self::create_record_batch(ids, vectors, &metadata, contents, schema.clone())?;
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Upserted {} chunks into '{}'", count, self.table_name);
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let Some(table) = self.open_table().await? else {
            return Ok(());
        };
        Self::delete_ids(&table, &ids).await?;
        tracing::debug!("Deleted {} chunk ids from '{}'", ids.len(), self.table_name);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if !self.table_exists().await? {
            return Ok(());
        }
        self.connection
            .drop_table(&self.table_name, &[])
            .await
            .context("Failed to drop table")?;
        tracing::info!("Dropped table '{}'", self.table_name);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        match self.open_table().await? {
            Some(table) => Ok(table
                .count_rows(None)
                .await
                .context("Failed to count rows")?),
            None => Ok(0),
        }
    }
}
