#[cfg(test)]
mod tests;

use super::{EmbeddingRecord, RecordMetadata};
use crate::{RagError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Vector database store using LanceDB for similarity search
pub struct VectorStore {
    table: Table,
    collection: String,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub content: String,
    pub metadata: RecordMetadata,
    /// L2 distance to the query vector; smaller is more similar
    pub distance: f32,
}

impl VectorStore {
    /// Remove the persist directory and everything in it, then recreate it empty
    #[inline]
    pub fn reset_directory(persist_dir: &Path) -> Result<()> {
        if persist_dir.exists() {
            info!("Removing existing vector store at {}", persist_dir.display());
            fs::remove_dir_all(persist_dir).map_err(|e| {
                RagError::Database(format!(
                    "Failed to remove vector store directory {}: {}",
                    persist_dir.display(),
                    e
                ))
            })?;
        }

        fs::create_dir_all(persist_dir).map_err(|e| {
            RagError::Database(format!(
                "Failed to create vector store directory {}: {}",
                persist_dir.display(),
                e
            ))
        })?;
        Ok(())
    }

    /// Create a fresh collection table with the given vector dimension.
    ///
    /// An existing table with the same name is dropped.
    #[inline]
    pub async fn create(persist_dir: &Path, collection: &str, vector_dim: usize) -> Result<Self> {
        if vector_dim == 0 {
            return Err(RagError::Database(
                "Cannot create a collection with zero-dimensional vectors".to_string(),
            ));
        }

        fs::create_dir_all(persist_dir).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let connection = Self::connect(persist_dir).await?;

        let table_names = list_tables(&connection).await?;
        if table_names.iter().any(|name| name == collection) {
            info!("Dropping existing table {}", collection);
            connection
                .drop_table(collection)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
        }

        let table = connection
            .create_empty_table(collection, create_schema(vector_dim))
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

        info!(
            "Created collection {} with {} dimensions at {}",
            collection,
            vector_dim,
            persist_dir.display()
        );

        Ok(Self {
            table,
            collection: collection.to_string(),
            vector_dimension: vector_dim,
        })
    }

    /// Open an existing collection for querying.
    ///
    /// A missing or empty persist directory, or a missing table, is reported as
    /// [`RagError::StoreNotFound`].
    #[inline]
    pub async fn open(persist_dir: &Path, collection: &str) -> Result<Self> {
        let has_contents =
            fs::read_dir(persist_dir).is_ok_and(|mut entries| entries.next().is_some());
        if !has_contents {
            return Err(RagError::StoreNotFound(persist_dir.to_path_buf()));
        }

        let connection = Self::connect(persist_dir).await?;

        let table_names = list_tables(&connection).await?;
        if !table_names.iter().any(|name| name == collection) {
            warn!(
                "Collection {} not found in {} (tables: {:?})",
                collection,
                persist_dir.display(),
                table_names
            );
            return Err(RagError::StoreNotFound(persist_dir.to_path_buf()));
        }

        let table = connection
            .open_table(collection)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

        let vector_dimension = detect_vector_dimension(&table).await?;
        info!(
            "Opened collection {} ({} dimensions) at {}",
            collection,
            vector_dimension,
            persist_dir.display()
        );

        Ok(Self {
            table,
            collection: collection.to_string(),
            vector_dimension,
        })
    }

    async fn connect(persist_dir: &Path) -> Result<Connection> {
        let db_path = fs::canonicalize(persist_dir).map_err(|e| {
            RagError::Database(format!(
                "Failed to resolve vector store path {}: {}",
                persist_dir.display(),
                e
            ))
        })?;
        debug!("Connecting to LanceDB at path: {:?}", db_path);

        let uri = format!("file://{}", db_path.display());
        lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Store multiple embeddings in a batch
    #[inline]
    pub async fn add_records(&self, records: &[EmbeddingRecord]) -> Result<()> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        let record_batch = self.create_record_batch(records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert embeddings: {}", e)))?;

        info!("Successfully stored {} embeddings", records.len());
        Ok(())
    }

    /// Create a RecordBatch from embedding records
    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let vector_dim = self.vector_dimension;

        let mut ids = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * vector_dim);
        let mut contents = Vec::with_capacity(len);
        let mut sources = Vec::with_capacity(len);
        let mut pages = Vec::with_capacity(len);
        let mut start_indices = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut ingested_ats = Vec::with_capacity(len);

        for record in records {
            if record.vector.len() != vector_dim {
                return Err(RagError::Database(format!(
                    "Embedding {} has {} dimensions, expected {}",
                    record.id,
                    record.vector.len(),
                    vector_dim
                )));
            }
            ids.push(record.id.as_str());
            flat_values.extend_from_slice(&record.vector);
            contents.push(record.content.as_str());
            sources.push(record.metadata.source.as_str());
            pages.push(record.metadata.page);
            start_indices.push(record.metadata.start_index);
            chunk_indices.push(record.metadata.chunk_index);
            ingested_ats.push(record.metadata.ingested_at.as_str());
        }

        let dim = i32::try_from(vector_dim)
            .map_err(|_| RagError::Database(format!("Vector dimension {} too large", vector_dim)))?;
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, dim, Arc::new(Float32Array::from(flat_values)), None)
                .map_err(|e| {
                    RagError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(pages)),
            Arc::new(UInt32Array::from(start_indices)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(ingested_ats)),
        ];

        RecordBatch::try_new(create_schema(vector_dim), arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Return the `limit` records nearest to `query_vector`, closest first
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        if query_vector.len() != self.vector_dimension {
            return Err(RagError::Database(format!(
                "Query vector has {} dimensions but the collection stores {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        let mut results = self
            .table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    /// Get the total number of embeddings stored
    #[inline]
    pub async fn count_records(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }
}

async fn list_tables(connection: &Connection) -> Result<Vec<String>> {
    connection
        .table_names()
        .execute()
        .await
        .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))
}

/// Read the vector dimension from an existing table's schema
async fn detect_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

    schema
        .fields()
        .iter()
        .find(|field| field.name() == "vector")
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
        .ok_or_else(|| {
            RagError::Database("Could not find vector column or determine dimension".to_string())
        })
}

/// Create schema with the specified vector dimension
fn create_schema(vector_dim: usize) -> Arc<Schema> {
    let dim = i32::try_from(vector_dim).unwrap_or(i32::MAX);
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), dim),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, true),
        Field::new("start_index", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("ingested_at", DataType::Utf8, false),
    ]))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

/// Parse a single record batch from search results
fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let pages = u32_column(batch, "page")?;
    let start_indices = u32_column(batch, "start_index")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;
    let ingested_ats = string_column(batch, "ingested_at")?;

    // Extract distance scores if available
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let results = (0..batch.num_rows())
        .map(|row| SearchResult {
            content: contents.value(row).to_string(),
            metadata: RecordMetadata {
                source: sources.value(row).to_string(),
                page: (!pages.is_null(row)).then(|| pages.value(row)),
                start_index: start_indices.value(row),
                chunk_index: chunk_indices.value(row),
                ingested_at: ingested_ats.value(row).to_string(),
            },
            distance: distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
        })
        .collect();

    Ok(results)
}
