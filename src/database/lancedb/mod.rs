// LanceDB vector database module
// Handles vector storage and similarity search for embeddings


pub mod vector_store;

use crate::embeddings::Chunk;
use crate::{RagError, Result};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    pub vector: Vec<f32>,
    /// The chunk text the vector was computed from
    pub content: String,
    pub metadata: RecordMetadata,
}

/// Metadata stored alongside each embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Path of the file the chunk came from
    pub source: String,
    /// Zero-based PDF page, absent for text files
    pub page: Option<u32>,
    /// Byte offset of the chunk inside its source document
    pub start_index: u32,
    /// Index of this chunk within its source document
    pub chunk_index: u32,
    /// RFC 3339 timestamp of the ingestion run that wrote the record
    pub ingested_at: String,
}

impl EmbeddingRecord {
    #[inline]
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>, ingested_at: &str) -> Result<Self> {
        let to_u32 = |value: usize, what: &str| {
            u32::try_from(value).map_err(|_| {
                RagError::Database(format!("{} {} does not fit the store schema", what, value))
            })
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            content: chunk.text.clone(),
            metadata: RecordMetadata {
                source: chunk.metadata.source.clone(),
                page: chunk.metadata.page,
                start_index: to_u32(chunk.metadata.start_index, "Start index")?,
                chunk_index: to_u32(chunk.chunk_index, "Chunk index")?,
                ingested_at: ingested_at.to_string(),
            },
        })
    }
}
