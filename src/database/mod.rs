// Database module
// Persistent vector storage for chunk embeddings, backed by LanceDB

pub mod lancedb;

pub use self::lancedb::{
    EmbeddingRecord, RecordMetadata,
    vector_store::{SearchResult, VectorStore},
};
