// Embeddings module
// Text splitting and the Azure OpenAI embedding client

pub mod azure;
pub mod chunking;

use anyhow::Result;

pub use azure::AzureEmbeddings;
pub use chunking::{Chunk, ChunkMetadata, ChunkingConfig, chunk_documents, split_text};

/// Turns text into fixed-length vectors. Documents and queries must go through
/// the same model for similarity scores to be meaningful.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Verify the backend is reachable before doing expensive work
    #[inline]
    fn health_check(&self) -> Result<()> {
        self.embed_query("health check").map(|_| ())
    }
}
