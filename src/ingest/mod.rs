// Ingestion pipeline
// Rebuilds the vector store from every document under the data directory


use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::database::{EmbeddingRecord, VectorStore};
use crate::embeddings::{AzureEmbeddings, Chunk, ChunkingConfig, Embedder, chunk_documents};
use crate::loader::load_directory;
use crate::{RagError, Result};

/// Texts sent to the embedding deployment per request
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// A file that could not be loaded, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files_loaded: usize,
    pub skipped: Vec<SkippedFile>,
    pub documents: usize,
    pub chunks: usize,
    pub records: usize,
}

pub struct Ingestor {
    embedder: Box<dyn Embedder>,
    data_dir: PathBuf,
    persist_dir: PathBuf,
    collection: String,
    chunking: ChunkingConfig,
    batch_size: usize,
    show_progress: bool,
}

impl Ingestor {
    #[inline]
    pub fn new(embedder: Box<dyn Embedder>, settings: &Settings) -> Self {
        Self {
            embedder,
            data_dir: settings.data_dir.clone(),
            persist_dir: settings.persist_dir.clone(),
            collection: settings.collection.clone(),
            chunking: ChunkingConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: console::user_attended_stderr(),
        }
    }

    /// Validate settings and build an ingestor backed by the configured Azure deployment
    #[inline]
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.require_ingest()?;
        let embeddings = AzureEmbeddings::new(&settings.azure)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
        Ok(Self::new(Box::new(embeddings), settings))
    }

    #[inline]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run a full rebuild: load, split, embed, then replace the store contents.
    ///
    /// The existing store is only removed once every chunk has been embedded.
    #[inline]
    pub async fn run(&self) -> Result<IngestReport> {
        let start_time = Instant::now();

        info!("Checking embedding deployment");
        self.embedder.health_check().map_err(|e| {
            error!("Embedding health check failed: {:#}", e);
            RagError::Embedding(format!(
                "{:#}. Check that AZURE_OPENAI_EMBEDDING_DEPLOYMENT names an embedding model deployment.",
                e
            ))
        })?;

        info!("Loading documents from {}", self.data_dir.display());
        let load_report = load_directory(&self.data_dir)?;
        let files_loaded = load_report.loaded_count();
        let skipped = load_report
            .skipped()
            .map(|(path, reason)| SkippedFile {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            })
            .collect();
        let documents = load_report.into_documents();

        if documents.is_empty() {
            return Err(RagError::NoDocuments(self.data_dir.clone()));
        }

        let chunks = chunk_documents(&documents, &self.chunking)?;
        info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        if chunks.is_empty() {
            return Err(RagError::Ingest(format!(
                "Documents in {} contain no text to index",
                self.data_dir.display()
            )));
        }

        let vectors = self.embed_chunks(&chunks)?;
        let vector_dim = vectors.first().map_or(0, Vec::len);

        let ingested_at = Utc::now().to_rfc3339();
        let records = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddingRecord::from_chunk(chunk, vector, &ingested_at))
            .collect::<Result<Vec<_>>>()?;

        VectorStore::reset_directory(&self.persist_dir)?;
        let store = VectorStore::create(&self.persist_dir, &self.collection, vector_dim).await?;
        store.add_records(&records).await?;

        let stored = store.count_records().await?;
        if stored != records.len() {
            return Err(RagError::Database(format!(
                "Vector store holds {} records but {} were written",
                stored,
                records.len()
            )));
        }

        info!(
            "Ingestion complete: {} records in collection {} ({:.2?})",
            stored,
            self.collection,
            start_time.elapsed()
        );

        Ok(IngestReport {
            files_loaded,
            skipped,
            documents: documents.len(),
            chunks: chunks.len(),
            records: stored,
        })
    }

    /// Embed chunk texts in order, one request per batch
    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let bar = if self.show_progress {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks {bar:40}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embedder.embed_documents(batch).map_err(|e| {
                bar.abandon();
                RagError::Embedding(format!("{:#}", e))
            })?;
            if embedded.len() != batch.len() {
                bar.abandon();
                return Err(RagError::Embedding(format!(
                    "Expected {} embeddings, received {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 || vectors.iter().any(|v| v.len() != dimension) {
            return Err(RagError::Embedding(
                "Embedding service returned vectors of inconsistent dimension".to_string(),
            ));
        }

        debug!("Embedded {} chunks ({} dimensions)", vectors.len(), dimension);
        Ok(vectors)
    }
}
