// Query pipeline
// Retrieves the chunks nearest to a question and asks the chat model to answer from them


use std::fmt::Write as _;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::database::{RecordMetadata, SearchResult, VectorStore};
use crate::embeddings::{AzureEmbeddings, Embedder};
use crate::generation::{AzureChat, ChatModel};
use crate::{RagError, Result};

/// Number of chunks retrieved per question
pub const DEFAULT_TOP_K: usize = 4;
/// Characters of a source shown in previews
pub const PREVIEW_CHARS: usize = 200;
/// Prompts longer than this are likely to exceed the model context window
pub const PROMPT_WARN_CHARS: usize = 12_000;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// A retrieved chunk backing an answer
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChunk {
    pub text: String,
    pub metadata: RecordMetadata,
    /// Distance to the question embedding; smaller is closer
    pub score: f32,
}

impl SourceChunk {
    /// The first 200 characters of the chunk followed by `...`
    #[inline]
    pub fn preview(&self) -> String {
        let head: String = self.text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    }
}

impl From<SearchResult> for SourceChunk {
    #[inline]
    fn from(result: SearchResult) -> Self {
        Self {
            text: result.content,
            metadata: result.metadata,
            score: result.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceChunk>,
}

/// Everything needed to answer questions, built once per process
pub struct QueryPipeline {
    embedder: Box<dyn Embedder>,
    chat: Box<dyn ChatModel>,
    store: VectorStore,
    top_k: usize,
}

impl QueryPipeline {
    #[inline]
    pub fn new(embedder: Box<dyn Embedder>, chat: Box<dyn ChatModel>, store: VectorStore) -> Self {
        Self {
            embedder,
            chat,
            store,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Validate settings, open the persisted store and build the Azure clients
    #[inline]
    pub async fn open(settings: &Settings) -> Result<Self> {
        settings.require_chat()?;

        let store = VectorStore::open(&settings.persist_dir, &settings.collection).await?;

        let embedder = AzureEmbeddings::new(&settings.azure)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
        let chat =
            AzureChat::new(&settings.azure).map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        info!(
            "Query pipeline ready (collection {}, chat deployment {})",
            store.collection(),
            chat.deployment()
        );

        Ok(Self::new(Box::new(embedder), Box::new(chat), store))
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Answer one question from the stored documents
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<Answer> {
        debug!("Answering question: {}", question);

        let query_vector = self
            .embedder
            .embed_query(question)
            .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

        let sources: Vec<SourceChunk> = self
            .store
            .search_similar(&query_vector, self.top_k)
            .await?
            .into_iter()
            .map(SourceChunk::from)
            .collect();
        debug!("Retrieved {} source chunks", sources.len());

        let prompt = build_prompt(question, &sources);
        if prompt.chars().count() > PROMPT_WARN_CHARS {
            warn!(
                "Prompt is {} characters long and may exceed the model context window",
                prompt.chars().count()
            );
        }

        let text = self
            .chat
            .complete(&prompt)
            .map_err(|e| RagError::Generation(format!("{:#}", e)))?;

        Ok(Answer { text, sources })
    }
}

/// Stuff every retrieved chunk into a single prompt
#[inline]
pub fn build_prompt(question: &str, sources: &[SourceChunk]) -> String {
    let mut prompt = String::from(PROMPT_PREAMBLE);
    prompt.push_str("\n\n");

    for source in sources {
        prompt.push_str(&source.text);
        prompt.push_str("\n\n");
    }

    let _ = write!(prompt, "Question: {}\nHelpful Answer:", question);
    prompt
}
