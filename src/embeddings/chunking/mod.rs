
use std::collections::VecDeque;

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::{debug, warn};

use crate::loader::Document;

/// Boundaries tried in order: paragraph, line, sentence, word, character
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Represents a chunk of a document ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text, a trimmed substring of the source document
    pub text: String,
    /// Position of this chunk within its source document
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: Option<u32>,
    /// Byte offset of the chunk text within the source document text
    pub start_index: usize,
}

/// Configuration for recursive character splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Target number of characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Separators tried in order; an empty separator splits between characters
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: DEFAULT_SEPARATORS.map(String::from).to_vec(),
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("Chunk size must be greater than zero");
        }
        if self.chunk_overlap >= self.chunk_size {
            bail!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}

/// Split every document into chunks, preserving document order
#[inline]
pub fn chunk_documents(documents: &[Document], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let mut chunks = Vec::new();
    for document in documents {
        let pieces = split_text(&document.text, config);
        chunks.extend(pieces.into_iter().enumerate().map(|(chunk_index, piece)| {
            Chunk {
                text: piece.to_string(),
                chunk_index,
                metadata: ChunkMetadata {
                    source: document.metadata.source.clone(),
                    page: document.metadata.page,
                    start_index: byte_offset(&document.text, piece),
                },
            }
        }));
    }

    debug!(
        "Split {} documents into {} chunks (avg {} chars)",
        documents.len(),
        chunks.len(),
        chunks.iter().map(|c| c.text.chars().count()).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

/// Split text into chunks of at most `chunk_size` characters.
///
/// Every returned chunk borrows from `text`, so its position in the source is exact.
#[inline]
pub fn split_text<'a>(text: &'a str, config: &ChunkingConfig) -> Vec<&'a str> {
    let separators: Vec<&str> = config.separators.iter().map(String::as_str).collect();
    let mut chunks = Vec::new();
    split_recursive(text, text, &separators, config, &mut chunks);
    chunks
}

fn split_recursive<'a>(
    root: &'a str,
    text: &'a str,
    separators: &[&str],
    config: &ChunkingConfig,
    chunks: &mut Vec<&'a str>,
) {
    let (separator, remaining) = choose_separator(text, separators);
    let mut mergeable: Vec<&'a str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.chunk_size {
            mergeable.push(piece);
            continue;
        }

        if !mergeable.is_empty() {
            merge_pieces(root, &mergeable, config, chunks);
            mergeable.clear();
        }

        if remaining.is_empty() {
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed);
            }
        } else {
            split_recursive(root, piece, remaining, config, chunks);
        }
    }

    if !mergeable.is_empty() {
        merge_pieces(root, &mergeable, config, chunks);
    }
}

/// Pick the first separator present in the text, returning it with the finer separators after it
fn choose_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    (separators.last().copied().unwrap_or_default(), &[])
}

/// Split on `separator`, keeping it at the end of the preceding piece so pieces tile the text
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .filter_map(|(i, c)| text.get(i..i + c.len_utf8()))
            .collect();
    }
    text.split_inclusive(separator).collect()
}

/// Greedily join adjacent pieces into chunks, carrying up to `chunk_overlap`
/// characters of trailing pieces into the next chunk
fn merge_pieces<'a>(
    root: &'a str,
    pieces: &[&'a str],
    config: &ChunkingConfig,
    chunks: &mut Vec<&'a str>,
) {
    let mut window: VecDeque<&'a str> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);

        if total + len > config.chunk_size && !window.is_empty() {
            if total > config.chunk_size {
                warn!(
                    "Created a chunk of size {}, which is longer than the specified {}",
                    total, config.chunk_size
                );
            }
            push_window(root, &window, chunks);

            while total > config.chunk_overlap || (total + len > config.chunk_size && total > 0) {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front);
            }
        }

        window.push_back(piece);
        total += len;
    }

    push_window(root, &window, chunks);
}

/// Emit the contiguous span covered by the window, trimmed
fn push_window<'a>(root: &'a str, window: &VecDeque<&'a str>, chunks: &mut Vec<&'a str>) {
    let (Some(first), Some(last)) = (window.front(), window.back()) else {
        return;
    };
    let start = byte_offset(root, first);
    let end = byte_offset(root, last) + last.len();

    if let Some(span) = root.get(start..end) {
        let trimmed = span.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed);
        }
    }
}

/// Offset of `part` inside `root`; `part` must be a subslice of `root`
fn byte_offset(root: &str, part: &str) -> usize {
    part.as_ptr() as usize - root.as_ptr() as usize
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
