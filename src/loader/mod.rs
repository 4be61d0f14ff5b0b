// Document loading
// Discovers PDF and plain-text files under a directory and parses them into documents


use std::fmt;
use std::fs;
use std::panic;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{RagError, Result};

/// A loaded unit of text: a whole text file, or one page of a PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Path of the file the document was read from
    pub source: String,
    /// Zero-based page number, PDFs only
    pub page: Option<u32>,
}

/// Supported file types, in the order they are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    pub const ALL: [Self; 2] = [Self::Pdf, Self::Text];

    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }

    #[inline]
    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension()))
    }
}

impl fmt::Display for FileKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*.{}", self.extension())
    }
}

/// Result of loading a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Vec<Document>),
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLoad {
    pub path: PathBuf,
    pub kind: FileKind,
    pub outcome: LoadOutcome,
}

/// Per-file outcomes of a directory load, in load order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files: Vec<FileLoad>,
}

impl LoadReport {
    #[inline]
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.files.iter().flat_map(|file| match &file.outcome {
            LoadOutcome::Loaded(documents) => documents.as_slice(),
            LoadOutcome::Skipped { .. } => [].as_slice(),
        })
    }

    #[inline]
    pub fn into_documents(self) -> Vec<Document> {
        self.files
            .into_iter()
            .flat_map(|file| match file.outcome {
                LoadOutcome::Loaded(documents) => documents,
                LoadOutcome::Skipped { .. } => Vec::new(),
            })
            .collect()
    }

    #[inline]
    pub fn loaded_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.outcome, LoadOutcome::Loaded(_)))
            .count()
    }

    #[inline]
    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().filter_map(|file| match &file.outcome {
            LoadOutcome::Skipped { reason } => Some((file.path.as_path(), reason.as_str())),
            LoadOutcome::Loaded(_) => None,
        })
    }
}

/// Load every supported file under `dir`: all PDFs first, then all text files.
/// Files that fail to parse are recorded as skipped and do not abort the load.
#[inline]
pub fn load_directory(dir: &Path) -> Result<LoadReport> {
    if !dir.is_dir() {
        return Err(RagError::Ingest(format!(
            "Data directory not found: {}",
            dir.display()
        )));
    }

    let mut report = LoadReport::default();

    for kind in FileKind::ALL {
        let paths = discover_files(dir, kind);
        debug!("Found {} {} files in {}", paths.len(), kind, dir.display());

        for path in paths {
            let outcome = load_file(&path, kind);
            if let LoadOutcome::Skipped { reason } = &outcome {
                warn!("Skipping {}: {}", path.display(), reason);
            }
            report.files.push(FileLoad {
                path,
                kind,
                outcome,
            });
        }
    }

    info!(
        "Loaded {} documents from {} files ({} skipped)",
        report.documents().count(),
        report.loaded_count(),
        report.skipped().count()
    );

    Ok(report)
}

/// Recursively list files of the given kind, sorted by path
#[inline]
pub fn discover_files(dir: &Path, kind: FileKind) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Failed to read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && kind.matches(entry.path()))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Parse one file into documents
#[inline]
pub fn load_file(path: &Path, kind: FileKind) -> LoadOutcome {
    let source = path.display().to_string();

    match kind {
        FileKind::Text => match fs::read_to_string(path) {
            Ok(text) => LoadOutcome::Loaded(vec![Document {
                text,
                metadata: DocumentMetadata { source, page: None },
            }]),
            Err(e) => LoadOutcome::Skipped {
                reason: format!("Failed to read text file: {}", e),
            },
        },
        // pdf-extract panics on some malformed inputs
        FileKind::Pdf => match panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path)) {
            Ok(Ok(pages)) => LoadOutcome::Loaded(
                pages
                    .into_iter()
                    .zip(0_u32..)
                    .map(|(text, page)| Document {
                        text,
                        metadata: DocumentMetadata {
                            source: source.clone(),
                            page: Some(page),
                        },
                    })
                    .collect(),
            ),
            Ok(Err(e)) => LoadOutcome::Skipped {
                reason: format!("Failed to extract PDF text: {}", e),
            },
            Err(_) => LoadOutcome::Skipped {
                reason: "PDF parser panicked".to_string(),
            },
        },
    }
}
