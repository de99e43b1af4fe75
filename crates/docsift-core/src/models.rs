//! Core data models for documents, chunks, and search results.
//!
//! These types flow through the whole pipeline: the assembler produces a
//! [`Document`], the index stores its [`DocumentChunk`]s, and searches return
//! [`SearchResult`]s that pair a chunk with a snapshot of its owning
//! [`DocumentMetadata`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of document types the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Pdf,
    Image,
    Text,
    Docx,
    Pptx,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Pdf => "pdf",
            DocType::Image => "image",
            DocType::Text => "text",
            DocType::Docx => "docx",
            DocType::Pptx => "pptx",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocType::Pdf),
            "image" => Ok(DocType::Image),
            "text" => Ok(DocType::Text),
            "docx" => Ok(DocType::Docx),
            "pptx" => Ok(DocType::Pptx),
            other => Err(format!("unknown document type: '{}'", other)),
        }
    }
}

/// Descriptive metadata for one ingested document.
///
/// Immutable after creation except for `page_count` and `word_count`, which
/// the assembler fills in once every chunk is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Derived from the filename stem. The caller guarantees uniqueness.
    pub doc_id: String,
    pub title: String,
    pub doc_type: DocType,
    pub upload_date: DateTime<Utc>,
    pub author: Option<String>,
    pub source: Option<String>,
    pub page_count: usize,
    pub word_count: usize,
    pub language: String,
    pub custom_metadata: BTreeMap<String, String>,
}

impl DocumentMetadata {
    pub fn new(doc_id: impl Into<String>, title: impl Into<String>, doc_type: DocType) -> Self {
        Self {
            doc_id: doc_id.into(),
            title: title.into(),
            doc_type,
            upload_date: Utc::now(),
            author: None,
            source: None,
            page_count: 0,
            word_count: 0,
            language: "en".to_string(),
            custom_metadata: BTreeMap::new(),
        }
    }
}

/// A contiguous piece of extracted text tied to one page or slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    /// Back-reference to the owning document.
    pub doc_id: String,
    /// Never empty.
    pub content: String,
    /// 0-based.
    pub page_number: usize,
    /// 0-based position in extraction order.
    pub chunk_index: usize,
    pub metadata: BTreeMap<String, String>,
    /// Filled in by the index, never by the assembler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A document and its ordered chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub chunks: Vec<DocumentChunk>,
    pub raw_text: Option<String>,
}

impl Document {
    pub fn new(metadata: DocumentMetadata) -> Self {
        Self {
            metadata,
            chunks: Vec::new(),
            raw_text: None,
        }
    }

    pub fn add_chunk(&mut self, chunk: DocumentChunk) {
        self.chunks.push(chunk);
    }

    /// The document text in reading order.
    ///
    /// Returns `raw_text` when set. Otherwise chunks are ordered by
    /// `(page_number, chunk_index)` and joined with a blank line, so the
    /// result does not depend on the order chunks were added in.
    pub fn full_text(&self) -> String {
        if let Some(raw) = &self.raw_text {
            if !raw.is_empty() {
                return raw.clone();
            }
        }

        let mut ordered: Vec<&DocumentChunk> = self.chunks.iter().collect();
        ordered.sort_by_key(|c| (c.page_number, c.chunk_index));
        ordered
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A single chunk hit returned by the index. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    /// In `(0.0, 1.0]`, higher is more relevant.
    pub score: f64,
    /// Snapshot of the owning document's metadata at query time.
    pub document: DocumentMetadata,
}
