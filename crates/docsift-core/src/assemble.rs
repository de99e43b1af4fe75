//! Document assembly from extracted pages.
//!
//! The extractor yields an ordered list of [`Page`]s, one per page or slide
//! that produced text. [`assemble`] wraps them into a [`Document`]:
//!
//! 1. Drop pages whose text is empty or whitespace-only.
//! 2. Number the remaining pages `0, 1, 2, …` in extraction order. This
//!    `chunk_index` is not re-sorted by page; reading order is restored by
//!    [`Document::full_text`].
//! 3. Give every chunk the id `"{doc_id}_chunk_{i}"` and the display metadata
//!    `source` (file name) and `page` (1-based).
//! 4. Fill in `page_count` and `word_count` once all chunks are attached.
//!
//! No chunks means no document.
//!
//! # Example
//!
//! ```rust
//! use docsift_core::assemble::{assemble, Page};
//! use docsift_core::models::DocType;
//!
//! let pages = vec![Page::new(0, "Kafka topics"), Page::new(2, "Consumer groups rebalance")];
//! let doc = assemble("streams", "streams.pdf", DocType::Pdf, pages).unwrap();
//! assert_eq!(doc.chunks.len(), 2);
//! assert_eq!(doc.metadata.page_count, 3);
//! assert_eq!(doc.metadata.word_count, 5);
//! ```

use std::collections::BTreeMap;

use crate::models::{DocType, Document, DocumentChunk, DocumentMetadata};

/// Raw text for one page or slide, as produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based page or slide position in the source file.
    pub index: usize,
    pub text: String,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Build a [`Document`] from extracted pages.
///
/// `doc_id` doubles as the title (it is the filename stem). Returns `None`
/// when no page carries any non-whitespace text.
pub fn assemble(
    doc_id: &str,
    file_name: &str,
    doc_type: DocType,
    pages: Vec<Page>,
) -> Option<Document> {
    let pages: Vec<Page> = pages
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .collect();

    if pages.is_empty() {
        return None;
    }

    let mut document = Document::new(DocumentMetadata::new(doc_id, doc_id, doc_type));

    for (i, page) in pages.into_iter().enumerate() {
        let mut metadata = BTreeMap::new();
        metadata.insert("source".to_string(), file_name.to_string());
        metadata.insert("page".to_string(), (page.index + 1).to_string());

        document.add_chunk(DocumentChunk {
            chunk_id: format!("{}_chunk_{}", doc_id, i),
            doc_id: doc_id.to_string(),
            content: page.text,
            page_number: page.index,
            chunk_index: i,
            metadata,
            embedding: None,
        });
    }

    document.metadata.page_count = page_count(&document.chunks);
    document.metadata.word_count = document
        .chunks
        .iter()
        .map(|c| c.content.split_whitespace().count())
        .sum();

    Some(document)
}

/// `max(page_number) + 1`, or 0 without chunks.
pub fn page_count(chunks: &[DocumentChunk]) -> usize {
    chunks
        .iter()
        .map(|c| c.page_number + 1)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_chunk_per_non_empty_page() {
        let pages = vec![
            Page::new(0, "intro text"),
            Page::new(1, "   \n\t "),
            Page::new(2, "body"),
            Page::new(3, ""),
            Page::new(4, "closing words here"),
        ];
        let doc = assemble("report", "report.pdf", DocType::Pdf, pages).unwrap();

        assert_eq!(doc.chunks.len(), 3);
        assert_eq!(doc.metadata.page_count, 5);
        assert_eq!(doc.metadata.word_count, 2 + 1 + 3);
    }

    #[test]
    fn test_chunk_index_follows_extraction_order() {
        // Out-of-order pages keep their arrival position as chunk_index.
        let pages = vec![Page::new(3, "late page"), Page::new(0, "early page")];
        let doc = assemble("deck", "deck.pptx", DocType::Pptx, pages).unwrap();

        assert_eq!(doc.chunks[0].chunk_index, 0);
        assert_eq!(doc.chunks[0].page_number, 3);
        assert_eq!(doc.chunks[1].chunk_index, 1);
        assert_eq!(doc.chunks[1].page_number, 0);
        assert_eq!(doc.full_text(), "early page\n\nlate page");
    }

    #[test]
    fn test_chunk_ids_and_metadata() {
        let pages = vec![Page::new(0, "a"), Page::new(1, "b")];
        let doc = assemble("notes", "notes.txt", DocType::Text, pages).unwrap();

        assert_eq!(doc.metadata.doc_id, "notes");
        assert_eq!(doc.metadata.title, "notes");
        assert_eq!(doc.chunks[0].chunk_id, "notes_chunk_0");
        assert_eq!(doc.chunks[1].chunk_id, "notes_chunk_1");
        assert_eq!(doc.chunks[1].doc_id, "notes");
        assert_eq!(doc.chunks[1].metadata["source"], "notes.txt");
        assert_eq!(doc.chunks[1].metadata["page"], "2");
        assert!(doc.chunks.iter().all(|c| c.embedding.is_none()));
    }

    #[test]
    fn test_no_text_yields_no_document() {
        assert!(assemble("empty", "empty.pdf", DocType::Pdf, Vec::new()).is_none());
        let blank = vec![Page::new(0, " "), Page::new(1, "\n\n")];
        assert!(assemble("blank", "blank.pdf", DocType::Pdf, blank).is_none());
    }

    #[test]
    fn test_page_count_of_no_chunks_is_zero() {
        assert_eq!(page_count(&[]), 0);
    }
}
