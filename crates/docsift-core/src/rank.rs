//! Document-level ranking of raw chunk hits.
//!
//! The index returns chunks in nearest-neighbour order, which may contain
//! several chunks from the same document. [`rank_results`] keeps the first
//! hit per document (the best one, given that order), turns it into a
//! display-ready [`RankedAnswer`], and then sorts the answers by relevance
//! explicitly so the output never depends on how the engine breaks ties.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::SearchResult;

/// Maximum characters of chunk content shown per answer.
pub const SNIPPET_MAX_CHARS: usize = 500;

/// Title used when a document has none.
pub const UNNAMED_DOCUMENT: &str = "Unnamed Document";

/// Ranking options.
#[derive(Debug, Clone)]
pub struct RankOptions {
    pub snippet_chars: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            snippet_chars: SNIPPET_MAX_CHARS,
        }
    }
}

/// One answer per document, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAnswer {
    pub doc_id: String,
    pub filename: String,
    /// Best chunk content on one line, truncated with `...`.
    pub answer: String,
    /// `"Page {p}, Chunk {c}"`, both 1-based.
    pub citation: String,
    pub relevance: f64,
}

/// Deduplicate hits by document and sort by relevance (descending).
pub fn rank_results(results: &[SearchResult], opts: &RankOptions) -> Vec<RankedAnswer> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut answers: Vec<RankedAnswer> = Vec::new();

    for result in results {
        if !seen.insert(result.document.doc_id.as_str()) {
            continue;
        }

        let filename = if result.document.title.trim().is_empty() {
            UNNAMED_DOCUMENT.to_string()
        } else {
            result.document.title.clone()
        };

        answers.push(RankedAnswer {
            doc_id: result.document.doc_id.clone(),
            filename,
            answer: snippet(&result.chunk.content, opts.snippet_chars),
            citation: format!(
                "Page {}, Chunk {}",
                result.chunk.page_number + 1,
                result.chunk.chunk_index + 1
            ),
            relevance: result.score,
        });
    }

    // Stable: equal scores keep their first-seen order.
    answers.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    answers
}

/// Collapse newlines to spaces and cut to `max_chars` characters.
///
/// `...` is appended whenever the raw `content` is longer than `max_chars`,
/// even if trimming brought the flattened text under the limit.
pub fn snippet(content: &str, max_chars: usize) -> String {
    let flat = content.trim().replace(['\r', '\n'], " ");
    let mut cut: String = flat.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        cut.push_str("...");
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocType, DocumentChunk, DocumentMetadata};
    use std::collections::BTreeMap;

    fn hit(doc: &str, page: usize, index: usize, score: f64, content: &str) -> SearchResult {
        SearchResult {
            chunk: DocumentChunk {
                chunk_id: format!("{}-{}", doc, index),
                doc_id: doc.to_string(),
                content: content.to_string(),
                page_number: page,
                chunk_index: index,
                metadata: BTreeMap::new(),
                embedding: None,
            },
            score,
            document: DocumentMetadata::new(doc, doc, DocType::Pdf),
        }
    }

    #[test]
    fn test_keeps_first_hit_per_document() {
        let raw = vec![
            hit("A", 0, 0, 0.9, "a best"),
            hit("B", 1, 0, 0.7, "b only"),
            hit("A", 2, 1, 0.5, "a worse"),
        ];
        let ranked = rank_results(&raw, &RankOptions::default());

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].doc_id, "A");
        assert!((ranked[0].relevance - 0.9).abs() < 1e-12);
        assert_eq!(ranked[0].answer, "a best");
        assert_eq!(ranked[1].doc_id, "B");
        assert!((ranked[1].relevance - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_final_order_is_by_relevance_not_input_order() {
        let raw = vec![
            hit("A", 0, 0, 0.4, "a"),
            hit("B", 0, 0, 0.8, "b"),
            hit("C", 0, 0, 0.6, "c"),
        ];
        let ranked = rank_results(&raw, &RankOptions::default());
        let ids: Vec<&str> = ranked.iter().map(|r| r.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_citation_is_one_based() {
        let ranked = rank_results(&[hit("A", 3, 7, 0.5, "x")], &RankOptions::default());
        assert_eq!(ranked[0].citation, "Page 4, Chunk 8");
    }

    #[test]
    fn test_snippet_flattens_and_truncates() {
        assert_eq!(snippet("  line one\nline two \n", 500), "line one line two");

        let long = "x".repeat(600);
        let cut = snippet(&long, 500);
        assert_eq!(cut.chars().count(), 503);
        assert!(cut.ends_with("..."));

        let exact = "y".repeat(500);
        assert_eq!(snippet(&exact, 500), exact);
    }

    #[test]
    fn test_snippet_ellipsis_follows_raw_length() {
        // 500 visible chars plus surrounding whitespace: over the limit before trimming.
        let padded = format!("  {}  ", "z".repeat(500));
        assert_eq!(snippet(&padded, 500), format!("{}...", "z".repeat(500)));

        let short_padded = format!("\n{}\n", "z".repeat(10));
        assert_eq!(snippet(&short_padded, 500), "z".repeat(10));
    }

    #[test]
    fn test_snippet_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        assert_eq!(snippet(&text, 4), "éééé...");
    }

    #[test]
    fn test_untitled_document_gets_placeholder_name() {
        let mut r = hit("A", 0, 0, 0.5, "x");
        r.document.title = String::new();
        let ranked = rank_results(&[r], &RankOptions::default());
        assert_eq!(ranked[0].filename, UNNAMED_DOCUMENT);
    }

    #[test]
    fn test_empty_input() {
        assert!(rank_results(&[], &RankOptions::default()).is_empty());
    }
}
