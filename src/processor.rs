//! File → [`Document`] orchestration: detect, extract, assemble.

use std::path::Path;

use docsift_core::assemble::assemble;
use docsift_core::models::Document;
use thiserror::Error;

use crate::config::OcrConfig;
use crate::detect::{self, DetectError};
use crate::extract::Extractor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("could not determine file type of {path}: {reason}")]
    UndeterminedType { path: String, reason: String },
    #[error("unsupported file type for {path}: {kind}")]
    UnsupportedType { path: String, kind: String },
    #[error("no text could be extracted from {0}")]
    ExtractionEmpty(String),
    #[error("extraction worker failed on {path}: {reason}")]
    WorkerFailed { path: String, reason: String },
}

pub struct DocumentProcessor {
    extractor: Extractor,
}

impl DocumentProcessor {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(Extractor::from_config(config))
    }

    /// Turn one file into a [`Document`] whose id and title are the file stem.
    pub fn process_document(&self, path: &Path) -> Result<Document, ProcessError> {
        let shown = path.display().to_string();
        if !path.is_file() {
            return Err(ProcessError::NotFound(shown));
        }

        let kind = detect::detect_kind(path).map_err(|e| match e {
            DetectError::Undetermined(reason) => ProcessError::UndeterminedType {
                path: shown.clone(),
                reason,
            },
            DetectError::Unsupported(kind) => ProcessError::UnsupportedType {
                path: shown.clone(),
                kind,
            },
        })?;

        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::debug!(path = %shown, kind = kind.mime(), "extracting");
        let pages = self.extractor.extract(path, kind);

        let mut document = assemble(&doc_id, &file_name, kind.doc_type(), pages)
            .ok_or_else(|| ProcessError::ExtractionEmpty(shown.clone()))?;
        document.metadata.source = Some(file_name);
        Ok(document)
    }

    /// [`process_document`](Self::process_document), logging failures and returning `None`.
    pub fn process_document_opt(&self, path: &Path) -> Option<Document> {
        match self.process_document(path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "document not processed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrEngine, OcrError, PageRasterizer, RasterizedPages};
    use docsift_core::models::DocType;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct SilentOcr;

    impl OcrEngine for SilentOcr {
        fn recognize(&self, _image: &Path) -> Result<String, OcrError> {
            Ok(String::new())
        }
    }

    struct OnePage;

    impl PageRasterizer for OnePage {
        fn rasterize(&self, _pdf: &Path) -> Result<RasterizedPages, OcrError> {
            Ok(RasterizedPages::from_paths(vec![PathBuf::from("page-1.png")]))
        }
    }

    fn processor() -> DocumentProcessor {
        DocumentProcessor::new(Extractor::new(Arc::new(SilentOcr), Arc::new(OnePage)))
    }

    #[test]
    fn test_text_file_becomes_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("streams.txt");
        std::fs::write(&path, "Kafka streams feed the warehouse").unwrap();

        let doc = processor().process_document(&path).unwrap();
        assert_eq!(doc.metadata.doc_id, "streams");
        assert_eq!(doc.metadata.title, "streams");
        assert_eq!(doc.metadata.doc_type, DocType::Text);
        assert_eq!(doc.metadata.source.as_deref(), Some("streams.txt"));
        assert_eq!(doc.metadata.word_count, 5);
        assert_eq!(doc.chunks.len(), 1);
    }

    #[test]
    fn test_failure_reasons_are_distinct() {
        let dir = TempDir::new().unwrap();
        let p = processor();

        let missing = dir.path().join("nope.txt");
        assert!(matches!(p.process_document(&missing), Err(ProcessError::NotFound(_))));

        let sheet = dir.path().join("numbers.xlsx");
        std::fs::write(&sheet, "x").unwrap();
        assert!(matches!(
            p.process_document(&sheet),
            Err(ProcessError::UnsupportedType { .. })
        ));

        let blob = dir.path().join("blob");
        std::fs::write(&blob, [0u8, 159, 146, 150]).unwrap();
        assert!(matches!(
            p.process_document(&blob),
            Err(ProcessError::UndeterminedType { .. })
        ));

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "  ").unwrap();
        assert!(matches!(
            p.process_document(&empty),
            Err(ProcessError::ExtractionEmpty(_))
        ));
    }

    #[test]
    fn test_blank_pdf_yields_no_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%%EOF\n").unwrap();

        assert!(processor().process_document_opt(&path).is_none());
    }
}
