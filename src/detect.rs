//! File-type detection.
//!
//! Content wins over the file name: leading magic bytes are checked first,
//! and ZIP containers are opened to tell DOCX from PPTX. Only when the
//! content is not recognised does the extension decide.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use docsift_core::models::DocType;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_TIFF: &str = "image/tiff";

/// Bytes sniffed when a file has no extension.
const SNIFF_BYTES: usize = 8192;

/// The closed set of inputs the extractor can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pdf,
    Docx,
    Pptx,
    Text,
    Jpeg,
    Png,
    Tiff,
}

impl SourceKind {
    pub fn mime(&self) -> &'static str {
        match self {
            SourceKind::Pdf => MIME_PDF,
            SourceKind::Docx => MIME_DOCX,
            SourceKind::Pptx => MIME_PPTX,
            SourceKind::Text => MIME_TEXT,
            SourceKind::Jpeg => MIME_JPEG,
            SourceKind::Png => MIME_PNG,
            SourceKind::Tiff => MIME_TIFF,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            MIME_PDF => Some(SourceKind::Pdf),
            MIME_DOCX => Some(SourceKind::Docx),
            MIME_PPTX => Some(SourceKind::Pptx),
            MIME_TEXT => Some(SourceKind::Text),
            MIME_JPEG => Some(SourceKind::Jpeg),
            MIME_PNG => Some(SourceKind::Png),
            MIME_TIFF => Some(SourceKind::Tiff),
            _ => None,
        }
    }

    pub fn doc_type(&self) -> DocType {
        match self {
            SourceKind::Pdf => DocType::Pdf,
            SourceKind::Docx => DocType::Docx,
            SourceKind::Pptx => DocType::Pptx,
            SourceKind::Text => DocType::Text,
            SourceKind::Jpeg | SourceKind::Png | SourceKind::Tiff => DocType::Image,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, SourceKind::Jpeg | SourceKind::Png | SourceKind::Tiff)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "docx" => Some(SourceKind::Docx),
            "pptx" => Some(SourceKind::Pptx),
            "txt" => Some(SourceKind::Text),
            "jpg" | "jpeg" => Some(SourceKind::Jpeg),
            "png" => Some(SourceKind::Png),
            "tif" | "tiff" => Some(SourceKind::Tiff),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    /// The file could not be classified at all.
    #[error("could not determine file type: {0}")]
    Undetermined(String),
    /// The file was classified as something the extractor does not read.
    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

/// Classify `path` by content, then by extension.
pub fn detect_kind(path: &Path) -> Result<SourceKind, DetectError> {
    let mut file = File::open(path).map_err(|e| DetectError::Undetermined(e.to_string()))?;
    let mut head = Vec::with_capacity(SNIFF_BYTES);
    (&mut file)
        .take(SNIFF_BYTES as u64)
        .read_to_end(&mut head)
        .map_err(|e| DetectError::Undetermined(e.to_string()))?;

    if let Some(found) = sniff_magic(&head) {
        return match found {
            Sniffed::Kind(kind) => Ok(kind),
            Sniffed::Zip => classify_zip(path),
            Sniffed::Other(mime) => Err(DetectError::Unsupported(mime.to_string())),
        };
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => SourceKind::from_extension(ext)
            .ok_or_else(|| DetectError::Unsupported(format!(".{}", ext.to_ascii_lowercase()))),
        None if looks_like_text(&head) => Ok(SourceKind::Text),
        None => Err(DetectError::Undetermined(format!(
            "no extension and no known signature: {}",
            path.display()
        ))),
    }
}

enum Sniffed {
    Kind(SourceKind),
    Zip,
    Other(&'static str),
}

fn sniff_magic(head: &[u8]) -> Option<Sniffed> {
    if head.starts_with(b"%PDF-") {
        Some(Sniffed::Kind(SourceKind::Pdf))
    } else if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(Sniffed::Kind(SourceKind::Png))
    } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(Sniffed::Kind(SourceKind::Jpeg))
    } else if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        Some(Sniffed::Kind(SourceKind::Tiff))
    } else if head.starts_with(b"PK\x03\x04") {
        Some(Sniffed::Zip)
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some(Sniffed::Other("image/gif"))
    } else {
        None
    }
}

fn classify_zip(path: &Path) -> Result<SourceKind, DetectError> {
    let file = File::open(path).map_err(|e| DetectError::Undetermined(e.to_string()))?;
    let archive = zip::ZipArchive::new(file).map_err(|e| DetectError::Undetermined(e.to_string()))?;

    let mut is_pptx = false;
    for name in archive.file_names() {
        if name == "word/document.xml" {
            return Ok(SourceKind::Docx);
        }
        if name == "ppt/presentation.xml" || name.starts_with("ppt/slides/") {
            is_pptx = true;
        }
    }

    if is_pptx {
        Ok(SourceKind::Pptx)
    } else {
        Err(DetectError::Unsupported("application/zip".to_string()))
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte char cut off at the sniff boundary is still text.
        Err(e) => e.error_len().is_none() && head.len() == SNIFF_BYTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn zip_with(entries: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for name in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(b"<x/>").unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_magic_bytes_beat_extension() {
        let dir = TempDir::new().unwrap();
        let pdf = write(&dir, "misnamed.txt", b"%PDF-1.4\n...");
        assert_eq!(detect_kind(&pdf), Ok(SourceKind::Pdf));

        let png = write(&dir, "scan.jpg", b"\x89PNG\r\n\x1a\n0000");
        assert_eq!(detect_kind(&png), Ok(SourceKind::Png));
    }

    #[test]
    fn test_zip_containers_are_inspected() {
        let dir = TempDir::new().unwrap();
        let docx = write(&dir, "a.bin", &zip_with(&["word/document.xml"]));
        assert_eq!(detect_kind(&docx), Ok(SourceKind::Docx));

        let pptx = write(&dir, "b.zip", &zip_with(&["ppt/slides/slide1.xml"]));
        assert_eq!(detect_kind(&pptx), Ok(SourceKind::Pptx));

        let plain = write(&dir, "c.docx", &zip_with(&["readme.md"]));
        assert!(matches!(detect_kind(&plain), Err(DetectError::Unsupported(_))));
    }

    #[test]
    fn test_extension_fallback() {
        let dir = TempDir::new().unwrap();
        let txt = write(&dir, "notes.TXT", b"hello");
        assert_eq!(detect_kind(&txt), Ok(SourceKind::Text));

        let xlsx = write(&dir, "sheet.xlsx", b"hello");
        assert_eq!(
            detect_kind(&xlsx),
            Err(DetectError::Unsupported(".xlsx".to_string()))
        );
    }

    #[test]
    fn test_no_extension_is_sniffed() {
        let dir = TempDir::new().unwrap();
        let text = write(&dir, "README", b"plain words");
        assert_eq!(detect_kind(&text), Ok(SourceKind::Text));

        let binary = write(&dir, "blob", &[0x00, 0x01, 0x02, 0xFE]);
        assert!(matches!(detect_kind(&binary), Err(DetectError::Undetermined(_))));
    }

    #[test]
    fn test_missing_file_is_undetermined() {
        let err = detect_kind(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, DetectError::Undetermined(_)));
    }

    #[test]
    fn test_mime_round_trip_and_doc_type() {
        for kind in [
            SourceKind::Pdf,
            SourceKind::Docx,
            SourceKind::Pptx,
            SourceKind::Text,
            SourceKind::Jpeg,
            SourceKind::Png,
            SourceKind::Tiff,
        ] {
            assert_eq!(SourceKind::from_mime(kind.mime()), Some(kind));
        }
        assert_eq!(SourceKind::Tiff.doc_type(), DocType::Image);
        assert_eq!(SourceKind::from_mime("application/zip"), None);
    }
}
