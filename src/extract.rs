//! Per-format text extraction into ordered pages.
//!
//! Each supported [`SourceKind`] yields a list of [`Page`]s:
//!
//! | Kind | Pages |
//! |------|-------|
//! | PDF | one per page with text; OCR over rasterised pages when none has text |
//! | DOCX | one (index 0), non-empty paragraphs joined by `\n` |
//! | PPTX | one per slide with text in deck order, shape texts joined by `\n` |
//! | Text | one (index 0), the whole file |
//! | Image | one (index 0), OCR of the binarised image |
//!
//! [`Extractor::extract`] never fails: errors are logged and produce an empty
//! page list, so one bad file cannot stop a batch. [`Extractor::try_extract`]
//! exposes the error for callers that want it.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use docsift_core::assemble::Page;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::config::OcrConfig;
use crate::detect::SourceKind;
use crate::ocr::{self, OcrEngine, OcrError, PageRasterizer, PdftoppmRasterizer, TesseractCli};

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("text file is not valid UTF-8: {0}")]
    Text(String),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Text extractor with pluggable OCR and PDF rasterisation.
#[derive(Clone)]
pub struct Extractor {
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl Extractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self { ocr, rasterizer }
    }

    /// `tesseract` + `pdftoppm` as configured.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(
            Arc::new(TesseractCli::new(config)),
            Arc::new(PdftoppmRasterizer::new(config)),
        )
    }

    /// Extract pages, logging and absorbing any failure.
    pub fn extract(&self, path: &Path, kind: SourceKind) -> Vec<Page> {
        match self.try_extract(path, kind) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!(path = %path.display(), kind = kind.mime(), error = %e, "extraction failed");
                Vec::new()
            }
        }
    }

    pub fn try_extract(&self, path: &Path, kind: SourceKind) -> Result<Vec<Page>, ExtractError> {
        match kind {
            SourceKind::Pdf => self.extract_pdf(path),
            SourceKind::Docx => extract_docx(path),
            SourceKind::Pptx => extract_pptx(path),
            SourceKind::Text => extract_text(path),
            SourceKind::Jpeg | SourceKind::Png | SourceKind::Tiff => self.extract_image(path),
        }
    }

    fn extract_pdf(&self, path: &Path) -> Result<Vec<Page>, ExtractError> {
        let bytes = std::fs::read(path)?;

        match pdf_text_by_pages(&bytes) {
            Ok(texts) => {
                let pages = non_empty_pages(texts);
                if !pages.is_empty() {
                    return Ok(pages);
                }
                tracing::info!(path = %path.display(), "no text layer found, falling back to OCR");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "direct PDF extraction failed, falling back to OCR");
            }
        }

        self.ocr_pdf(path)
    }

    fn ocr_pdf(&self, path: &Path) -> Result<Vec<Page>, ExtractError> {
        let rasterized = self.rasterizer.rasterize(path)?;
        let mut texts = Vec::with_capacity(rasterized.pages.len());

        for (i, image) in rasterized.pages.iter().enumerate() {
            match self.ocr.recognize(image) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    tracing::warn!(path = %path.display(), page = i + 1, error = %e, "OCR failed for page");
                    texts.push(String::new());
                }
            }
        }

        Ok(non_empty_pages(texts))
    }

    fn extract_image(&self, path: &Path) -> Result<Vec<Page>, ExtractError> {
        let text = ocr::ocr_image(self.ocr.as_ref(), path)?;
        Ok(single_page(text))
    }
}

/// Keep pages with non-whitespace text, tagged with their original position.
fn non_empty_pages(texts: Vec<String>) -> Vec<Page> {
    texts
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| Page::new(i, text))
        .collect()
}

fn single_page(text: String) -> Vec<Page> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![Page::new(0, text)]
    }
}

fn pdf_text_by_pages(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract panics on some malformed inputs.
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
    }
}

fn extract_text(path: &Path) -> Result<Vec<Page>, ExtractError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| ExtractError::Text(e.to_string()))?;
    Ok(single_page(text))
}

type Archive = zip::ZipArchive<std::fs::File>;

fn open_archive(path: &Path) -> Result<Archive, ExtractError> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut Archive,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry.take(max_bytes).read_to_end(&mut out)?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(path: &Path) -> Result<Vec<Page>, ExtractError> {
    let mut archive = open_archive(path)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    let paragraphs = docx_paragraphs(&xml)?;

    let text = paragraphs
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(single_page(text))
}

/// Text of every `w:p`, runs concatenated as written.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    // Whitespace between runs is significant.
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn extract_pptx(path: &Path) -> Result<Vec<Page>, ExtractError> {
    let mut archive = open_archive(path)?;
    let slide_names = match deck_slide_order(&mut archive)? {
        Some(names) => names,
        None => slides_by_file_name(&archive),
    };

    let mut texts = Vec::with_capacity(slide_names.len());
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let shapes = slide_shape_texts(&xml)?;
        texts.push(
            shapes
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }

    Ok(non_empty_pages(texts))
}

/// Slide entries in presentation order: `p:sldIdLst` resolved through the
/// presentation relationships. `None` when either part is missing or lists
/// no slide that exists in the archive.
fn deck_slide_order(archive: &mut Archive) -> Result<Option<Vec<String>>, ExtractError> {
    const PRESENTATION: &str = "ppt/presentation.xml";
    const RELS: &str = "ppt/_rels/presentation.xml.rels";

    let present: Vec<String> = archive.file_names().map(str::to_string).collect();
    if !present.iter().any(|n| n == PRESENTATION) || !present.iter().any(|n| n == RELS) {
        return Ok(None);
    }

    let presentation = read_zip_entry_bounded(archive, PRESENTATION, MAX_XML_ENTRY_BYTES)?;
    let rels = read_zip_entry_bounded(archive, RELS, MAX_XML_ENTRY_BYTES)?;

    // The relationship id lives in the namespaced `r:id`; the bare `id` is numeric.
    let rel_ids: Vec<String> = element_attributes(&presentation, b"sldId")?
        .into_iter()
        .filter_map(|attrs| {
            attrs
                .into_iter()
                .find(|(key, _)| key.ends_with(b":id"))
                .map(|(_, value)| value)
        })
        .collect();

    let targets: HashMap<String, String> = element_attributes(&rels, b"Relationship")?
        .into_iter()
        .filter_map(|attrs| {
            let get = |name: &[u8]| {
                attrs
                    .iter()
                    .find(|(key, _)| key.as_slice() == name)
                    .map(|(_, v)| v.clone())
            };
            Some((get(b"Id")?, get(b"Target")?))
        })
        .collect();

    let mut names = Vec::with_capacity(rel_ids.len());
    for rel_id in rel_ids {
        let Some(target) = targets.get(&rel_id) else {
            tracing::warn!(rel_id = %rel_id, "slide relationship not found");
            continue;
        };
        let name = resolve_part(target);
        if present.contains(&name) {
            names.push(name);
        } else {
            tracing::warn!(part = %name, "slide part listed but missing");
        }
    }

    Ok(if names.is_empty() { None } else { Some(names) })
}

/// Relationship targets are relative to `ppt/` unless absolute.
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => {
            let mut parts: Vec<&str> = vec!["ppt"];
            for segment in target.split('/') {
                match segment {
                    "" | "." => {}
                    ".." => {
                        parts.pop();
                    }
                    s => parts.push(s),
                }
            }
            parts.join("/")
        }
    }
}

/// `ppt/slides/slideN.xml` entries ordered by `N`.
fn slides_by_file_name(archive: &Archive) -> Vec<String> {
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    slide_names
}

/// Attributes (qualified key, unescaped value) of every `element`, by local name.
fn element_attributes(
    xml: &[u8],
    element: &[u8],
) -> Result<Vec<Vec<(Vec<u8>, String)>>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut found = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == element => {
                let mut attrs = Vec::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    attrs.push((attr.key.as_ref().to_vec(), value.into_owned()));
                }
                found.push(attrs);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(found)
}

/// Text of every `p:sp` shape on a slide, its `a:p` paragraphs joined by `\n`.
fn slide_shape_texts(xml: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut shapes = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_shape = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"p" if in_shape => current.clear(),
                b"t" if in_shape => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) if in_shape => {
                if e.local_name().as_ref() == b"br" {
                    current.push('\n');
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_shape => paragraphs.push(std::mem::take(&mut current)),
                b"sp" => {
                    in_shape = false;
                    shapes.push(paragraphs.join("\n"));
                    paragraphs.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(shapes)
}
