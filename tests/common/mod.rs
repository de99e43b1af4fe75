//! Hand-built document fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;

/// Minimal PDF with one page showing `phrase` (empty string for a blank page).
/// Body first, then an xref with correct byte offsets so pdf-extract can parse it.
pub fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = if phrase.is_empty() {
        String::new()
    } else {
        format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase)
    };

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn zip_bytes(entries: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

/// DOCX with one `w:p` per entry of `paragraphs`.
pub fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
        body
    );
    zip_bytes(&[("word/document.xml", xml)])
}

/// PPTX with one slide per entry of `slides`, one text shape per slide.
pub fn minimal_pptx(slides: &[&str]) -> Vec<u8> {
    let mut entries = vec![(
        "ppt/presentation.xml",
        "<p:presentation xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"/>"
            .to_string(),
    )];
    let names: Vec<String> = (1..=slides.len())
        .map(|i| format!("ppt/slides/slide{}.xml", i))
        .collect();
    for (name, text) in names.iter().zip(slides) {
        entries.push((
            name.as_str(),
            format!(
                "<p:sld xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
                 xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
                 <p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p>\
                 </p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
                text
            ),
        ));
    }
    zip_bytes(&entries)
}

/// PPTX whose deck order differs from its part names.
///
/// `slides[i]` is stored as `ppt/slides/slide{i+1}.xml`; `order` lists those
/// 1-based part numbers in presentation order.
pub fn pptx_in_deck_order(slides: &[&str], order: &[usize]) -> Vec<u8> {
    let ids: String = order
        .iter()
        .enumerate()
        .map(|(i, _)| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 256 + i, i + 10))
        .collect();
    let rels: String = order
        .iter()
        .enumerate()
        .map(|(i, part)| {
            format!(
                "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide\" Target=\"slides/slide{}.xml\"/>",
                i + 10,
                part
            )
        })
        .collect();

    let mut entries = vec![
        (
            "ppt/presentation.xml".to_string(),
            format!(
                "<p:presentation xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
                 xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                 <p:sldIdLst>{}</p:sldIdLst></p:presentation>",
                ids
            ),
        ),
        (
            "ppt/_rels/presentation.xml.rels".to_string(),
            format!(
                "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
                rels
            ),
        ),
    ];
    for (i, text) in slides.iter().enumerate() {
        entries.push((
            format!("ppt/slides/slide{}.xml", i + 1),
            format!(
                "<p:sld xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
                 xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\">\
                 <p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p>\
                 </p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
                text
            ),
        ));
    }
    let borrowed: Vec<(&str, String)> = entries
        .iter()
        .map(|(name, body)| (name.as_str(), body.clone()))
        .collect();
    zip_bytes(&borrowed)
}
