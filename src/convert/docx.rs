//! Minimal WordprocessingML package reading and writing.
//!
//! Only paragraph text is modelled. Writing produces the three parts Word
//! needs to open a document; reading walks `word/document.xml` and collects
//! the text of body-level paragraphs, skipping tables.

use std::io::{Read, Seek, Write};

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{AppError, Result};

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_XML_PART: &str = "word/document.xml";

fn zip_err(e: zip::result::ZipError) -> AppError {
    AppError::Conversion(format!("Invalid DOCX package: {}", e))
}

fn xml_err(e: quick_xml::Error) -> AppError {
    AppError::Conversion(format!("Invalid DOCX XML: {}", e))
}

/// Drop characters XML 1.0 cannot carry
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\t' || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}'))
        .collect()
}

fn document_xml(pages: &[Vec<String>]) -> String {
    let mut body = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            body.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        for paragraph in page {
            let text = xml_safe(paragraph);
            if text.is_empty() {
                body.push_str("<w:p/>");
            } else {
                body.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
                body.push_str(&escape(text.as_str()));
                body.push_str("</w:t></w:r></w:p>");
            }
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

/// Write a DOCX package. Each inner vector is one source page of paragraphs;
/// pages are separated by hard page breaks.
pub fn write_docx<W: Write + Seek>(writer: W, pages: &[Vec<String>]) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        (DOCUMENT_XML_PART, document_xml(pages)),
    ];
    for (name, content) in parts {
        zip.start_file(name, options).map_err(zip_err)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Read the text of every body-level paragraph.
///
/// Runs are concatenated, `w:tab` becomes a tab and `w:br`/`w:cr` a newline.
/// Paragraphs inside tables and fallback copies of alternate content are skipped.
/// The document part may inflate to at most `max_xml_bytes`.
pub fn read_paragraphs<R: Read + Seek>(reader: R, max_xml_bytes: u64) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(reader).map_err(zip_err)?;
    let part = archive.by_name(DOCUMENT_XML_PART).map_err(zip_err)?;
    if part.size() > max_xml_bytes {
        return Err(too_large(max_xml_bytes));
    }

    // The declared size is not trusted; stop one byte past the limit
    let mut raw = Vec::new();
    part.take(max_xml_bytes + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > max_xml_bytes {
        return Err(too_large(max_xml_bytes));
    }

    let xml = String::from_utf8(raw)
        .map_err(|e| AppError::Conversion(format!("Invalid DOCX XML: {}", e)))?;
    parse_document_xml(&xml)
}

fn too_large(limit: u64) -> AppError {
    AppError::Conversion(format!(
        "{} exceeds {} bytes uncompressed",
        DOCUMENT_XML_PART, limit
    ))
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut paragraph_depth = 0usize;
    let mut table_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut in_text = false;

    loop {
        let skipping = table_depth > 0 || fallback_depth > 0;
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"mc:Fallback" => fallback_depth += 1,
                b"w:p" if !skipping => {
                    if current.is_none() {
                        current = Some(String::new());
                    }
                    paragraph_depth += 1;
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if !skipping && current.is_none() => paragraphs.push(String::new()),
                b"w:tab" if !skipping => {
                    if let Some(p) = current.as_mut() {
                        p.push('\t');
                    }
                }
                b"w:br" | b"w:cr" if !skipping => {
                    if let Some(p) = current.as_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text && !skipping => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                b"mc:Fallback" => fallback_depth = fallback_depth.saturating_sub(1),
                b"w:p" if !skipping && paragraph_depth > 0 => {
                    paragraph_depth -= 1;
                    if paragraph_depth == 0 {
                        if let Some(p) = current.take() {
                            paragraphs.push(p);
                        }
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
