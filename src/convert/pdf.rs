//! PDF text extraction and plain-text PDF rendering on top of `lopdf`.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

use crate::error::{AppError, Result};

// A4 portrait, in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 56;
const FONT_SIZE: i64 = 12;
const LEADING: i64 = 16;

/// Helvetica advance widths for ASCII 0x20..=0x7E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const DEFAULT_WIDTH: u16 = 556;

fn pdf_err(e: lopdf::Error) -> AppError {
    AppError::Conversion(format!("PDF error: {}", e))
}

/// Extract the text of each page, in page order. Each page is split into lines.
pub fn extract_pages(path: &Path) -> Result<Vec<Vec<String>>> {
    let doc = Document::load(path).map_err(pdf_err)?;
    if doc.is_encrypted() {
        return Err(AppError::Conversion("PDF is encrypted".to_string()));
    }

    let mut pages = Vec::new();
    let mut failed = 0;
    for page_number in doc.get_pages().keys() {
        // A page whose fonts cannot be decoded becomes an empty page
        match doc.extract_text(&[*page_number]) {
            Ok(text) => {
                pages.push(text.lines().map(|l| l.trim_end().to_string()).collect());
            }
            Err(e) => {
                warn!(page = *page_number, error = %e, "Failed to extract page text");
                failed += 1;
                pages.push(Vec::new());
            }
        }
    }

    if pages.is_empty() {
        return Err(AppError::Conversion("PDF has no pages".to_string()));
    }
    if failed == pages.len() {
        return Err(AppError::Conversion(
            "No text could be extracted from any page".to_string(),
        ));
    }
    Ok(pages)
}

/// Keep only characters a standard Type1 font with WinAnsiEncoding can show,
/// mapped to their single-byte codes. Tabs become spaces.
pub fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '\t' => Some(b' '),
            c if (c as u32) < 0x20 => None,
            c if (0x7F..0xA0).contains(&(c as u32)) => None,
            c if (c as u32) <= 0xFF => Some(c as u32 as u8),
            _ => None,
        })
        .collect()
}

fn char_width(byte: u8) -> i64 {
    let w = match byte {
        0x20..=0x7E => HELVETICA_WIDTHS[(byte - 0x20) as usize],
        _ => DEFAULT_WIDTH,
    };
    w as i64 * FONT_SIZE
}

fn text_width(bytes: &[u8]) -> i64 {
    bytes.iter().map(|&b| char_width(b)).sum()
}

/// Greedy word wrap of one paragraph line into lines that fit `max_width`
/// (in 1/1000 pt). Words wider than a line are split across lines.
fn wrap(bytes: &[u8], max_width: i64) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    let space = char_width(b' ');

    for word in bytes.split(|&b| b == b' ').filter(|w| !w.is_empty()) {
        let word_width = text_width(word);
        let needed = if line.is_empty() {
            word_width
        } else {
            text_width(&line) + space + word_width
        };

        if needed <= max_width {
            if !line.is_empty() {
                line.push(b' ');
            }
            line.extend_from_slice(word);
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }

        if word_width <= max_width {
            line.extend_from_slice(word);
        } else {
            let mut width = 0;
            for &b in word {
                let w = char_width(b);
                if width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    width = 0;
                }
                line.push(b);
                width += w;
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Lay paragraphs out into pages of lines
pub fn layout(paragraphs: &[String]) -> Vec<Vec<Vec<u8>>> {
    let max_width = (PAGE_WIDTH - 2 * MARGIN) * 1000;
    let lines_per_page = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

    let lines: Vec<Vec<u8>> = paragraphs
        .iter()
        .flat_map(|p| p.split('\n').map(str::to_string).collect::<Vec<_>>())
        .flat_map(|line| wrap(&latin1_bytes(&line), max_width))
        .collect();

    let mut pages: Vec<Vec<Vec<u8>>> = lines
        .chunks(lines_per_page)
        .map(|chunk| chunk.to_vec())
        .collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

fn page_content(lines: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut operations = Vec::new();
    let mut baseline = PAGE_HEIGHT - MARGIN - FONT_SIZE;

    for line in lines {
        if !line.is_empty() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![MARGIN.into(), baseline.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(line.clone())],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        baseline -= LEADING;
    }

    Content { operations }.encode().map_err(pdf_err)
}

/// Render paragraphs as a paginated A4 document in 12pt Helvetica.
pub fn render_text_pdf(paragraphs: &[String]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in layout(paragraphs) {
        let content_id: ObjectId =
            doc.add_object(Stream::new(dictionary! {}, page_content(&lines)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| AppError::Conversion(format!("Failed to write PDF: {}", e)))?;
    Ok(out)
}
