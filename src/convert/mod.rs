//! Format converters.
//!
//! Each converter turns a staged input file into a staged output file. They are
//! synchronous and CPU-bound; callers run them on the blocking thread pool.

pub mod docx;
pub mod raster;
pub mod pdf;
pub mod svg;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::ConversionConfig;
use crate::error::Result;
use crate::models::ConversionKind;

pub use raster::ImageToSvg;
pub use svg::emit_svg;

/// A file-to-file format converter
pub trait Converter: Send + Sync {
    fn convert(&self, input: &Path, output: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// PDF to Word: page text becomes paragraphs, one page break per source page.
pub struct PdfToDocx;

impl Converter for PdfToDocx {
    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let pages = pdf::extract_pages(input)?;
        debug!(pages = pages.len(), "Extracted PDF text");
        let file = File::create(output)?;
        docx::write_docx(file, &pages)
    }

    fn name(&self) -> &'static str {
        "pdf_to_docx"
    }
}

/// Word to PDF: body paragraph text only, re-typeset in a fixed layout.
pub struct DocxToPdf {
    /// Bound on the inflated size of `word/document.xml`
    pub max_xml_bytes: u64,
}

impl Converter for DocxToPdf {
    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let paragraphs =
            docx::read_paragraphs(BufReader::new(File::open(input)?), self.max_xml_bytes)?;
        debug!(paragraphs = paragraphs.len(), "Read DOCX paragraphs");
        let bytes = pdf::render_text_pdf(&paragraphs)?;
        std::fs::write(output, bytes)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "docx_to_pdf"
    }
}

/// Converter registered for a conversion kind
pub fn converter_for(kind: ConversionKind, config: &ConversionConfig) -> Arc<dyn Converter> {
    match kind {
        ConversionKind::PdfToDocx => Arc::new(PdfToDocx),
        ConversionKind::DocxToPdf => Arc::new(DocxToPdf {
            max_xml_bytes: config.max_docx_xml_bytes,
        }),
        ConversionKind::ImageToSvg => Arc::new(ImageToSvg::new(config.max_image_dimension)),
    }
}
