use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::error::AppError;

/// File formats known to the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Docx,
    Jpg,
    Jpeg,
    Png,
    Svg,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Docx => "docx",
            Format::Jpg => "jpg",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Svg => "svg",
        }
    }

    /// Format implied by the extension of a file name, if any
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        ext.parse().ok()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Jpg | Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Svg => "image/svg+xml",
        }
    }
}

impl FromStr for Format {
    type Err = AppError;

    /// Parse an extension or stored format name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Format::Pdf),
            "docx" => Ok(Format::Docx),
            "jpg" => Ok(Format::Jpg),
            "jpeg" => Ok(Format::Jpeg),
            "png" => Ok(Format::Png),
            "svg" => Ok(Format::Svg),
            other => Err(AppError::UnsupportedFormat(format!("Unknown format: {}", other))),
        }
    }
}

/// The conversions offered over HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    PdfToDocx,
    DocxToPdf,
    ImageToSvg,
}

impl ConversionKind {
    /// Source formats accepted for this conversion
    pub fn accepts(&self) -> &'static [Format] {
        match self {
            ConversionKind::PdfToDocx => &[Format::Pdf],
            ConversionKind::DocxToPdf => &[Format::Docx],
            ConversionKind::ImageToSvg => &[Format::Jpg, Format::Jpeg, Format::Png],
        }
    }

    pub fn target(&self) -> Format {
        match self {
            ConversionKind::PdfToDocx => Format::Docx,
            ConversionKind::DocxToPdf => Format::Pdf,
            ConversionKind::ImageToSvg => Format::Svg,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConversionKind::PdfToDocx => "PDF to Word",
            ConversionKind::DocxToPdf => "Word to PDF",
            ConversionKind::ImageToSvg => "Image to SVG",
        }
    }
}

/// Conversion status. Records are only written once the output is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Converted,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionStatus::Converted => "converted",
        }
    }
}

/// Conversion record model
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversionRecord {
    pub id: String,
    pub filename: String,
    pub original_format: String,
    pub converted_format: String,
    pub status: String,
    pub blob_id: String,
    pub uploaded_at: String,
}

impl ConversionRecord {
    pub fn original_format(&self) -> Option<Format> {
        self.original_format.parse().ok()
    }

    pub fn converted_format(&self) -> Option<Format> {
        self.converted_format.parse().ok()
    }
}

/// Listing projection
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversionListItem {
    pub filename: String,
    pub blob_id: String,
}

/// Intent row written before a record and its blob are deleted
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PendingDeletion {
    pub record_id: String,
    pub blob_id: String,
    pub requested_at: String,
}

/// Insert request for a conversion record
#[derive(Debug, Clone)]
pub struct NewConversion {
    pub filename: String,
    pub original_format: Format,
    pub converted_format: Format,
    pub blob_id: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

/// Result of a successful conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResponse {
    pub record_id: String,
    pub download_id: String,
    pub filename: String,
    pub converted_format: Format,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_filename() {
        assert_eq!(Format::from_filename("report.PDF"), Some(Format::Pdf));
        assert_eq!(Format::from_filename("a.b.docx"), Some(Format::Docx));
        assert_eq!(Format::from_filename("photo.jpeg"), Some(Format::Jpeg));
        assert_eq!(Format::from_filename("noext"), None);
        assert_eq!(Format::from_filename("archive.zip"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("DOCX".parse::<Format>().unwrap(), Format::Docx);
        assert_eq!("svg".parse::<Format>().unwrap(), Format::Svg);
        assert!(matches!(
            "doc".parse::<Format>(),
            Err(AppError::UnsupportedFormat(_))
        ));
        for format in [Format::Pdf, Format::Docx, Format::Jpg, Format::Jpeg, Format::Png, Format::Svg] {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn test_image_route_only_accepts_rasters() {
        let accepts = ConversionKind::ImageToSvg.accepts();
        assert!(accepts.contains(&Format::Png));
        assert!(!accepts.contains(&Format::Pdf));
        assert!(!accepts.contains(&Format::Docx));
        assert!(!accepts.contains(&Format::Svg));
    }
}
