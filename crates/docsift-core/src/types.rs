//! Core types for docsift.
//!
//! ## Input
//! - [`SourceDocument`]: buffered bytes plus an optional filename hint
//!
//! ## Formats
//! - [`DocumentFormat`]: the closed set of formats docsift can extract
//! - [`FormatFamily`]: groups formats that share one extractor
//!
//! ## Output
//! - [`ExtractedText`]: what a single extractor produces
//! - [`ExtractionResult`]: normalized text plus canonical MIME type
//! - [`ExtractionMethod`]: whether text came from a text layer, OCR, or both

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Source documents
// ============================================================================

/// A fully buffered document waiting to be extracted.
///
/// The bytes live behind an `Arc` so extractors can move a handle into a
/// blocking task without copying the document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    data: Arc<[u8]>,
    filename: Option<String>,
}

impl SourceDocument {
    /// Wrap raw bytes with an optional original filename.
    pub fn new(data: impl Into<Arc<[u8]>>, filename: Option<String>) -> Self {
        Self {
            data: data.into(),
            filename,
        }
    }

    /// Document bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the document bytes.
    #[must_use]
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Original filename, if the caller supplied one.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Lowercased extension of the filename hint, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.filename
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Every format docsift can extract text from.
///
/// The set is closed: anything that does not resolve to one of these
/// variants is rejected before an extractor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Pptx,
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
    Odt,
    Rtf,
    Html,
    Epub,
    Markdown,
    Csv,
    #[serde(rename = "text")]
    PlainText,
}

/// Formats that share an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    Pdf,
    Office,
    Spreadsheet,
    OpenDocument,
    Ebook,
    Image,
    Markup,
    Text,
}

impl DocumentFormat {
    /// All supported formats, in display order.
    pub const ALL: [DocumentFormat; 16] = [
        Self::Pdf,
        Self::Docx,
        Self::Xlsx,
        Self::Pptx,
        Self::Png,
        Self::Jpeg,
        Self::Tiff,
        Self::Bmp,
        Self::Gif,
        Self::Odt,
        Self::Rtf,
        Self::Html,
        Self::Epub,
        Self::Markdown,
        Self::Csv,
        Self::PlainText,
    ];

    /// Canonical MIME type reported in results.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Rtf => "application/rtf",
            Self::Html => "text/html",
            Self::Epub => "application/epub+zip",
            Self::Markdown => "text/markdown",
            Self::Csv => "text/csv",
            Self::PlainText => "text/plain",
        }
    }

    /// MIME types accepted for this format besides the canonical one.
    #[must_use]
    pub fn mime_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["image/jpg", "image/pjpeg"],
            Self::Bmp => &["image/x-ms-bmp", "image/x-bmp"],
            Self::Rtf => &["text/rtf"],
            Self::Html => &["application/xhtml+xml"],
            Self::Markdown => &["text/x-markdown"],
            Self::Csv => &["application/csv"],
            _ => &[],
        }
    }

    /// File extensions (lowercase, no dot).
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Docx => &["docx"],
            Self::Xlsx => &["xlsx"],
            Self::Pptx => &["pptx"],
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Tiff => &["tif", "tiff"],
            Self::Bmp => &["bmp"],
            Self::Gif => &["gif"],
            Self::Odt => &["odt"],
            Self::Rtf => &["rtf"],
            Self::Html => &["html", "htm", "xhtml"],
            Self::Epub => &["epub"],
            Self::Markdown => &["md", "markdown"],
            Self::Csv => &["csv"],
            Self::PlainText => &["txt", "text"],
        }
    }

    /// Extractor family this format belongs to.
    #[must_use]
    pub fn family(self) -> FormatFamily {
        match self {
            Self::Pdf => FormatFamily::Pdf,
            Self::Docx | Self::Pptx => FormatFamily::Office,
            Self::Xlsx => FormatFamily::Spreadsheet,
            Self::Odt => FormatFamily::OpenDocument,
            Self::Epub => FormatFamily::Ebook,
            Self::Png | Self::Jpeg | Self::Tiff | Self::Bmp | Self::Gif => FormatFamily::Image,
            Self::Html | Self::Rtf => FormatFamily::Markup,
            Self::Markdown | Self::Csv | Self::PlainText => FormatFamily::Text,
        }
    }

    /// Short human name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
            Self::Xlsx => "XLSX",
            Self::Pptx => "PPTX",
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Tiff => "TIFF",
            Self::Bmp => "BMP",
            Self::Gif => "GIF",
            Self::Odt => "ODT",
            Self::Rtf => "RTF",
            Self::Html => "HTML",
            Self::Epub => "EPUB",
            Self::Markdown => "Markdown",
            Self::Csv => "CSV",
            Self::PlainText => "plain text",
        }
    }

    /// Resolve a MIME type (parameters such as `; charset=` are ignored).
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| {
            format.mime_type() == essence || format.mime_aliases().contains(&essence.as_str())
        })
    }

    /// Resolve a file extension (case-insensitive, with or without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    /// Resolve from the extension of a path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether content for this format is text that needs charset decoding.
    #[must_use]
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            Self::Html | Self::Rtf | Self::Markdown | Self::Csv | Self::PlainText
        )
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Results
// ============================================================================

/// How the returned text was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Read from the document's own text (text layer, XML runs, markup).
    #[default]
    Native,
    /// Recognized from rendered pixels.
    Ocr,
    /// Some pages native, some OCR.
    Mixed,
}

impl ExtractionMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Ocr => "ocr",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of a single extractor, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
}

impl ExtractedText {
    pub fn native(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            method: ExtractionMethod::Native,
        }
    }

    pub fn ocr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            method: ExtractionMethod::Ocr,
        }
    }
}

/// Final result of extracting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized UTF-8 text. May be empty.
    pub text: String,
    /// Canonical MIME type of the format that was extracted.
    pub mime_type: String,
    /// How the text was obtained.
    pub method: ExtractionMethod,
}
