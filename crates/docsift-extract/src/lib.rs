//! # docsift-extract
//!
//! Format detection, dispatch and text extraction.
//!
//! A document goes through four steps: the [`detect`](detect::detect) function
//! sniffs its MIME type from content, the [`ExtractorRegistry`] resolves it
//! to one [`DocumentFormat`](docsift_core::DocumentFormat) (falling back to
//! the filename extension), the owning extractor produces raw text, and
//! [`clean_text`] normalizes it.
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`PdfExtractor`] | `.pdf` | Text layer via lopdf, OCR fallback for scanned pages |
//! | [`ImageExtractor`] | `.png`, `.jpg`, `.tiff`, `.bmp`, `.gif` | Single OCR pass |
//! | [`OfficeExtractor`] | `.docx`, `.pptx` | Run text from the OOXML parts |
//! | [`SpreadsheetExtractor`] | `.xlsx` | Every sheet, tab-separated rows |
//! | [`OpenDocumentExtractor`] | `.odt` | Paragraphs from `content.xml` |
//! | [`EpubExtractor`] | `.epub` | Spine documents in reading order |
//! | [`HtmlExtractor`] | `.html`, `.htm`, `.xhtml` | Visible text only |
//! | [`RtfExtractor`] | `.rtf` | Body text, destinations skipped |
//! | [`TextExtractor`] | `.txt`, `.md`, `.csv` | Charset detection, Markdown rendering, CSV rows |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docsift_extract::{ExtractorConfig, ExtractorRegistry};
//! use std::path::Path;
//!
//! let registry = ExtractorRegistry::new(&ExtractorConfig::default());
//! let result = registry.extract(Path::new("report.pdf")).await?;
//! println!("{} ({}): {} chars", result.mime_type, result.method, result.text.len());
//! ```
//!
//! ## OCR
//!
//! Images and scanned PDF pages are recognized through the [`OcrEngine`]
//! trait; PDF pages are rendered through [`PageRasterizer`]. The defaults
//! shell out to `tesseract` and poppler's `pdftoppm`.
//!
//! ## Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ExtractorRegistry`] | Detects and routes documents to extractors |
//! | [`ExtractionPool`] | Bounded concurrency and deadlines over a registry |
//! | [`StagedDocument`] | Upload bytes in a temp file removed on drop |
//! | [`TesseractOcr`] | OCR through the `tesseract` CLI |
//! | [`PdftoppmRasterizer`] | PDF page rendering through `pdftoppm` |

mod archive;
pub mod decode;
pub mod detect;
pub mod epub;
pub mod html;
pub mod image;
pub mod normalize;
pub mod ocr;
pub mod office;
pub mod opendocument;
pub mod pdf;
pub mod pool;
pub mod registry;
pub mod rtf;
pub mod spreadsheet;
pub mod staging;
pub mod text;

pub use detect::{detect, detect_bytes};
pub use epub::EpubExtractor;
pub use html::HtmlExtractor;
pub use image::ImageExtractor;
pub use normalize::clean_text;
pub use ocr::{
    NoopOcr, OcrConfig, OcrEngine, OcrError, PageRasterizer, PdftoppmRasterizer, TesseractOcr,
};
pub use office::OfficeExtractor;
pub use opendocument::OpenDocumentExtractor;
pub use pdf::{PdfConfig, PdfExtractor};
pub use pool::ExtractionPool;
pub use registry::{ExtractorConfig, ExtractorRegistry};
pub use rtf::RtfExtractor;
pub use spreadsheet::SpreadsheetExtractor;
pub use staging::{extract_upload, StagedDocument};
pub use text::TextExtractor;
