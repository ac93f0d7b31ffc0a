//! Extractor registry: detects a document's format and routes it to the one
//! extractor that owns it.

use docsift_core::{
    ContentExtractor, DocumentFormat, ExtractError, ExtractionResult, SourceDocument,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::detect;
use crate::epub::EpubExtractor;
use crate::html::HtmlExtractor;
use crate::image::ImageExtractor;
use crate::normalize::clean_text;
use crate::ocr::{NoopOcr, OcrConfig, OcrEngine, PageRasterizer, PdftoppmRasterizer, TesseractOcr};
use crate::office::OfficeExtractor;
use crate::opendocument::OpenDocumentExtractor;
use crate::pdf::{PdfConfig, PdfExtractor};
use crate::rtf::RtfExtractor;
use crate::spreadsheet::SpreadsheetExtractor;
use crate::text::TextExtractor;

/// Settings for the extractors that have any.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub ocr: OcrConfig,
    pub pdf: PdfConfig,
    /// poppler `pdftoppm` executable used to render PDF pages for OCR.
    pub pdftoppm_cmd: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            pdf: PdfConfig::default(),
            pdftoppm_cmd: "pdftoppm".to_string(),
        }
    }
}

/// The closed set of extractors, one per format family.
pub struct ExtractorRegistry {
    pdf: PdfExtractor,
    image: ImageExtractor,
    office: OfficeExtractor,
    spreadsheet: SpreadsheetExtractor,
    opendocument: OpenDocumentExtractor,
    epub: EpubExtractor,
    html: HtmlExtractor,
    rtf: RtfExtractor,
    text: TextExtractor,
}

impl ExtractorRegistry {
    /// Create a registry backed by the command-line OCR tools.
    #[must_use]
    pub fn new(config: &ExtractorConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = if config.ocr.enabled {
            Arc::new(TesseractOcr::new(&config.ocr))
        } else {
            Arc::new(NoopOcr)
        };
        let rasterizer = Arc::new(PdftoppmRasterizer::new(config.pdftoppm_cmd.clone()));
        Self::with_engines(config, ocr, rasterizer)
    }

    /// Create a registry with explicit OCR and rasterization backends.
    #[must_use]
    pub fn with_engines(
        config: &ExtractorConfig,
        ocr: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        Self {
            pdf: PdfExtractor::new(
                Arc::clone(&ocr),
                rasterizer,
                config.pdf.clone(),
                config.ocr.dpi,
            ),
            image: ImageExtractor::new(ocr),
            office: OfficeExtractor::new(),
            spreadsheet: SpreadsheetExtractor::new(),
            opendocument: OpenDocumentExtractor::new(),
            epub: EpubExtractor::new(),
            html: HtmlExtractor::new(),
            rtf: RtfExtractor::new(),
            text: TextExtractor::new(),
        }
    }

    /// The extractor that owns `format`.
    #[must_use]
    pub fn extractor_for(&self, format: DocumentFormat) -> &dyn ContentExtractor {
        match format {
            DocumentFormat::Pdf => &self.pdf,
            DocumentFormat::Docx | DocumentFormat::Pptx => &self.office,
            DocumentFormat::Xlsx => &self.spreadsheet,
            DocumentFormat::Odt => &self.opendocument,
            DocumentFormat::Epub => &self.epub,
            DocumentFormat::Png
            | DocumentFormat::Jpeg
            | DocumentFormat::Tiff
            | DocumentFormat::Bmp
            | DocumentFormat::Gif => &self.image,
            DocumentFormat::Html => &self.html,
            DocumentFormat::Rtf => &self.rtf,
            DocumentFormat::Markdown | DocumentFormat::Csv | DocumentFormat::PlainText => {
                &self.text
            }
        }
    }

    /// Map a detected MIME type to a supported format.
    ///
    /// The MIME type decides when it is in the registry; otherwise the
    /// filename extension does. Neither matching is an unsupported type.
    pub fn resolve_format(
        &self,
        mime_type: &str,
        document: &SourceDocument,
    ) -> Result<DocumentFormat, ExtractError> {
        if let Some(format) = DocumentFormat::from_mime(mime_type) {
            return Ok(format);
        }

        if let Some(format) = document
            .extension()
            .and_then(|ext| DocumentFormat::from_extension(&ext))
        {
            debug!(
                "MIME {} not registered, using extension fallback: {}",
                mime_type, format
            );
            return Ok(format);
        }

        Err(ExtractError::UnsupportedType(mime_type.to_string()))
    }

    /// Extract text from a file on disk.
    pub async fn extract(&self, path: &Path) -> Result<ExtractionResult, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToString::to_string);
        self.extract_document(&SourceDocument::new(bytes, filename))
            .await
    }

    /// Extract text from a buffered document.
    pub async fn extract_document(
        &self,
        document: &SourceDocument,
    ) -> Result<ExtractionResult, ExtractError> {
        let mime_type = detect::detect(document)?;
        let format = self.resolve_format(&mime_type, document)?;
        debug!(
            "Dispatching {:?} ({} bytes, detected {}) to {} extractor",
            document.filename(),
            document.len(),
            mime_type,
            format
        );

        let extracted = self.extractor_for(format).extract(document, format).await?;

        Ok(ExtractionResult {
            text: clean_text(&extracted.text),
            mime_type: format.mime_type().to_string(),
            method: extracted.method,
        })
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::{build_pdf, CountingOcr, DpiRecorder, FakeRasterizer};
    use docsift_core::ExtractionMethod;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    fn registry_with_counter() -> (ExtractorRegistry, Arc<CountingOcr>) {
        let ocr = Arc::new(CountingOcr::default());
        let registry = ExtractorRegistry::with_engines(
            &ExtractorConfig::default(),
            ocr.clone(),
            Arc::new(FakeRasterizer),
        );
        (registry, ocr)
    }

    fn doc(bytes: &[u8], name: &str) -> SourceDocument {
        SourceDocument::new(bytes.to_vec(), Some(name.to_string()))
    }

    #[test]
    fn test_every_format_has_an_owning_extractor() {
        let (registry, _) = registry_with_counter();
        for format in DocumentFormat::ALL {
            assert!(
                registry.extractor_for(format).can_extract(format),
                "{format} is routed to an extractor that does not claim it"
            );
        }
    }

    #[test]
    fn test_resolve_by_mime() {
        let (registry, _) = registry_with_counter();
        let document = doc(b"x", "file.bin");
        assert_eq!(
            registry.resolve_format("application/pdf", &document).unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            registry.resolve_format("image/jpg", &document).unwrap(),
            DocumentFormat::Jpeg
        );
    }

    #[test]
    fn test_resolve_by_extension_fallback() {
        let (registry, _) = registry_with_counter();
        let document = doc(b"x", "Report.DOCX");
        assert_eq!(
            registry.resolve_format("application/zip", &document).unwrap(),
            DocumentFormat::Docx
        );
    }

    #[test]
    fn test_resolve_unsupported() {
        let (registry, _) = registry_with_counter();
        let err = registry
            .resolve_format("application/x-msdownload", &doc(b"MZ", "setup.exe"))
            .unwrap_err();
        match err {
            ExtractError::UnsupportedType(mime) => assert_eq!(mime, "application/x-msdownload"),
            other => panic!("Expected UnsupportedType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_csv_from_path() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("people.csv");
        std::fs::write(&file_path, "a,b\n1,2\n").unwrap();

        let (registry, _) = registry_with_counter();
        let result = registry.extract(&file_path).await.unwrap();

        assert_eq!(result.mime_type, "text/csv");
        assert_eq!(result.text, "a\tb\n1\t2");
        assert_eq!(result.method, ExtractionMethod::Native);
    }

    #[tokio::test]
    async fn test_extract_nonexistent_file_is_io_error() {
        let (registry, _) = registry_with_counter();
        let err = registry
            .extract(Path::new("/nonexistent/docsift/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
    }

    #[tokio::test]
    async fn test_unsupported_bytes_never_reach_ocr() {
        let (registry, ocr) = registry_with_counter();
        let document = doc(&[0u8, 159, 146, 150, 0, 1, 2, 3], "blob.bin");

        let err = registry.extract_document(&document).await.unwrap_err();

        assert!(matches!(err, ExtractError::UnsupportedType(_)));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pdf_text_layer_through_registry() {
        let (registry, ocr) = registry_with_counter();
        let document = doc(&build_pdf(&[Some("Invoice 7"), Some("Total due")]), "inv.pdf");

        let result = registry.extract_document(&document).await.unwrap();

        assert_eq!(result.mime_type, "application/pdf");
        assert!(result.text.contains("Invoice 7"));
        assert!(result.text.contains("Total due"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_result_text_is_normalized() {
        let (registry, _) = registry_with_counter();
        let document = doc(b"  first  \r\n\r\n\r\n  second\n\n", "notes.txt");

        let result = registry.extract_document(&document).await.unwrap();

        assert_eq!(result.mime_type, "text/plain");
        assert_eq!(result.text, "first\nsecond");
    }

    #[tokio::test]
    async fn test_empty_file_is_io_error() {
        let (registry, _) = registry_with_counter();
        let err = registry
            .extract_document(&doc(b"", "empty.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), docsift_core::ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_ocr_dpi_reaches_pdf_rasterizer() {
        let mut config = ExtractorConfig::default();
        config.ocr.dpi = 200;
        let rasterizer = Arc::new(DpiRecorder::default());
        let registry = ExtractorRegistry::with_engines(
            &config,
            Arc::new(CountingOcr::default()),
            rasterizer.clone(),
        );

        registry
            .extract_document(&doc(&build_pdf(&[None]), "scan.pdf"))
            .await
            .unwrap();

        assert_eq!(*rasterizer.seen.lock().unwrap(), vec![200]);
    }

    #[tokio::test]
    async fn test_bm_prefixed_csv_is_extracted_as_csv() {
        let (registry, ocr) = registry_with_counter();
        let document = doc(b"BMI,weight\n22.5,70\n", "health.csv");

        let result = registry.extract_document(&document).await.unwrap();

        assert_eq!(result.mime_type, "text/csv");
        assert_eq!(result.text, "BMI\tweight\n22.5\t70");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_binary_without_nul_is_unsupported() {
        let (registry, _) = registry_with_counter();
        let document = doc(&[0x8F, 0x90, 0x9D, 0x81, 0x01, 0x02, 0x03, 0xFE], "payload.dat");

        let err = registry.extract_document(&document).await.unwrap_err();

        assert!(matches!(err, ExtractError::UnsupportedType(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ExtractorConfig::default();
        assert_eq!(config.pdftoppm_cmd, "pdftoppm");
        assert_eq!(config.pdf.min_text_chars, 1);
        assert!(config.pdf.per_page_fallback);
    }
}
