//! PDF content extractor.
//!
//! Reads the text layer page by page with lopdf. Scanned documents have no
//! text layer, so when the whole document comes up (nearly) empty every page
//! is rendered and OCR'd instead. Pages that individually lack text can also
//! be OCR'd while the rest keep their native text.

use async_trait::async_trait;
use docsift_core::{
    ContentExtractor, DocumentFormat, ExtractError, ExtractedText, ExtractionMethod,
    SourceDocument,
};
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::ocr::{OcrEngine, PageRasterizer};

/// When to fall back to OCR.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// If the whole text layer has fewer non-whitespace characters than
    /// this, every page is OCR'd.
    pub min_text_chars: usize,
    /// OCR pages whose own text layer is empty even when other pages have text.
    pub per_page_fallback: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 1,
            per_page_fallback: true,
        }
    }
}

/// Extractor for PDF files.
pub struct PdfExtractor {
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn PageRasterizer>,
    config: PdfConfig,
    dpi: u32,
}

impl PdfExtractor {
    /// Create a new PDF extractor. Pages sent to OCR are rendered at `dpi`.
    #[must_use]
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn PageRasterizer>,
        config: PdfConfig,
        dpi: u32,
    ) -> Self {
        Self {
            ocr,
            rasterizer,
            config,
            dpi,
        }
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting PDF: {:?}", document.filename());

        let bytes = document.shared_bytes();
        let ocr = Arc::clone(&self.ocr);
        let rasterizer = Arc::clone(&self.rasterizer);
        let config = self.config.clone();
        let dpi = self.dpi;

        tokio::task::spawn_blocking(move || {
            extract_pdf(&bytes, ocr.as_ref(), rasterizer.as_ref(), &config, dpi)
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

/// Run both phases over PDF bytes.
fn extract_pdf(
    bytes: &[u8],
    ocr: &dyn OcrEngine,
    rasterizer: &dyn PageRasterizer,
    config: &PdfConfig,
    dpi: u32,
) -> Result<ExtractedText, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::parse("PDF", e))?;

    if doc.is_encrypted() {
        return Err(ExtractError::parse("PDF", "document is password protected"));
    }
    doc.catalog()
        .map_err(|e| ExtractError::parse("PDF", format!("missing document catalog: {e}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        debug!("PDF has no pages");
        return Ok(ExtractedText::native(String::new()));
    }

    let layers: Vec<String> = page_numbers
        .iter()
        .map(|&page| page_text_layer(&doc, page))
        .collect();

    let visible: usize = layers.iter().map(|text| visible_chars(text)).sum();
    let scanned = visible < config.min_text_chars;
    if scanned {
        debug!(
            "PDF text layer has {} visible chars (< {}), using OCR for all {} pages",
            visible,
            config.min_text_chars,
            page_numbers.len()
        );
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    let mut ocr_pages = 0usize;
    for (&page, layer) in page_numbers.iter().zip(layers) {
        let needs_ocr = scanned || (config.per_page_fallback && visible_chars(&layer) == 0);
        if needs_ocr {
            ocr_pages += 1;
            pages.push(ocr_page(bytes, page, ocr, rasterizer, dpi));
        } else {
            pages.push(layer);
        }
    }

    let method = if ocr_pages == 0 {
        ExtractionMethod::Native
    } else if ocr_pages == pages.len() {
        ExtractionMethod::Ocr
    } else {
        ExtractionMethod::Mixed
    };
    debug!(
        "PDF extracted: {} pages, {} via OCR ({})",
        pages.len(),
        ocr_pages,
        method
    );

    Ok(ExtractedText {
        text: pages.join("\n"),
        method,
    })
}

/// Text layer of a single page. A page lopdf cannot read counts as empty.
fn page_text_layer(doc: &Document, page: u32) -> String {
    match doc.extract_text(&[page]) {
        Ok(text) => text,
        Err(e) => {
            debug!("No readable text layer on page {}: {}", page, e);
            String::new()
        }
    }
}

/// Render and recognize one page. Failures degrade the page to empty text.
fn ocr_page(
    bytes: &[u8],
    page: u32,
    ocr: &dyn OcrEngine,
    rasterizer: &dyn PageRasterizer,
    dpi: u32,
) -> String {
    let image = match rasterizer.rasterize(bytes, page, dpi) {
        Ok(image) => image,
        Err(e) => {
            warn!("Failed to render PDF page {} for OCR: {}", page, e);
            return String::new();
        }
    };

    match ocr.recognize(&image) {
        Ok(text) => text,
        Err(e) => {
            warn!("OCR with {} failed on PDF page {}: {}", ocr.name(), page, e);
            String::new()
        }
    }
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
