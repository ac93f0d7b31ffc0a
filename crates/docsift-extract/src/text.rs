//! Text content extractor: plain text, Markdown and CSV.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use pulldown_cmark::{html, Options, Parser};
use tracing::debug;

use crate::decode::decode_to_utf8;
use crate::html::html_fragment_to_text;

/// Extractor for text-based files.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for TextExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[
            DocumentFormat::PlainText,
            DocumentFormat::Markdown,
            DocumentFormat::Csv,
        ]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting {} file: {:?}", format, document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || extract_text(&bytes, format).map(ExtractedText::native))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    let source = decode_to_utf8(bytes).map_err(|e| ExtractError::parse(format, e))?;

    match format {
        DocumentFormat::Markdown => Ok(markdown_to_text(&source)),
        DocumentFormat::Csv => csv_to_text(&source),
        _ => Ok(source),
    }
}

/// Render Markdown and keep only its visible text.
#[must_use]
pub fn markdown_to_text(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut rendered = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut rendered, Parser::new_ext(source, options));
    html_fragment_to_text(&rendered)
}

/// One line per record, cells separated by tabs.
///
/// Records may have differing field counts. Quoted fields keep their
/// embedded delimiters.
pub fn csv_to_text(source: &str) -> Result<String, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source.as_bytes());

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::parse("CSV", e))?;
        lines.push(record.iter().collect::<Vec<_>>().join("\t"));
    }
    Ok(lines.join("\n"))
}
