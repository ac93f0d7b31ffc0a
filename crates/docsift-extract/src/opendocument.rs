//! OpenDocument text extractor.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::archive;

const CONTENT_PART: &str = "content.xml";
/// Longest run a single `text:s` expands to.
const MAX_SPACE_RUN: usize = 1024;
/// Expanded text may not outgrow the largest part we are willing to read.
const MAX_OUTPUT_BYTES: usize = archive::MAX_ENTRY_BYTES as usize;

/// Extractor for ODT documents.
///
/// Reads `text:p` and `text:h` paragraphs from `content.xml`, expanding
/// `text:s` space runs, `text:tab` and `text:line-break`.
pub struct OpenDocumentExtractor;

impl OpenDocumentExtractor {
    /// Create a new OpenDocument extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenDocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for OpenDocumentExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Odt]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting ODT: {:?}", document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || {
            let mut package = archive::open(&bytes, DocumentFormat::Odt)?;
            let xml = archive::read_entry(&mut package, CONTENT_PART, DocumentFormat::Odt)?;
            paragraphs_to_text(&xml, MAX_OUTPUT_BYTES).map(ExtractedText::native)
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

fn is_paragraph(name: &[u8]) -> bool {
    name == b"p" || name == b"h"
}

fn paragraphs_to_text(xml: &[u8], max_len: usize) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    // paragraphs nest inside notes and frames
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if is_paragraph(e.local_name().as_ref()) {
                    depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if is_paragraph(e.local_name().as_ref()) && depth > 0 {
                    depth -= 1;
                    out.push('\n');
                }
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"s" if depth > 0 => {
                    out.extend(std::iter::repeat(' ').take(space_count(&e)));
                }
                b"tab" if depth > 0 => out.push('\t'),
                b"line-break" if depth > 0 => out.push('\n'),
                name if is_paragraph(name) => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if depth > 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::parse(DocumentFormat::Odt, e))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::parse(
                    DocumentFormat::Odt,
                    format!("XML error at position {}: {e}", reader.buffer_position()),
                ))
            }
            _ => {}
        }
        buf.clear();

        if out.len() > max_len {
            return Err(ExtractError::parse(
                DocumentFormat::Odt,
                format!("expanded text exceeds {max_len} bytes"),
            ));
        }
    }

    Ok(out)
}

/// `<text:s text:c="3"/>` stands for three spaces; `c` defaults to one and
/// is capped at [`MAX_SPACE_RUN`].
fn space_count(element: &BytesStart<'_>) -> usize {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"c")
        .and_then(|attr| std::str::from_utf8(&attr.value).ok()?.parse::<u64>().ok())
        .map_or(1, |count| count.min(MAX_SPACE_RUN as u64) as usize)
}
