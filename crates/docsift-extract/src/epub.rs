//! EPUB extractor.
//!
//! Follows `META-INF/container.xml` to the package document, then renders
//! each XHTML item of the spine in reading order.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::archive::{self, attribute, Package};
use crate::decode::decode_to_utf8;
use crate::html::html_to_text;

const CONTAINER_PART: &str = "META-INF/container.xml";

/// Extractor for EPUB books.
pub struct EpubExtractor;

impl EpubExtractor {
    /// Create a new EPUB extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for EpubExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for EpubExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Epub]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting EPUB: {:?}", document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || extract_epub(&bytes).map(ExtractedText::native))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

#[derive(Debug)]
struct ManifestItem {
    href: String,
    media_type: String,
}

fn extract_epub(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut package = archive::open(bytes, DocumentFormat::Epub)?;

    let container = archive::read_entry(&mut package, CONTAINER_PART, DocumentFormat::Epub)?;
    let opf_path = rootfile_path(&container)?;
    let opf = archive::read_entry(&mut package, &opf_path, DocumentFormat::Epub)?;
    let (manifest, spine) = parse_package_document(&opf)?;

    let base = opf_path.rsplit_once('/').map_or("", |(dir, _)| dir);
    let mut chapters = Vec::with_capacity(spine.len());
    for idref in &spine {
        let Some(item) = manifest.get(idref) else {
            warn!("EPUB spine references unknown item '{}'", idref);
            continue;
        };
        if !is_html(&item.media_type) {
            debug!("Skipping non-HTML spine item {} ({})", item.href, item.media_type);
            continue;
        }
        chapters.push(read_chapter(&mut package, &archive::resolve_path(base, &item.href))?);
    }

    debug!("EPUB: {} spine items, {} chapters", spine.len(), chapters.len());
    Ok(chapters.join("\n"))
}

fn read_chapter(package: &mut Package<'_>, path: &str) -> Result<String, ExtractError> {
    let bytes = archive::read_entry(package, path, DocumentFormat::Epub)?;
    let source =
        decode_to_utf8(&bytes).map_err(|e| ExtractError::parse(DocumentFormat::Epub, e))?;
    Ok(html_to_text(&source))
}

fn is_html(media_type: &str) -> bool {
    matches!(media_type, "application/xhtml+xml" | "text/html")
}

/// `full-path` of the first `rootfile` in the container document.
fn rootfile_path(container: &[u8]) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(container);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attribute(&e, b"full-path", false) {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::parse(DocumentFormat::Epub, e)),
            _ => {}
        }
        buf.clear();
    }
    Err(ExtractError::parse(
        DocumentFormat::Epub,
        "container.xml has no rootfile",
    ))
}

/// Manifest items by id, and spine idrefs in reading order.
fn parse_package_document(
    opf: &[u8],
) -> Result<(HashMap<String, ManifestItem>, Vec<String>), ExtractError> {
    let mut reader = Reader::from_reader(opf);
    let mut buf = Vec::new();
    let mut manifest = HashMap::new();
    let mut spine = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => match e.local_name().as_ref() {
                b"item" => {
                    if let (Some(id), Some(href)) = (attribute(&e, b"id", false), attribute(&e, b"href", false)) {
                        let media_type = attribute(&e, b"media-type", false).unwrap_or_default();
                        manifest.insert(id, ManifestItem { href, media_type });
                    }
                }
                b"itemref" => {
                    if let Some(idref) = attribute(&e, b"idref", false) {
                        spine.push(idref);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::parse(DocumentFormat::Epub, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((manifest, spine))
}
