//! Office Open XML extractor for Word documents and PowerPoint decks.
//!
//! Both formats store text in runs (`w:t`, `a:t`) grouped into paragraphs
//! (`w:p`, `a:p`). Paragraph ends become line breaks. Word tabs and
//! explicit line breaks are kept.
//!
//! Slides follow the presentation's `p:sldIdLst`. Packages without a usable
//! list fall back to the number in the slide part name.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::debug;

use crate::archive::{self, attribute, Package};

const DOCUMENT_PART: &str = "word/document.xml";
const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";
const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Element names that shape the text of one OOXML vocabulary.
struct RunMarkup {
    text: &'static [u8],
    paragraph: &'static [u8],
    tab: Option<&'static [u8]>,
    /// Container of tab stop definitions, whose tab elements are not text.
    tab_stops: &'static [u8],
    breaks: &'static [&'static [u8]],
}

const WORDPROCESSING: RunMarkup = RunMarkup {
    text: b"t",
    paragraph: b"p",
    tab: Some(b"tab"),
    tab_stops: b"tabs",
    breaks: &[b"br", b"cr"],
};

const DRAWING: RunMarkup = RunMarkup {
    text: b"t",
    paragraph: b"p",
    tab: None,
    tab_stops: b"tabLst",
    breaks: &[b"br"],
};

/// Extractor for DOCX and PPTX packages.
pub struct OfficeExtractor;

impl OfficeExtractor {
    /// Create a new Office extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for OfficeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for OfficeExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Docx, DocumentFormat::Pptx]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting {}: {:?}", format, document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || {
            let text = match format {
                DocumentFormat::Pptx => extract_pptx(&bytes)?,
                _ => extract_docx(&bytes)?,
            };
            Ok(ExtractedText::native(text))
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut package = archive::open(bytes, DocumentFormat::Docx)?;
    let xml = archive::read_entry(&mut package, DOCUMENT_PART, DocumentFormat::Docx)?;
    runs_to_text(&xml, &WORDPROCESSING, DocumentFormat::Docx)
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut package = archive::open(bytes, DocumentFormat::Pptx)?;

    let mut slides = listed_slides(&mut package)?;
    if slides.is_empty() {
        slides = numbered_slides(&package);
    }
    debug!("PPTX has {} slides", slides.len());

    let mut texts = Vec::with_capacity(slides.len());
    for name in slides {
        let xml = archive::read_entry(&mut package, &name, DocumentFormat::Pptx)?;
        texts.push(runs_to_text(&xml, &DRAWING, DocumentFormat::Pptx)?);
    }
    Ok(texts.join("\n"))
}

/// Slide parts in `p:sldIdLst` order, each `r:id` resolved through the
/// presentation relationships. Empty when the package has no list.
fn listed_slides(package: &mut Package<'_>) -> Result<Vec<String>, ExtractError> {
    if !archive::has_entry(package, PRESENTATION_PART)
        || !archive::has_entry(package, PRESENTATION_RELS)
    {
        return Ok(Vec::new());
    }

    let presentation = archive::read_entry(package, PRESENTATION_PART, DocumentFormat::Pptx)?;
    let ids = collect_elements(&presentation, b"sldId", |e| attribute(e, b"id", true))?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rels = archive::read_entry(package, PRESENTATION_RELS, DocumentFormat::Pptx)?;
    let targets: HashMap<String, String> = collect_elements(&rels, b"Relationship", |e| {
        Some((attribute(e, b"Id", false)?, attribute(e, b"Target", false)?))
    })?
    .into_iter()
    .collect();

    ids.iter()
        .map(|id| {
            targets
                .get(id)
                .map(|target| archive::resolve_path("ppt", target))
                .ok_or_else(|| {
                    ExtractError::parse(
                        DocumentFormat::Pptx,
                        format!("slide relationship '{id}' not found"),
                    )
                })
        })
        .collect()
}

/// Slide parts sorted by the number in their name.
fn numbered_slides(package: &Package<'_>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive::entry_names(package)
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    slides.sort_unstable();
    slides.into_iter().map(|(_, name)| name).collect()
}

/// `ppt/slides/slide12.xml` -> 12.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Apply `pick` to every element with local name `name`, keeping the hits.
fn collect_elements<T>(
    xml: &[u8],
    name: &[u8],
    mut pick: impl FnMut(&BytesStart<'_>) -> Option<T>,
) -> Result<Vec<T>, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut found = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == name => {
                found.extend(pick(&e));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::parse(
                    DocumentFormat::Pptx,
                    format!("XML error at position {}: {e}", reader.buffer_position()),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(found)
}

/// Collect run text from one XML part.
fn runs_to_text(
    xml: &[u8],
    markup: &RunMarkup,
    format: DocumentFormat,
) -> Result<String, ExtractError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;
    let mut in_tab_stops = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == markup.text {
                    in_text = true;
                } else if name.as_ref() == markup.tab_stops {
                    in_tab_stops = true;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == markup.text {
                    in_text = false;
                } else if name.as_ref() == markup.tab_stops {
                    in_tab_stops = false;
                } else if name.as_ref() == markup.paragraph {
                    out.push('\n');
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if markup.tab == Some(name) && !in_tab_stops {
                    out.push('\t');
                } else if markup.breaks.contains(&name) || name == markup.paragraph {
                    out.push('\n');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::parse(format, e))?;
                out.push_str(&text);
            }
            Ok(Event::CData(t)) if in_text => {
                out.push_str(&String::from_utf8_lossy(&t));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::parse(
                    format,
                    format!("XML error at position {}: {e}", reader.buffer_position()),
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::zip_with;
    use crate::normalize::clean_text;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
    const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    fn docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
        );
        zip_with(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", xml.as_str()),
        ])
    }

    fn slide(text: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="{A_NS}" xmlns:p="{P_NS}"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    async fn extract(bytes: Vec<u8>, format: DocumentFormat) -> Result<ExtractedText, ExtractError> {
        let document = SourceDocument::new(bytes, None);
        OfficeExtractor::new().extract(&document, format).await
    }

    #[tokio::test]
    async fn test_docx_paragraphs() {
        let bytes = docx(
            "<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space=\"preserve\"> world</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>",
        );
        let result = extract(bytes, DocumentFormat::Docx).await.unwrap();
        assert_eq!(clean_text(&result.text), "Hello world\nSecond paragraph");
    }

    #[tokio::test]
    async fn test_docx_tabs_and_breaks() {
        let bytes = docx(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
             <w:r><w:t>Name</w:t><w:tab/><w:t>Value</w:t><w:br/><w:t>Next</w:t></w:r></w:p>",
        );
        let result = extract(bytes, DocumentFormat::Docx).await.unwrap();
        assert_eq!(clean_text(&result.text), "Name\tValue\nNext");
    }

    #[tokio::test]
    async fn test_docx_entities_unescaped() {
        let bytes = docx("<w:p><w:r><w:t>Fish &amp; Chips</w:t></w:r></w:p>");
        let result = extract(bytes, DocumentFormat::Docx).await.unwrap();
        assert_eq!(clean_text(&result.text), "Fish & Chips");
    }

    #[tokio::test]
    async fn test_docx_without_document_part() {
        let bytes = zip_with(&[("[Content_Types].xml", "<Types/>")]);
        let err = extract(bytes, DocumentFormat::Docx).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn test_docx_malformed_xml() {
        let bytes = zip_with(&[("word/document.xml", "<w:document><w:body></w:document>")]);
        let err = extract(bytes, DocumentFormat::Docx).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn test_pptx_slides_in_numeric_order() {
        let s1 = slide("First");
        let s2 = slide("Second");
        let s10 = slide("Tenth");
        let bytes = zip_with(&[
            ("ppt/presentation.xml", "<p:presentation/>"),
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
        ]);
        let result = extract(bytes, DocumentFormat::Pptx).await.unwrap();
        assert_eq!(clean_text(&result.text), "First\nSecond\nTenth");
    }

    fn presentation(order: &[u32]) -> String {
        let entries: String = order
            .iter()
            .enumerate()
            .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{n}"/>"#, 256 + i))
            .collect();
        format!(
            r#"<p:presentation xmlns:p="{P_NS}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId9"/></p:sldMasterIdLst><p:sldIdLst>{entries}</p:sldIdLst></p:presentation>"#
        )
    }

    fn presentation_rels(slides: &[u32]) -> String {
        let entries: String = slides
            .iter()
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{n}.xml"/>"#
                )
            })
            .collect();
        format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{entries}<Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/></Relationships>"#
        )
    }

    #[tokio::test]
    async fn test_pptx_follows_slide_id_list() {
        let deck = presentation(&[3, 1, 2]);
        let rels = presentation_rels(&[1, 2, 3]);
        let (s1, s2, s3) = (slide("Agenda"), slide("Results"), slide("Title"));
        let bytes = zip_with(&[
            ("ppt/presentation.xml", deck.as_str()),
            ("ppt/_rels/presentation.xml.rels", rels.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide3.xml", s3.as_str()),
        ]);
        let result = extract(bytes, DocumentFormat::Pptx).await.unwrap();
        assert_eq!(clean_text(&result.text), "Title
Agenda
Results");
    }

    #[tokio::test]
    async fn test_pptx_slide_outside_list_is_skipped() {
        let deck = presentation(&[2]);
        let rels = presentation_rels(&[1, 2]);
        let (s1, s2) = (slide("Dropped"), slide("Kept"));
        let bytes = zip_with(&[
            ("ppt/presentation.xml", deck.as_str()),
            ("ppt/_rels/presentation.xml.rels", rels.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
        ]);
        let result = extract(bytes, DocumentFormat::Pptx).await.unwrap();
        assert_eq!(clean_text(&result.text), "Kept");
    }

    #[tokio::test]
    async fn test_pptx_dangling_slide_id_is_parse_error() {
        let deck = presentation(&[1, 4]);
        let rels = presentation_rels(&[1]);
        let s1 = slide("Only");
        let bytes = zip_with(&[
            ("ppt/presentation.xml", deck.as_str()),
            ("ppt/_rels/presentation.xml.rels", rels.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
        ]);
        let err = extract(bytes, DocumentFormat::Pptx).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[tokio::test]
    async fn test_pptx_without_slides_is_empty() {
        let bytes = zip_with(&[("ppt/presentation.xml", "<p:presentation/>")]);
        let result = extract(bytes, DocumentFormat::Pptx).await.unwrap();
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide7.xml"), Some(7));
        assert_eq!(slide_number("ppt/slides/_rels/slide7.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }
}
