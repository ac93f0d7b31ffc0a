//! HTML content extractor.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::decode::decode_to_utf8;

/// Elements whose content is never visible text.
const SKIPPED: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Elements that start and end on their own line.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Extractor for HTML and XHTML documents.
pub struct HtmlExtractor;

impl HtmlExtractor {
    /// Create a new HTML extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for HtmlExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Html]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting HTML: {:?}", document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || {
            let source = decode_to_utf8(&bytes).map_err(|e| ExtractError::parse("HTML", e))?;
            Ok(ExtractedText::native(html_to_text(&source)))
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

/// Render the visible text of an HTML document.
///
/// Block elements are put on their own lines, `<br>` breaks a line and table
/// cells are separated by tabs. Whitespace inside text runs is collapsed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    walk(document.root_element(), &mut out);
    out
}

/// Like [`html_to_text`] but for a fragment such as inline HTML in Markdown.
#[must_use]
pub fn html_fragment_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    walk(fragment.root_element(), &mut out);
    out
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if SKIPPED.contains(&name) {
        return;
    }

    let block = BLOCKS.contains(&name);
    if block {
        break_line(out);
    }

    // preformatted text keeps its own line breaks
    if name == "pre" {
        out.extend(element.text());
        break_line(out);
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_collapsed(out, text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, out);
                }
            }
            _ => {}
        }
    }

    match name {
        "br" => out.push('\n'),
        "td" | "th" => {
            while out.ends_with(' ') {
                out.pop();
            }
            out.push('\t');
        }
        _ if block => break_line(out),
        _ => {}
    }
}

/// Append text with runs of whitespace collapsed to one space.
fn push_collapsed(out: &mut String, text: &str) {
    if text.starts_with(char::is_whitespace) {
        soft_space(out);
    }
    let mut words = text.split_whitespace();
    let Some(first) = words.next() else {
        return;
    };
    out.push_str(first);
    for word in words {
        out.push(' ');
        out.push_str(word);
    }
    if text.ends_with(char::is_whitespace) {
        soft_space(out);
    }
}

fn soft_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with([' ', '\n', '\t']) {
        out.push(' ');
    }
}

fn break_line(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::clean_text;

    fn render(html: &str) -> String {
        clean_text(&html_to_text(html))
    }

    #[test]
    fn test_paragraphs_on_own_lines() {
        let text = render("<html><body><h1>Title</h1><p>First para.</p><p>Second</p></body></html>");
        assert_eq!(text, "Title\nFirst para.\nSecond");
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let text = render(
            "<html><head><title>t</title><style>p{color:red}</style></head>\
             <body><script>var x = 1;</script><p>Visible</p></body></html>",
        );
        assert_eq!(text, "Visible");
    }

    #[test]
    fn test_inline_elements_keep_spacing() {
        let text = render("<p>Hello <b>bold</b> and <i>italic</i> world</p>");
        assert_eq!(text, "Hello bold and italic world");
    }

    #[test]
    fn test_whitespace_collapses() {
        let text = render("<p>  lots\n\n   of\t  space  </p>");
        assert_eq!(text, "lots of space");
    }

    #[test]
    fn test_br_breaks_line() {
        let text = render("<p>line one<br>line two</p>");
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_table_cells_tab_separated() {
        let text = render(
            "<table><tr><th>Name</th><th>Qty</th></tr><tr><td>Apple</td><td>3</td></tr></table>",
        );
        assert_eq!(text, "Name\tQty\nApple\t3");
    }

    #[test]
    fn test_pre_keeps_lines() {
        let text = render("<pre>fn main() {\n    run();\n}</pre>");
        assert_eq!(text, "fn main() {\nrun();\n}");
    }

    #[test]
    fn test_entities_are_decoded() {
        let text = render("<p>Fish &amp; Chips &lt;3</p>");
        assert_eq!(text, "Fish & Chips <3");
    }

    #[test]
    fn test_fragment() {
        assert_eq!(clean_text(&html_fragment_to_text("<em>hi</em> <b>there</b>")), "hi there");
    }

    #[tokio::test]
    async fn test_extract_decodes_latin1() {
        let document = SourceDocument::new(
            b"<html><body><p>Caf\xE9 cr\xE8me br\xFBl\xE9e</p></body></html>".to_vec(),
            Some("menu.html".to_string()),
        );
        let result = HtmlExtractor::new()
            .extract(&document, DocumentFormat::Html)
            .await
            .unwrap();
        assert!(!result.text.contains('\u{FFFD}'));
        assert!(result.text.contains("Caf"));
    }
}
