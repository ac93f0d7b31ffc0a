//! Text cleanup applied to every extractor's output.

/// Collapse blank-line runs, trim each line, and trim the whole text.
///
/// Carriage returns and form feeds are treated as line breaks so CRLF input
/// and PDF page breaks normalize the same way.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.split(['\n', '\r', '\x0C']) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}
