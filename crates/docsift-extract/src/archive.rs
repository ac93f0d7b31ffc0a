//! ZIP package access shared by the OOXML, OpenDocument and EPUB extractors.

use docsift_core::{DocumentFormat, ExtractError};
use quick_xml::events::BytesStart;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Upper bound on a single XML part. Larger parts are treated as malformed.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

pub type Package<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Open `bytes` as a ZIP package of `format`.
pub fn open(bytes: &[u8], format: DocumentFormat) -> Result<Package<'_>, ExtractError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::parse(format, e))
}

/// Read one entry, bounded by [`MAX_ENTRY_BYTES`].
pub fn read_entry(
    package: &mut Package<'_>,
    name: &str,
    format: DocumentFormat,
) -> Result<Vec<u8>, ExtractError> {
    let entry = package
        .by_name(name)
        .map_err(|e| ExtractError::parse(format, format!("{name}: {e}")))?;

    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::parse(format, format!("{name}: {e}")))?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(ExtractError::parse(
            format,
            format!("{name} exceeds size limit ({MAX_ENTRY_BYTES} bytes)"),
        ));
    }
    Ok(out)
}

/// Names of all entries.
pub fn entry_names(package: &Package<'_>) -> Vec<String> {
    package.file_names().map(str::to_string).collect()
}

pub fn has_entry(package: &Package<'_>, name: &str) -> bool {
    package.file_names().any(|entry| entry == name)
}

/// Resolve a relative reference against the directory `base` of the part
/// that contains it. A leading `/` makes `href` package-absolute.
pub fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = percent_decode(href);

    let mut segments: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Unescaped value of the attribute with local name `key`.
///
/// With `prefixed`, only a namespace-qualified attribute matches, so
/// `r:id` and a plain `id` on the same element can be told apart.
pub fn attribute(element: &BytesStart<'_>, key: &[u8], prefixed: bool) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| {
            attr.key.local_name().as_ref() == key && attr.key.prefix().is_some() == prefixed
        })
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build an in-memory ZIP from `(name, body)` pairs.
    pub(crate) fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS", "Text/ch1.xhtml"), "OEBPS/Text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/Text", "../Styles/a.css"), "OEBPS/Styles/a.css");
        assert_eq!(resolve_path("", "ch1.xhtml#start"), "ch1.xhtml");
        assert_eq!(resolve_path("ppt", "/ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("chapter%202.xhtml"), "chapter 2.xhtml");
        assert_eq!(percent_decode("100%"), "100%");
    }

    #[test]
    fn test_attribute_prefix() {
        let mut reader = quick_xml::Reader::from_str(r#"<p:sldId id="256" r:id="rId7"/>"#);
        let quick_xml::events::Event::Empty(element) = reader.read_event().unwrap() else {
            panic!("expected an empty element");
        };
        assert_eq!(attribute(&element, b"id", false).as_deref(), Some("256"));
        assert_eq!(attribute(&element, b"id", true).as_deref(), Some("rId7"));
        assert_eq!(attribute(&element, b"missing", false), None);
    }

    #[test]
    fn test_read_entry() {
        let bytes = zip_with(&[("a.xml", "<a/>")]);
        let mut package = open(&bytes, DocumentFormat::Docx).unwrap();
        assert_eq!(read_entry(&mut package, "a.xml", DocumentFormat::Docx).unwrap(), b"<a/>");
    }

    #[test]
    fn test_missing_entry_is_parse_error() {
        let bytes = zip_with(&[("a.xml", "<a/>")]);
        let mut package = open(&bytes, DocumentFormat::Docx).unwrap();
        let err = read_entry(&mut package, "word/document.xml", DocumentFormat::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = open(b"PK\x03\x04 truncated", DocumentFormat::Xlsx).unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn test_entry_names_in_order() {
        let bytes = zip_with(&[("b", ""), ("a", "")]);
        let package = open(&bytes, DocumentFormat::Epub).unwrap();
        let mut names = entry_names(&package);
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
