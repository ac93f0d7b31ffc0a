//! Content-based format detection.
//!
//! The detector looks at bytes first and only consults the filename when the
//! content is plain text with no signature of its own (CSV, Markdown). It
//! never rejects anything: an unknown blob comes back as
//! `application/octet-stream` and the registry decides what to do with it.

use docsift_core::{ExtractError, SourceDocument};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::decode::looks_like_text;

/// MIME type for content nothing recognized.
pub const OCTET_STREAM: &str = "application/octet-stream";
/// MIME type for a ZIP archive that is not a known container format.
pub const ZIP: &str = "application/zip";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
/// How much of the head is inspected for text heuristics.
const TEXT_SNIFF_LEN: usize = 8 * 1024;
/// Upper bound on the `mimetype` entry of ODF/EPUB containers.
const MIMETYPE_ENTRY_MAX: u64 = 256;
/// Types whose signature is three bytes or fewer of printable ASCII, which
/// ordinary text can start with ("BMI,weight", "MZ", "BZh").
const WEAK_MAGIC: &[&str] = &[
    "image/bmp",
    "application/vnd.microsoft.portable-executable",
    "application/x-msdownload",
    "application/x-bzip2",
    "application/x-shockwave-flash",
    "application/x-compress",
    "audio/mpeg",
];

/// Detect the MIME type of a buffered document.
pub fn detect(document: &SourceDocument) -> Result<String, ExtractError> {
    detect_bytes(document.bytes(), document.filename())
}

/// Detect the MIME type of raw bytes, using `filename` only as a tie-breaker.
pub fn detect_bytes(bytes: &[u8], filename: Option<&str>) -> Result<String, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "document is empty",
        )));
    }

    let extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    if bytes.starts_with(ZIP_MAGIC) {
        let mime = sniff_zip(bytes);
        debug!("Detected ZIP container as {}", mime);
        return Ok(mime);
    }

    let head = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    let is_text = looks_like_text(head);

    if let Some(kind) = infer::get(bytes) {
        let mime = kind.mime_type();
        // A short signature only counts when the rest of the head is not text.
        if !mime.starts_with("text/") && !(is_text && WEAK_MAGIC.contains(&mime)) {
            debug!("Detected {} from magic bytes", mime);
            return Ok(mime.to_string());
        }
    }

    if is_text {
        let mime = sniff_text(head, extension.as_deref());
        debug!("Detected text content as {}", mime);
        return Ok(mime.to_string());
    }

    Ok(OCTET_STREAM.to_string())
}

/// Classify a ZIP archive by its entries.
fn sniff_zip(bytes: &[u8]) -> String {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return ZIP.to_string();
    };

    // ODF and EPUB declare themselves in a stored `mimetype` entry.
    if let Ok(entry) = archive.by_name("mimetype") {
        let mut declared = String::new();
        if entry
            .take(MIMETYPE_ENTRY_MAX)
            .read_to_string(&mut declared)
            .is_ok()
        {
            let declared = declared.trim();
            if !declared.is_empty() {
                return declared.to_string();
            }
        }
    }

    let has = |name: &str| archive.file_names().any(|entry| entry == name);
    if has("word/document.xml") {
        docsift_core::DocumentFormat::Docx.mime_type().to_string()
    } else if has("xl/workbook.xml") {
        docsift_core::DocumentFormat::Xlsx.mime_type().to_string()
    } else if has("ppt/presentation.xml") {
        docsift_core::DocumentFormat::Pptx.mime_type().to_string()
    } else if has("META-INF/container.xml") {
        docsift_core::DocumentFormat::Epub.mime_type().to_string()
    } else {
        ZIP.to_string()
    }
}

/// Classify text content. Signatures win; the extension breaks ties.
fn sniff_text(head: &[u8], extension: Option<&str>) -> &'static str {
    let sample = String::from_utf8_lossy(&head[..head.len().min(1024)]);
    let sample = sample.trim_start_matches('\u{FEFF}').trim_start();
    let lower = sample.to_ascii_lowercase();

    if lower.starts_with("{\\rtf") {
        return "application/rtf";
    }
    if lower.starts_with("<!doctype html")
        || lower.starts_with("<html")
        || (lower.starts_with("<?xml") && lower.contains("<html"))
    {
        return "text/html";
    }

    match extension {
        Some("csv") => "text/csv",
        Some("md" | "markdown") => "text/markdown",
        Some("html" | "htm" | "xhtml") => "text/html",
        Some("rtf") => "application/rtf",
        _ => "text/plain",
    }
}
