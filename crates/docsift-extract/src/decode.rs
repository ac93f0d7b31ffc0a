//! Charset decoding for text-like documents.

/// Decode bytes into a UTF-8 `String`.
///
/// Order: BOM sniff, strict UTF-8, then a `chardetng` guess. Any decoder
/// replacement is reported as an error rather than silently producing U+FFFD.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, String> {
    if let Some((encoding, offset)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _, had_errors) = encoding.decode(&bytes[offset..]);
        if had_errors {
            return Err(format!("invalid {} after byte order mark", encoding.name()));
        }
        return Ok(text.into_owned());
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(format!(
            "decoding with detected charset '{}' produced errors",
            encoding.name()
        ));
    }
    Ok(text.into_owned())
}

/// Heuristic for "this looks like text": no C0 control bytes other than
/// layout ones in the sampled head, and the head decodes.
#[must_use]
pub fn looks_like_text(head: &[u8]) -> bool {
    if head.iter().any(|&b| is_binary_control(b)) {
        return false;
    }
    // A multi-byte sequence may be cut at the sample boundary.
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) if e.error_len().is_none() => true,
        Err(_) => decode_to_utf8(head).is_ok(),
    }
}

/// C0 controls that do not occur in text files. Tab, line feed, form feed,
/// carriage return and escape (ANSI colour codes) are allowed.
fn is_binary_control(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        assert_eq!(decode_to_utf8("héllo wörld".as_bytes()).unwrap(), "héllo wörld");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"a,b");
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "a,b");
    }

    #[test]
    fn test_utf16le_bom() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "hi");
    }

    #[test]
    fn test_latin1_fallback() {
        // "Le café crème est brûlé" in Windows-1252
        let bytes = b"Le caf\xE9 cr\xE8me est br\xFBl\xE9";
        let text = decode_to_utf8(bytes).unwrap();
        assert!(text.starts_with("Le caf"));
        assert!(!text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_looks_like_text() {
        assert!(looks_like_text(b"name,age\nbob,4\n"));
        assert!(!looks_like_text(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(!looks_like_text(&[0u8; 16]));
    }

    #[test]
    fn test_binary_without_nul_is_not_text() {
        // High bytes decode under a single-byte charset, the controls give it away.
        let bytes = [0x8F, 0x90, 0x9D, 0x81, 0x01, 0x02, 0x03, 0xFE];
        assert!(!looks_like_text(&bytes));
    }

    #[test]
    fn test_layout_controls_are_text() {
        assert!(looks_like_text(b"col\tcol\r\nnext page\x0C\x1B[1mbold\x1B[0m\n"));
        assert!(!looks_like_text(b"almost text\x07 with a bell"));
    }

    #[test]
    fn test_looks_like_text_truncated_multibyte() {
        let text = "naïve".as_bytes();
        // cut in the middle of the two-byte 'ï'
        assert!(looks_like_text(&text[..3]));
    }
}
