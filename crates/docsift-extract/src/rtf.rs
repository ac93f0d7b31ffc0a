//! RTF content extractor.
//!
//! A small group-aware tokenizer: control words for paragraph, tab and
//! special characters become text, `\'hh` escapes and `\uN` code points are
//! decoded, and destinations that are not body text (font tables, pictures,
//! document info, starred groups) are skipped.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::debug;

/// Destinations whose content is never body text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "author", "blipuid", "bkmkend", "bkmkstart", "buptim", "colorschememapping", "colortbl",
    "comment", "company", "creatim", "datastore", "doccomm", "filetbl", "fldinst", "fonttbl",
    "footer", "footerf", "footerl", "footerr", "footnote", "generator", "header", "headerf",
    "headerl", "headerr", "info", "keywords", "latentstyles", "listoverridetable", "listtable",
    "mmathPr", "nonshppict", "object", "operator", "pgdsctbl", "pict", "printim", "revtbl",
    "revtim", "rsidtbl", "shppict", "stylesheet", "subject", "themedata", "title", "xmlnstbl",
];

/// Extractor for Rich Text Format documents.
pub struct RtfExtractor;

impl RtfExtractor {
    /// Create a new RTF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for RtfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for RtfExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Rtf]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting RTF: {:?}", document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || rtf_to_text(&bytes).map(ExtractedText::native))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

/// Convert an RTF document to plain text.
pub fn rtf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let input = &bytes[start..];
    if !input.starts_with(b"{\\rtf") {
        return Err(ExtractError::parse("RTF", "missing {\\rtf header"));
    }

    let mut parser = RtfParser::new();
    parser.run(input);
    Ok(parser.finish())
}

#[derive(Debug, Clone, Copy)]
struct Group {
    skip: bool,
    /// Fallback characters following each `\uN`.
    uc: usize,
}

struct RtfParser {
    out: String,
    /// Undecoded `\'hh` bytes; flushed together so multi-byte code pages work.
    pending: Vec<u8>,
    encoding: &'static Encoding,
    stack: Vec<Group>,
    current: Group,
    skip_chars: usize,
}

impl RtfParser {
    fn new() -> Self {
        Self {
            out: String::new(),
            pending: Vec::new(),
            encoding: WINDOWS_1252,
            stack: Vec::new(),
            current: Group { skip: false, uc: 1 },
            skip_chars: 0,
        }
    }

    fn run(&mut self, input: &[u8]) {
        let mut i = 0;
        while i < input.len() {
            match input[i] {
                b'{' => {
                    self.stack.push(self.current);
                    self.skip_chars = 0;
                    i += 1;
                }
                b'}' => {
                    self.flush_bytes();
                    if let Some(group) = self.stack.pop() {
                        self.current = group;
                    }
                    self.skip_chars = 0;
                    i += 1;
                }
                b'\\' => i = self.control(input, i + 1),
                b'\r' | b'\n' => i += 1,
                b if b.is_ascii() => {
                    self.emit_char(b as char);
                    i += 1;
                }
                b => {
                    self.emit_byte(b);
                    i += 1;
                }
            }
        }
    }

    fn finish(mut self) -> String {
        self.flush_bytes();
        self.out
    }

    /// Handle what follows a backslash. Returns the index after it.
    fn control(&mut self, input: &[u8], mut i: usize) -> usize {
        let Some(&first) = input.get(i) else {
            return i;
        };

        if !first.is_ascii_alphabetic() {
            i += 1;
            match first {
                b'\'' => {
                    if let Some(byte) = input.get(i..i + 2).and_then(parse_hex) {
                        self.emit_byte(byte);
                        i += 2;
                    }
                }
                b'\\' | b'{' | b'}' => self.emit_char(first as char),
                b'~' => self.emit_char(' '),
                b'_' => self.emit_char('-'),
                b'*' => self.current.skip = true,
                b'\n' | b'\r' => self.emit_break('\n'),
                _ => {}
            }
            return i;
        }

        let word_start = i;
        while input.get(i).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
        }
        let word = std::str::from_utf8(&input[word_start..i]).unwrap_or_default();

        let negative = input.get(i) == Some(&b'-');
        if negative {
            i += 1;
        }
        let digits_start = i;
        while input.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        let param = std::str::from_utf8(&input[digits_start..i])
            .ok()
            .and_then(|digits| digits.parse::<i32>().ok())
            .map(|n| if negative { -n } else { n });

        // a single space delimits the control word and is not text
        if input.get(i) == Some(&b' ') {
            i += 1;
        }

        self.word(word, param);
        i
    }

    fn word(&mut self, word: &str, param: Option<i32>) {
        match word {
            "par" | "line" | "sect" | "page" | "row" => self.emit_break('\n'),
            "tab" | "cell" => self.emit_break('\t'),
            "emdash" => self.emit_char('\u{2014}'),
            "endash" => self.emit_char('\u{2013}'),
            "bullet" => self.emit_char('\u{2022}'),
            "lquote" => self.emit_char('\u{2018}'),
            "rquote" => self.emit_char('\u{2019}'),
            "ldblquote" => self.emit_char('\u{201C}'),
            "rdblquote" => self.emit_char('\u{201D}'),
            "emspace" | "enspace" | "qmspace" => self.emit_char(' '),
            "u" => {
                if let Some(n) = param {
                    let code = if n < 0 { n + 65_536 } else { n };
                    let c = u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or('\u{FFFD}');
                    self.emit_char(c);
                    self.skip_chars = self.current.uc;
                }
            }
            "uc" => self.current.uc = param.map_or(1, |n| usize::try_from(n).unwrap_or(0)),
            "ansicpg" => {
                if let Some(n) = param {
                    self.encoding = codepage_encoding(n);
                }
            }
            w if SKIPPED_DESTINATIONS.contains(&w) => self.current.skip = true,
            _ => {}
        }
    }

    fn emit_char(&mut self, c: char) {
        if self.current.skip {
            return;
        }
        if self.skip_chars > 0 {
            self.skip_chars -= 1;
            return;
        }
        self.flush_bytes();
        self.out.push(c);
    }

    fn emit_byte(&mut self, byte: u8) {
        if self.current.skip {
            return;
        }
        if self.skip_chars > 0 {
            self.skip_chars -= 1;
            return;
        }
        self.pending.push(byte);
    }

    fn emit_break(&mut self, c: char) {
        if self.current.skip {
            return;
        }
        self.skip_chars = 0;
        self.flush_bytes();
        self.out.push(c);
    }

    fn flush_bytes(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let (text, _) = self.encoding.decode_without_bom_handling(&self.pending);
        self.out.push_str(&text);
        self.pending.clear();
    }
}

fn parse_hex(pair: &[u8]) -> Option<u8> {
    let digits = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(digits, 16).ok()
}

/// Encoding for an `\ansicpgN` code page, falling back to Windows-1252.
fn codepage_encoding(codepage: i32) -> &'static Encoding {
    let label = match codepage {
        932 => "shift_jis".to_string(),
        936 => "gbk".to_string(),
        949 => "euc-kr".to_string(),
        950 => "big5".to_string(),
        n => format!("windows-{n}"),
    };
    Encoding::for_label(label.as_bytes()).unwrap_or(WINDOWS_1252)
}
