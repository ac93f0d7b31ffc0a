//! Optical character recognition and PDF page rasterization.
//!
//! Both are traits so the PDF and image extractors can be driven by the
//! command-line tools in production ([`TesseractOcr`], [`PdftoppmRasterizer`])
//! and by counting fakes in tests. Calls are synchronous; extractors invoke
//! them from `spawn_blocking`.

use docsift_core::ExtractError;
use std::io::Write;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

/// Error type for OCR and rasterization.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine or tool is not installed or cannot be started.
    #[error("ocr engine unavailable: {0}")]
    Unavailable(String),

    /// The engine ran but rejected the input.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OcrError> for ExtractError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::Unavailable(msg) => ExtractError::Failed(format!("ocr unavailable: {msg}")),
            OcrError::Recognition(msg) => ExtractError::parse("OCR", msg),
            OcrError::Io(e) => ExtractError::Io(e),
        }
    }
}

/// Recognizes text in a single image.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image (PNG, JPEG, TIFF, ...).
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    /// Engine name for logs.
    fn name(&self) -> &str;
}

/// Renders one PDF page to an encoded PNG.
pub trait PageRasterizer: Send + Sync {
    /// Render page `page_number` (1-based) at `dpi`.
    fn rasterize(&self, pdf: &[u8], page_number: u32, dpi: u32) -> Result<Vec<u8>, OcrError>;
}

/// OCR settings.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// When off, images and scanned pages extract as empty text.
    pub enabled: bool,
    /// Tesseract executable.
    pub tesseract_cmd: String,
    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`.
    pub language: String,
    /// Resolution PDF pages are rendered at before recognition.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

// ============================================================================
// Tesseract
// ============================================================================

/// OCR through the `tesseract` command-line tool.
pub struct TesseractOcr {
    command: String,
    language: String,
    dpi: u32,
}

impl TesseractOcr {
    #[must_use]
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
            dpi: config.dpi,
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new(&OcrConfig::default())
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut input = tempfile::Builder::new()
            .prefix("docsift-ocr-")
            .tempfile()?;
        input.write_all(image)?;
        input.flush()?;

        let output = Command::new(&self.command)
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--dpi", &self.dpi.to_string()])
            .output();
        let output = check_output(&self.command, output)?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract recognized {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

// ============================================================================
// pdftoppm
// ============================================================================

/// Page rendering through poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    command: String,
}

impl PdftoppmRasterizer {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &[u8], page_number: u32, dpi: u32) -> Result<Vec<u8>, OcrError> {
        let dir = tempfile::Builder::new()
            .prefix("docsift-raster-")
            .tempdir()?;
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, pdf)?;
        let prefix = dir.path().join("page");

        let page = page_number.to_string();
        let output = Command::new(&self.command)
            .args(["-f", &page, "-l", &page])
            .args(["-r", &dpi.to_string()])
            .args(["-png", "-singlefile"])
            .arg(&input)
            .arg(&prefix)
            .output();
        check_output(&self.command, output)?;

        let png = std::fs::read(prefix.with_extension("png"))?;
        debug!("Rendered page {} at {} dpi ({} bytes)", page_number, dpi, png.len());
        Ok(png)
    }
}

/// Map a spawned command's result onto [`OcrError`].
fn check_output(command: &str, output: std::io::Result<Output>) -> Result<Output, OcrError> {
    let output = output.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            OcrError::Unavailable(format!("'{command}' is not installed"))
        }
        _ => OcrError::Io(e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(OcrError::Recognition(format!(
            "'{command}' exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

// ============================================================================
// Disabled
// ============================================================================

/// OCR engine that recognizes nothing.
///
/// Used when OCR is switched off: scanned pages and images then extract as
/// empty text instead of failing.
pub struct NoopOcr;

impl OcrEngine for NoopOcr {
    fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ocr_config_default() {
        let config = OcrConfig::default();
        assert!(config.enabled);
        assert_eq!(config.tesseract_cmd, "tesseract");
        assert_eq!(config.language, "eng");
        assert_eq!(config.dpi, 300);
    }

    #[test]
    fn test_missing_tesseract_is_unavailable() {
        let engine = TesseractOcr::new(&OcrConfig {
            tesseract_cmd: "docsift-no-such-tesseract".to_string(),
            ..Default::default()
        });
        let err = engine.recognize(b"not really a png").unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_missing_pdftoppm_is_unavailable() {
        let rasterizer = PdftoppmRasterizer::new("docsift-no-such-pdftoppm");
        let err = rasterizer.rasterize(b"%PDF-1.4", 1, 150).unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
    }

    #[test]
    fn test_error_conversion() {
        let err: ExtractError = OcrError::Unavailable("gone".into()).into();
        assert_eq!(err.kind(), docsift_core::ErrorKind::Internal);

        let err: ExtractError = OcrError::Recognition("bad image".into()).into();
        assert_eq!(err.kind(), docsift_core::ErrorKind::Parsing);
    }

    #[test]
    fn test_noop_recognizes_nothing() {
        assert_eq!(NoopOcr.recognize(b"anything").unwrap(), "");
        assert_eq!(NoopOcr.name(), "disabled");
    }

    #[test]
    fn test_error_display() {
        let err = OcrError::Unavailable("tesseract".to_string());
        assert!(err.to_string().contains("unavailable"));
    }
}
