//! Configuration handling for docsift.
//!
//! The config file is TOML and every field has a default, so a missing file
//! or a partial one is fine.

use directories::ProjectDirs;
use docsift_core::Error;
use docsift_extract::{ExtractorConfig, OcrConfig, PdfConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// OCR configuration
    #[serde(default)]
    pub ocr: OcrSection,

    /// PDF configuration
    #[serde(default)]
    pub pdf: PdfSection,

    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OCR-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSection {
    /// Run OCR on images and scanned PDF pages
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tesseract executable
    #[serde(default = "default_tesseract_cmd")]
    pub tesseract_cmd: String,

    /// Tesseract language pack(s)
    #[serde(default = "default_language")]
    pub language: String,

    /// Rendering resolution for scanned pages
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_true() -> bool {
    true
}

fn default_tesseract_cmd() -> String {
    "tesseract".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            tesseract_cmd: default_tesseract_cmd(),
            language: default_language(),
            dpi: default_dpi(),
        }
    }
}

/// PDF-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfSection {
    /// Below this many text-layer characters the whole document is OCR'd
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// OCR individual pages without a text layer
    #[serde(default = "default_true")]
    pub per_page_fallback: bool,

    /// poppler page renderer
    #[serde(default = "default_pdftoppm_cmd")]
    pub pdftoppm_cmd: String,
}

fn default_min_text_chars() -> usize {
    1
}

fn default_pdftoppm_cmd() -> String {
    "pdftoppm".to_string()
}

impl Default for PdfSection {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            per_page_fallback: default_true(),
            pdftoppm_cmd: default_pdftoppm_cmd(),
        }
    }
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted input (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Max concurrent extractions
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-document deadline (seconds, 0 disables)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_file_size() -> u64 {
    52_428_800 // 50MB
}

fn default_max_concurrent() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LimitsConfig {
    /// Deadline for one document, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load from the default config path, or defaults if there is no file.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(Self::config_path())
    }

    /// Load from `path`. `None` or a missing file yields the defaults.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(path) if path.exists() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }

    fn read(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Default config file location.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// A commented config file with every default spelled out.
    pub fn sample_toml() -> &'static str {
        r#"# docsift configuration

[ocr]
# Set to false to return empty text for images and scanned pages
enabled = true
tesseract_cmd = "tesseract"
language = "eng"
dpi = 300

[pdf]
# OCR the whole document when its text layer has fewer characters
min_text_chars = 1
# OCR single pages that have no text layer
per_page_fallback = true
pdftoppm_cmd = "pdftoppm"

[limits]
max_file_size = 52428800
max_concurrent = 4
# 0 disables the deadline
timeout_secs = 120

[logging]
level = "info"
"#
    }

    /// Settings handed to the extractor registry.
    pub fn to_extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            ocr: OcrConfig {
                enabled: self.ocr.enabled,
                tesseract_cmd: self.ocr.tesseract_cmd.clone(),
                language: self.ocr.language.clone(),
                dpi: self.ocr.dpi,
            },
            pdf: PdfConfig {
                min_text_chars: self.pdf.min_text_chars,
                per_page_fallback: self.pdf.per_page_fallback,
            },
            pdftoppm_cmd: self.pdf.pdftoppm_cmd.clone(),
        }
    }
}

/// Get the XDG config directory for docsift.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("DOCSIFT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "docsift").map(|dirs| dirs.config_dir().to_path_buf())
}
