//! Error types for docsift.

use thiserror::Error;

/// Main error type for docsift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Content extraction errors.
///
/// Every failure falls into exactly one [`ErrorKind`]: the format is outside
/// the registry, the format library rejected the content, or something else
/// went wrong (I/O, task failures, missing OCR tooling).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed: {0}")]
    Failed(String),
}

impl ExtractError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedType(_) => ErrorKind::Unsupported,
            Self::Parse(_) => ErrorKind::Parsing,
            Self::Io(_) | Self::Failed(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a parse error tagged with the format that failed.
    pub fn parse(format: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::Parse(format!("{format}: {reason}"))
    }
}

/// The three outcomes a caller has to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Format outside the closed registry. Rejected before extraction.
    Unsupported,
    /// Format recognized, content malformed, truncated or encrypted.
    Parsing,
    /// Anything else. Details must not reach end users.
    Internal,
}

impl ErrorKind {
    /// Conventional HTTP status for this kind.
    #[must_use]
    pub fn http_status(self) -> u16 {
        match self {
            Self::Unsupported => 415,
            Self::Parsing => 422,
            Self::Internal => 500,
        }
    }

    /// Message safe to show to whoever uploaded the document.
    #[must_use]
    pub fn public_message(self) -> &'static str {
        match self {
            Self::Unsupported => "Unsupported file type",
            Self::Parsing => "Document could not be parsed",
            Self::Internal => "Internal server error",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsupported => "unsupported",
            Self::Parsing => "parsing",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for docsift operations.
pub type Result<T> = std::result::Result<T, Error>;
