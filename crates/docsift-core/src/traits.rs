//! Core traits for docsift components.
//!
//! [`ContentExtractor`] is the seam between the dispatcher and the
//! format-specific extractors. Extractors receive an already buffered
//! [`SourceDocument`] and the format the dispatcher resolved for it.

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::types::{DocumentFormat, ExtractedText, SourceDocument};

/// Trait for extracting text from one family of formats.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Formats this extractor handles.
    fn formats(&self) -> &[DocumentFormat];

    /// Check if this extractor handles the given format.
    fn can_extract(&self, format: DocumentFormat) -> bool {
        self.formats().contains(&format)
    }

    /// Extract text from a buffered document.
    ///
    /// Malformed content must surface as [`ExtractError::Parse`]; anything
    /// else that goes wrong is [`ExtractError::Io`] or [`ExtractError::Failed`].
    async fn extract(
        &self,
        document: &SourceDocument,
        format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError>;
}
