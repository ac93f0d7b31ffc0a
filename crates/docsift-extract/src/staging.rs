//! Staging of uploaded bytes in a scoped temporary file.
//!
//! Upload handlers receive a body and a client filename. The body is written
//! to a named temp file that keeps the client's extension (the extension is
//! the detector's tie-breaker for text formats), extracted from disk, and
//! the file is removed when the [`StagedDocument`] is dropped, on success
//! and error alike.

use docsift_core::{ExtractError, ExtractionResult};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::registry::ExtractorRegistry;

/// An upload written to a temporary file that is deleted on drop.
pub struct StagedDocument {
    file: NamedTempFile,
}

impl StagedDocument {
    /// Write `bytes` to a fresh temp file named after `filename`'s extension.
    pub fn stage(bytes: &[u8], filename: Option<&str>) -> Result<Self, ExtractError> {
        let suffix = filename
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("docsift-upload-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        debug!("Staged {} bytes at {:?}", bytes.len(), file.path());
        Ok(Self { file })
    }

    /// Path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Stage an upload, extract it, and release the staged file.
pub async fn extract_upload(
    registry: &ExtractorRegistry,
    bytes: &[u8],
    filename: Option<&str>,
) -> Result<ExtractionResult, ExtractError> {
    let staged = StagedDocument::stage(bytes, filename)?;
    let result = registry.extract(staged.path()).await;
    drop(staged);
    result
}
