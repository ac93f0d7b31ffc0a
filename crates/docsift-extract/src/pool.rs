//! Extraction pool for bounded concurrent extraction.

use docsift_core::{ExtractError, ExtractionResult, SourceDocument};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::registry::ExtractorRegistry;

/// Pool of extraction slots over a shared registry.
pub struct ExtractionPool {
    registry: Arc<ExtractorRegistry>,
    /// Semaphore to limit concurrent extractions
    semaphore: Semaphore,
    /// Maximum concurrent operations
    max_concurrent: usize,
    /// Deadline applied to every call, if any
    timeout: Option<Duration>,
}

impl ExtractionPool {
    /// Create a new pool. `max_concurrent` is raised to at least one.
    pub fn new(registry: Arc<ExtractorRegistry>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            registry,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            timeout: None,
        }
    }

    /// Apply `timeout` to every extraction made through this pool.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the underlying registry.
    pub fn registry(&self) -> Arc<ExtractorRegistry> {
        Arc::clone(&self.registry)
    }

    /// Extract one buffered document, waiting for a free slot.
    pub async fn extract_document(
        &self,
        document: &SourceDocument,
    ) -> Result<ExtractionResult, ExtractError> {
        match self.timeout {
            Some(timeout) => self.extract_with_timeout(document, timeout).await,
            None => {
                let _permit = self.acquire().await?;
                self.registry.extract_document(document).await
            }
        }
    }

    /// Read and extract one file, waiting for a free slot.
    pub async fn extract_path(&self, path: &Path) -> Result<ExtractionResult, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToString::to_string);
        self.extract_document(&SourceDocument::new(bytes, filename))
            .await
    }

    /// Extract with a deadline that covers both waiting for a slot and the
    /// extraction itself.
    ///
    /// On expiry the call returns [`ExtractError::Failed`]. Work already
    /// handed to blocking threads is abandoned, not interrupted.
    pub async fn extract_with_timeout(
        &self,
        document: &SourceDocument,
        timeout: Duration,
    ) -> Result<ExtractionResult, ExtractError> {
        let work = async {
            let _permit = self.acquire().await?;
            self.registry.extract_document(document).await
        };

        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Extraction of {:?} timed out after {:?}",
                    document.filename(),
                    timeout
                );
                Err(ExtractError::Failed(format!(
                    "timed out after {}s",
                    timeout.as_secs_f64()
                )))
            }
        }
    }

    /// Extract many documents concurrently. Results keep input order.
    pub async fn extract_many(
        &self,
        documents: &[SourceDocument],
    ) -> Vec<Result<ExtractionResult, ExtractError>> {
        join_all(documents.iter().map(|document| self.extract_document(document))).await
    }

    /// Get pool statistics.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, ExtractError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|e| ExtractError::Failed(format!("semaphore error: {e}")))
    }
}
