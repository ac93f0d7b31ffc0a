//! Spreadsheet extractor.
//!
//! Every worksheet, in workbook order, one row per line with non-empty
//! cells joined by tabs. Chart sheets hold no cells and are skipped; any
//! other sheet that cannot be read fails the whole workbook.

use async_trait::async_trait;
use calamine::{Data, Reader, SheetType, Xlsx};
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use std::io::Cursor;
use tracing::debug;

/// Extractor for XLSX workbooks.
pub struct SpreadsheetExtractor;

impl SpreadsheetExtractor {
    /// Create a new spreadsheet extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpreadsheetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for SpreadsheetExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Xlsx]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting spreadsheet: {:?}", document.filename());

        let bytes = document.shared_bytes();
        tokio::task::spawn_blocking(move || extract_xlsx(&bytes).map(ExtractedText::native))
            .await
            .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ExtractError::parse(DocumentFormat::Xlsx, e))?;

    let sheets = workbook.sheets_metadata().to_owned();
    let mut lines = Vec::new();
    for sheet in &sheets {
        if matches!(sheet.typ, SheetType::ChartSheet) {
            debug!("Skipping chart sheet '{}'", sheet.name);
            continue;
        }
        let range = workbook.worksheet_range(&sheet.name).map_err(|e| {
            ExtractError::parse(DocumentFormat::Xlsx, format!("sheet '{}': {e}", sheet.name))
        })?;
        for row in range.rows() {
            lines.push(row_to_line(row));
        }
    }

    debug!("XLSX: {} sheets, {} rows", sheets.len(), lines.len());
    Ok(lines.join("\n"))
}

fn row_to_line(row: &[Data]) -> String {
    row.iter()
        .filter(|cell| !matches!(cell, Data::Empty))
        .map(ToString::to_string)
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("\t")
}
