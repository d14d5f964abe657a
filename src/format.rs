//! Input/output document formats, derived from the file extension.

use crate::error::DocfillError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The three document families the pipeline understands.
///
/// The format tag drives both directions of the round-trip: which extractor
/// turns the file into markdown, and which reverse converter turns the
/// completed markdown back into the customer's native format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Word-processing document (`.docx`).
    RichDocument,
    /// Spreadsheet workbook (`.xlsx`, `.xls`).
    Tabular,
    /// Markdown or plain text (`.md`, `.txt`); passes through unchanged.
    PlainText,
}

impl DocumentFormat {
    /// Derive the format from a path's extension.
    ///
    /// Any other extension is rejected with
    /// [`DocfillError::UnsupportedFormat`] — a terminal failure, never
    /// retried.
    pub fn from_path(path: &Path) -> Result<Self, DocfillError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "docx" => Ok(DocumentFormat::RichDocument),
            "xlsx" | "xls" => Ok(DocumentFormat::Tabular),
            "md" | "txt" => Ok(DocumentFormat::PlainText),
            _ => Err(DocfillError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }

    /// Human-readable label used in log and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentFormat::RichDocument => "DOCX",
            DocumentFormat::Tabular => "workbook",
            DocumentFormat::PlainText => "text",
        }
    }
}
