//! Extraction dispatch: native document to normalized markdown.

use crate::error::DocfillError;
use crate::format::DocumentFormat;
use crate::pipeline::{docx, sheet};
use std::path::Path;
use tracing::debug;

/// Convert the document at `path` into normalized markdown.
///
/// Dispatches on the already-detected format; an extraction that produces
/// no text at all is an [`DocfillError::EmptyExtraction`] — terminal for the
/// job, never retried.
pub fn extract(path: &Path, format: DocumentFormat) -> Result<String, DocfillError> {
    debug!("Extracting {} as {}", path.display(), format.label());
    let markdown = match format {
        DocumentFormat::RichDocument => docx::extract_docx(path)?,
        DocumentFormat::Tabular => sheet::extract_workbook(path)?,
        DocumentFormat::PlainText => read_text(path)?,
    };

    if markdown.trim().is_empty() {
        return Err(DocfillError::EmptyExtraction {
            path: path.to_path_buf(),
        });
    }
    Ok(markdown)
}

/// Markdown and plain text pass through unchanged.
fn read_text(path: &Path) -> Result<String, DocfillError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DocfillError::TemplateNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => DocfillError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocfillError::ExtractionFailed {
            format: DocumentFormat::PlainText,
            detail: e.to_string(),
        },
    })
}
