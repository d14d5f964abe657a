//! Reverse conversion dispatch with the layered fallback ladder.
//!
//! Per format, the intended tier is tried first and any failure degrades one
//! rung instead of propagating. The terminal rung writes the completion to a
//! `*_conversion_error.txt` sibling so no content is ever silently lost; only
//! when even that write fails does an error reach the caller.

use crate::error::DocfillError;
use crate::format::DocumentFormat;
use crate::output::{RenderTier, RenderedDocument};
use crate::pipeline::{docx, sheet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Render the completion markdown back into the target format at
/// `output_path`.
///
/// Always produces a file. The returned [`RenderedDocument`] names the path
/// that was actually written (the requested one, or the error sibling) and
/// the fallback tier that produced it.
pub fn render(
    markdown: &str,
    format: DocumentFormat,
    output_path: &Path,
    style_reference: Option<&Path>,
) -> Result<RenderedDocument, DocfillError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            // Failure surfaces through the tier attempts below.
            std::fs::create_dir_all(parent).ok();
        }
    }

    let attempt = match format {
        DocumentFormat::RichDocument => render_rich(markdown, output_path, style_reference),
        DocumentFormat::Tabular => render_tabular(markdown, output_path),
        DocumentFormat::PlainText => render_text(markdown, output_path),
    };

    match attempt {
        Ok(tier) => {
            info!("Rendered {} ({:?})", output_path.display(), tier);
            Ok(RenderedDocument {
                path: output_path.to_path_buf(),
                tier,
            })
        }
        Err(e) => {
            warn!("Reverse conversion failed for {}: {e}", output_path.display());
            let sibling = error_sibling(output_path);
            std::fs::write(&sibling, markdown).map_err(|source| {
                DocfillError::OutputWriteFailed {
                    path: sibling.clone(),
                    source,
                }
            })?;
            warn!("Content preserved in {}", sibling.display());
            Ok(RenderedDocument {
                path: sibling,
                tier: RenderTier::TextSibling,
            })
        }
    }
}

/// Sibling path the terminal fallback writes to.
pub(crate) fn error_sibling(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output_path.with_file_name(format!("{stem}_conversion_error.txt"))
}

fn render_rich(
    markdown: &str,
    output_path: &Path,
    style_reference: Option<&Path>,
) -> Result<RenderTier, DocfillError> {
    match docx::render_docx(markdown, output_path, style_reference) {
        Ok(()) => Ok(RenderTier::Styled),
        Err(e) => {
            warn!("Faithful DOCX conversion failed, writing plain paragraphs: {e}");
            docx::render_docx_plain(markdown, output_path)?;
            Ok(RenderTier::PlainParagraphs)
        }
    }
}

fn render_tabular(markdown: &str, output_path: &Path) -> Result<RenderTier, DocfillError> {
    match sheet::render_sheet(markdown, output_path) {
        Ok(()) => Ok(RenderTier::NaiveGrid),
        Err(e) => {
            warn!("Naive grid conversion failed, writing raw sheet: {e}");
            sheet::render_sheet_raw(markdown, output_path)?;
            Ok(RenderTier::RawSheet)
        }
    }
}

fn render_text(markdown: &str, output_path: &Path) -> Result<RenderTier, DocfillError> {
    std::fs::write(output_path, markdown).map_err(|source| DocfillError::OutputWriteFailed {
        path: output_path.to_path_buf(),
        source,
    })?;
    Ok(RenderTier::Verbatim)
}
