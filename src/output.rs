//! Output types: the rendered document, its fallback tier, and job stats.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which rung of the reverse-conversion fallback ladder produced the output
/// file.
///
/// A job that ends on a degraded tier still succeeds — the "no silent data
/// loss" contract means every completion ends up on disk in *some*
/// recoverable form. Callers that care about fidelity check
/// [`RenderTier::is_degraded`] instead of parsing filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTier {
    /// Full markdown-to-DOCX conversion, styled after the customer's
    /// original document where a style reference was available.
    Styled,
    /// DOCX fallback: blank-line chunks written as unstyled paragraphs.
    /// Headings and tables lose their structure.
    PlainParagraphs,
    /// Workbook produced by naively splitting pipe rows into a grid.
    /// Lossy, and still the intended tier for tabular targets.
    NaiveGrid,
    /// Workbook fallback: a label row plus the raw markdown as one blob.
    RawSheet,
    /// Markdown/plain-text target written verbatim.
    Verbatim,
    /// Terminal fallback: the reverse converter failed outright, so the
    /// markdown was written to a `*_conversion_error.txt` sibling.
    TextSibling,
}

impl RenderTier {
    /// True when the output lost structure relative to the intended tier
    /// for its format.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            RenderTier::PlainParagraphs | RenderTier::RawSheet | RenderTier::TextSibling
        )
    }
}

/// The file produced by reverse conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedDocument {
    /// Where the output landed. Usually the requested path; the
    /// `TextSibling` tier substitutes the error sibling.
    pub path: PathBuf,
    /// Fallback rung that produced the file.
    pub tier: RenderTier,
}

/// Timing and token accounting for one fill job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillStats {
    /// Time spent extracting the template into markdown.
    pub extract_duration_ms: u64,
    /// Time spent waiting on the generation call (the dominant latency).
    pub llm_duration_ms: u64,
    /// Time spent on reverse conversion.
    pub render_duration_ms: u64,
    /// Wall-clock time for the whole job.
    pub total_duration_ms: u64,
    /// Prompt tokens reported by the provider.
    pub input_tokens: u64,
    /// Completion tokens reported by the provider.
    pub output_tokens: u64,
    /// Length of the cleaned completion in characters.
    pub generated_chars: usize,
}

/// Result of a completed fill job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillOutput {
    /// The output document and the tier that produced it.
    pub document: RenderedDocument,
    /// The cleaned completion markdown, before reverse conversion.
    pub markdown: String,
    /// Timing and token stats.
    pub stats: FillStats,
}
