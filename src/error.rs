//! Error types for the docfill library.
//!
//! Every failure signal crosses component boundaries as a typed
//! [`DocfillError`] variant rather than a sentinel string embedded in
//! otherwise-valid output. Degraded-but-successful reverse conversion is not
//! an error at all: it is reported through [`crate::output::RenderTier`],
//! which records which rung of the fallback ladder produced the file.
//!
//! The variants fall into three groups:
//!
//! * **Fatal preconditions** — missing credential or reference corpus.
//!   Processing never starts.
//! * **Stage failures** — extraction, generation, or validation failed.
//!   The job halts at that stage; the caller restarts from the top.
//! * **I/O** — even the terminal raw-text fallback could not be written.

use crate::format::DocumentFormat;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docfill library.
#[derive(Debug, Error)]
pub enum DocfillError {
    // ── Fatal preconditions ───────────────────────────────────────────────
    /// The reference corpus file does not exist.
    #[error("Reference document not found: '{path}'\nThe reference is a required plain-text/markdown file; pass its location with --reference.")]
    ReferenceNotFound { path: PathBuf },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Template file was not found at the given path.
    #[error("Template file not found: '{path}'\nCheck the path exists and is readable.")]
    TemplateNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file extension maps to no supported format. Terminal: the job
    /// must not be retried with the same input.
    #[error("Unsupported file type '.{extension}' for '{path}'\nSupported: .docx, .xlsx, .xls, .md, .txt")]
    UnsupportedFormat { path: PathBuf, extension: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The format-specific parser failed on the input document.
    #[error("Error during {} conversion: {detail}", format.label())]
    ExtractionFailed {
        format: DocumentFormat,
        detail: String,
    },

    /// Parsing succeeded but produced no text at all.
    #[error("No text could be extracted from '{path}'")]
    EmptyExtraction { path: PathBuf },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The LLM API call failed (transport, auth, or service error).
    #[error("Error during LLM call: {message}")]
    GenerationFailed { message: String },

    /// The LLM call exceeded the configured timeout.
    #[error("LLM call timed out after {secs}s\nIncrease --api-timeout; completions for large templates can take minutes.")]
    GenerationTimeout { secs: u64 },

    /// The provider returned an empty completion (e.g. the prompt was
    /// blocked). The job halts before reverse conversion.
    #[error("LLM returned no text: {detail}")]
    EmptyCompletion { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write the output document, and the raw-text sibling
    /// fallback also failed.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
