//! # docfill
//!
//! Fill customer compliance templates from a reference document using LLMs.
//!
//! ## Why this crate?
//!
//! Compliance teams answer the same questionnaire over and over: every
//! customer sends a DPIA, vendor-assessment, or security template in their
//! own `.docx` or `.xlsx` house format, and someone copies answers into it
//! by hand. This crate automates the copy: it converts the customer's
//! template to Markdown, asks an LLM to complete it using only a curated
//! reference document, and converts the completed Markdown back into the
//! customer's original file format.
//!
//! ## Pipeline Overview
//!
//! ```text
//! template.docx / .xlsx / .md
//!  │
//!  ├─ 1. Extract   native document → normalized Markdown
//!  ├─ 2. Prompt    reference text + template Markdown → tagged prompt
//!  ├─ 3. Generate  one LLM call (gemini / openai / anthropic / …)
//!  ├─ 4. Polish    fence stripping, table repair, whitespace cleanup
//!  └─ 5. Render    Markdown → native format, with fallback ladder
//! ```
//!
//! Answers the reference cannot support are marked
//! `[partial - to be completed - see clarification N]` and listed in a
//! clarifications section at the end of the completed document, so a
//! human reviewer sees exactly what still needs attention.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docfill::{fill, FillConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = FillConfig::builder()
//!         .reference("reference.md")
//!         .output_dir("out")
//!         .build()?;
//!     let output = fill("customer_template.docx", &config).await?;
//!     println!("wrote {}", output.document.path.display());
//!     if output.document.tier.is_degraded() {
//!         eprintln!("degraded conversion: {:?}", output.document.tier);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docfill` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docfill = { version = "0.1", default-features = false }
//! ```
//!
//! ## Supported Formats
//!
//! | Extension | Reading | Writing |
//! |-----------|---------|---------|
//! | `.docx` | zip + quick-xml walk of `word/document.xml` | docx-rs, styles spliced from the original template |
//! | `.xlsx` / `.xls` | calamine | rust_xlsxwriter (one table per sheet) |
//! | `.md` / `.txt` | verbatim | verbatim |
//!
//! Reverse conversion never loses content: if the faithful conversion
//! fails the renderer degrades tier by tier, ending at worst with the
//! full Markdown in a `*_conversion_error.txt` sibling file.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod fill;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FillConfig, FillConfigBuilder};
pub use error::DocfillError;
pub use fill::{fill, fill_sync, DEFAULT_MODEL};
pub use format::DocumentFormat;
pub use output::{FillOutput, FillStats, RenderTier, RenderedDocument};
pub use prompts::{build_fill_prompt, DEFAULT_INSTRUCTIONS};
