//! Pipeline stages for the fill job.
//!
//! Each stage is a standalone module so it can be tested in isolation:
//!
//! - [`extract`] — native document → normalized markdown
//! - [`llm`] — prompt → completion
//! - [`postprocess`] — deterministic cleanup of the completion
//! - [`render`] — completion markdown → native document (fallback ladder)
//! - [`docx`] / [`sheet`] — the format-specific halves of both directions

pub mod docx;
pub mod extract;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod sheet;
