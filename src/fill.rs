//! The fill job orchestrator.
//!
//! One job is strictly linear: resolve provider → load reference → extract
//! template → build prompt → generate → postprocess → reverse-convert. Each
//! stage's output is validated before the next runs and the job halts on the
//! first failure; there are no partial retries across stages — a failed job
//! restarts from the top.

use crate::config::FillConfig;
use crate::error::DocfillError;
use crate::format::DocumentFormat;
use crate::output::{FillOutput, FillStats};
use crate::pipeline::{extract, llm, postprocess, render};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Model used when the caller names none.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Fill the template at `template_path` from the configured reference
/// document and write the completed file next to `config.output_dir`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Fatal preconditions (missing credential, missing reference) and stage
/// failures return `Err(DocfillError)`. A degraded reverse conversion is
/// still `Ok` — check [`crate::output::RenderTier::is_degraded`] on the
/// result.
pub async fn fill(
    template_path: impl AsRef<Path>,
    config: &FillConfig,
) -> Result<FillOutput, DocfillError> {
    let total_start = Instant::now();
    let template_path = template_path.as_ref();
    info!("Starting fill job: {}", template_path.display());

    // Credential precondition comes first: nothing is extracted when no
    // provider can be configured.
    let provider = resolve_provider(config)?;

    let reference_text = read_reference(&config.reference)?;
    debug!(
        "Reference loaded: {} ({} chars)",
        config.reference.display(),
        reference_text.len()
    );

    if !template_path.exists() {
        return Err(DocfillError::TemplateNotFound {
            path: template_path.to_path_buf(),
        });
    }
    let format = DocumentFormat::from_path(template_path)?;
    info!("Template format: {}", format.label());

    let extract_start = Instant::now();
    let template_markdown = extract::extract(template_path, format)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Template extracted: {} chars in {}ms",
        template_markdown.len(),
        extract_duration_ms
    );

    let instructions = config
        .system_prompt
        .as_deref()
        .unwrap_or(prompts::DEFAULT_INSTRUCTIONS);
    let prompt = prompts::build_fill_prompt(instructions, &reference_text, &template_markdown);
    debug!("Prompt assembled: {} chars", prompt.len());

    info!("Calling the generation service; this can take minutes");
    let completion = llm::complete(&provider, &prompt, config).await?;
    info!(
        "Completion received: {} chars in {}ms",
        completion.content.len(),
        completion.duration_ms
    );

    let markdown = postprocess::clean_markdown(&completion.content);

    let output_path = output_path_for(template_path, &config.output_dir);
    let style_reference =
        (format == DocumentFormat::RichDocument).then_some(template_path);

    let render_start = Instant::now();
    let document = render::render(&markdown, format, &output_path, style_reference)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let stats = FillStats {
        extract_duration_ms,
        llm_duration_ms: completion.duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        generated_chars: markdown.len(),
    };

    info!(
        "Fill complete: {} ({:?}) in {}ms",
        document.path.display(),
        document.tier,
        stats.total_duration_ms
    );

    Ok(FillOutput {
        document,
        markdown,
        stats,
    })
}

/// Synchronous wrapper around [`fill`].
///
/// Creates a temporary tokio runtime internally.
pub fn fill_sync(
    template_path: impl AsRef<Path>,
    config: &FillConfig,
) -> Result<FillOutput, DocfillError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocfillError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(fill(template_path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Output file path: `<original-base>_completed<ext>` inside `output_dir`.
fn output_path_for(template_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = template_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");
    let extension = template_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("txt");
    output_dir.join(format!("{stem}_completed.{extension}"))
}

/// Load the reference corpus; its absence is fatal before any job work.
fn read_reference(path: &Path) -> Result<String, DocfillError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DocfillError::ReferenceNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => DocfillError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocfillError::Internal(format!("reading reference: {e}")),
    })?;
    if text.trim().is_empty() {
        return Err(DocfillError::EmptyExtraction {
            path: path.to_path_buf(),
        });
    }
    Ok(text)
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, DocfillError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DocfillError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is; the test and
///    middleware seam.
/// 2. **Named provider + model** (`config.provider_name`) — the factory
///    reads the matching API key from the environment.
/// 3. **Environment pair** (`DOCFILL_LLM_PROVIDER` + `DOCFILL_MODEL`) — a
///    deployment-level choice honoured before auto-detection.
/// 4. **Gemini preference** — a set `GEMINI_API_KEY` picks Gemini, the
///    service this pipeline was built against.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`) — first
///    available provider from any known API-key variable.
fn resolve_provider(config: &FillConfig) -> Result<Arc<dyn LLMProvider>, DocfillError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(provider), Ok(model)) = (
        std::env::var("DOCFILL_LLM_PROVIDER"),
        std::env::var("DOCFILL_MODEL"),
    ) {
        if !provider.is_empty() && !model.is_empty() {
            return create_provider(&provider, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return create_provider("gemini", model);
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| DocfillError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from the environment.\n\
                 Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                 Error: {e}"
            ),
        })?;
    Ok(provider)
}
