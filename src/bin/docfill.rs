//! CLI binary for docfill.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FillConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docfill::{fill, FillConfig, RenderTier};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fill a customer DOCX template from ./reference.md
  docfill customer_template.docx

  # Explicit reference corpus and output directory
  docfill --reference corpus/dpia_answers.md -o out questionnaire.xlsx

  # Use a specific model
  docfill --model gemini-2.5-pro --provider gemini template.docx

  # Markdown in, markdown out
  docfill security_questionnaire.md -o completed/

  # Structured JSON result (paths, fallback tier, token counts)
  docfill --json template.docx > result.json

OUTPUT:
  The completed document is written next to the original name:
    customer_template.docx  →  <output-dir>/customer_template_completed.docx

  If the faithful reverse conversion fails, the tool degrades rather than
  losing content: plain-paragraph DOCX, raw-text sheet, and finally a
  *_conversion_error.txt sibling containing the full Markdown. Degraded
  runs are flagged in the summary and in --json output.

  Answers the reference corpus cannot support are marked
  [partial - to be completed - see clarification N] in the document, with
  a numbered clarifications list appended at the end.

SUPPORTED TEMPLATE FORMATS:
  .docx         Word documents (headings + tables preserved)
  .xlsx / .xls  Workbooks (one markdown table per sheet)
  .md / .txt    Plain text (passed through verbatim)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key (preferred provider)
  OPENAI_API_KEY        OpenAI API key
  ANTHROPIC_API_KEY     Anthropic API key
  DOCFILL_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  DOCFILL_MODEL         Override model ID

SETUP:
  1. Set API key:       export GEMINI_API_KEY=...
  2. Write reference:   curated answers in reference.md
  3. Fill:              docfill customer_template.docx -o out
"#;

/// Fill compliance templates from a reference document using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "docfill",
    version,
    about = "Fill compliance templates (DOCX/XLSX/Markdown) from a reference document using LLMs",
    long_about = "Complete customer compliance templates automatically. The template is converted \
to Markdown, an LLM fills it using only the curated reference document, and the completed \
Markdown is converted back to the template's original format. Supports Google Gemini, OpenAI, \
Anthropic, and any provider edgequake-llm knows.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Template to fill: .docx, .xlsx, .xls, .md, or .txt.
    template: PathBuf,

    /// Reference document the answers are drawn from (text or markdown).
    #[arg(
        short,
        long,
        env = "DOCFILL_REFERENCE",
        default_value = "reference.md",
        long_help = "Path to the curated reference corpus. The LLM may only use facts from \
          this document; anything it cannot answer is flagged for clarification."
    )]
    reference: PathBuf,

    /// Directory the completed document is written to.
    #[arg(short, long, env = "DOCFILL_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// LLM model ID (e.g. gemini-2.5-pro, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(
        long,
        env = "DOCFILL_MODEL",
        long_help = "Model to use. Default: gemini-2.5-pro. Long templates need a model with a \
          large output budget; the whole completed document comes back in one response."
    )]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "DOCFILL_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set \
          (GEMINI_API_KEY is preferred when present)."
    )]
    provider: Option<String>,

    /// Path to a text file containing custom fill instructions.
    #[arg(long, env = "DOCFILL_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "DOCFILL_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCFILL_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries on transient LLM failure (default: fail the job on first error).
    #[arg(long, env = "DOCFILL_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// LLM call timeout in seconds.
    #[arg(long, env = "DOCFILL_API_TIMEOUT", default_value_t = 600)]
    api_timeout: u64,

    /// Output structured JSON (FillOutput) instead of the summary.
    #[arg(long, env = "DOCFILL_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOCFILL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCFILL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCFILL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Preconditions ────────────────────────────────────────────────────
    // The reference corpus is a hard precondition: fail before any work.
    if !cli.reference.exists() {
        anyhow::bail!(
            "Reference document not found: {}\n\
             Provide it with --reference or place reference.md in the working directory.",
            cli.reference.display()
        );
    }

    let config = build_config(&cli).await?;

    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Filling");
        bar.set_message(format!(
            "{} (the LLM call can take minutes)",
            cli.template.display()
        ));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run the fill job ─────────────────────────────────────────────────
    let result = fill(&cli.template, &config).await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Fill job failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet {
        let tier = output.document.tier;
        let tick = if tier.is_degraded() {
            cyan("⚠")
        } else {
            green("✔")
        };
        eprintln!(
            "{}  {}  →  {}",
            tick,
            cli.template.display(),
            bold(&output.document.path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
        match tier {
            RenderTier::PlainParagraphs => {
                eprintln!("   {}", red("styles lost: document written as plain paragraphs"));
            }
            RenderTier::RawSheet => {
                eprintln!("   {}", red("grid lost: markdown written into a single cell"));
            }
            RenderTier::TextSibling => {
                eprintln!("   {}", red("conversion failed: content saved as plain text"));
            }
            _ => {}
        }
        if output.markdown.contains("[partial") {
            eprintln!(
                "   {}",
                cyan("some answers need clarification — see the document's final section")
            );
        }
    }

    Ok(())
}

/// Map CLI args to `FillConfig`.
async fn build_config(cli: &Cli) -> Result<FillConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = FillConfig::builder()
        .reference(&cli.reference)
        .output_dir(&cli.output_dir)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
