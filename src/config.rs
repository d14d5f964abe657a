//! Configuration for a template-fill job.
//!
//! All behaviour is controlled through [`FillConfig`], built via its
//! [`FillConfigBuilder`]. One struct holds every knob so configs can be
//! shared, logged, and diffed between runs.
//!
//! The reference-document location is an explicit configuration value, not a
//! well-known constant: the caller always names the corpus the completions
//! are drawn from.

use crate::error::DocfillError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a fill job.
///
/// Built via [`FillConfig::builder()`] or [`FillConfig::default()`].
///
/// # Example
/// ```rust
/// use docfill::FillConfig;
///
/// let config = FillConfig::builder()
///     .reference("reference.md")
///     .output_dir("out")
///     .model("gemini-2.5-pro")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FillConfig {
    /// Path to the reference document (plain text or markdown). Required;
    /// its absence is a fatal precondition checked before any extraction.
    pub reference: PathBuf,

    /// Directory the completed document is written to. Default: `.`.
    pub output_dir: PathBuf,

    /// LLM model identifier. If None, uses `gemini-2.5-pro` (or the
    /// provider default during auto-detection). Fixed per job.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `provider`, the provider is auto-detected from
    /// API-key environment variables.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    /// Useful in tests and for callers that need custom middleware.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Low temperature keeps the model close to verbatim reuse of the
    /// reference text, which the prompt contract demands.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A completed compliance template is the whole document, not a page;
    /// setting this too low truncates the output mid-section.
    pub max_tokens: usize,

    /// Retry attempts on a transient generation failure. Default: 0.
    ///
    /// The default is one attempt per job: a failed job is restarted from
    /// the top by the caller. Set above zero to opt in to exponential
    /// backoff retries inside the generation stage.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt).
    /// Default: 500. Only relevant when `max_retries > 0`.
    pub retry_backoff_ms: u64,

    /// Per-call timeout on the generation request in seconds. Default: 600.
    ///
    /// Generation is the dominant latency and can take minutes on large
    /// templates; the timeout exists so a hung transport cannot block a job
    /// forever.
    pub api_timeout_secs: u64,

    /// Custom instruction preamble. If None, uses the built-in default
    /// from [`crate::prompts`].
    pub system_prompt: Option<String>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            reference: PathBuf::from("reference.md"),
            output_dir: PathBuf::from("."),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 8192,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 600,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for FillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillConfig")
            .field("reference", &self.reference)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl FillConfig {
    /// Create a new builder for `FillConfig`.
    pub fn builder() -> FillConfigBuilder {
        FillConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`FillConfig`].
#[derive(Debug)]
pub struct FillConfigBuilder {
    config: FillConfig,
}

impl FillConfigBuilder {
    pub fn reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.reference = path.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FillConfig, DocfillError> {
        let c = &self.config;
        if c.reference.as_os_str().is_empty() {
            return Err(DocfillError::InvalidConfig(
                "Reference document path must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DocfillError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(DocfillError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
