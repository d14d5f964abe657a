//! The generation call: submit the assembled prompt, get the completion.
//!
//! Intentionally thin — all prompt engineering lives in [`crate::prompts`].
//! One job makes one call by default; `max_retries` opts in to exponential
//! backoff for transient API failures, and every call is bounded by the
//! configured timeout so a hung transport cannot block a job forever.
//!
//! The retry/validation loop is split off from the provider call: [`complete`]
//! wraps the `edgequake-llm` chat call into a closure and hands it to
//! [`complete_with`], which owns the timeout, the backoff schedule, and the
//! empty-completion check. The loop's rules are tested there without a
//! provider.

use crate::config::FillConfig;
use crate::error::DocfillError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A completion returned by the provider, with token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// One provider reply, before validation.
#[derive(Debug, Clone)]
pub(crate) struct ProviderReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Submit the prompt and return the completion.
///
/// Errors:
/// - [`DocfillError::EmptyCompletion`] — the provider answered with no text
///   (e.g. the prompt was blocked). The caller must halt before rendering.
/// - [`DocfillError::GenerationTimeout`] / [`DocfillError::GenerationFailed`]
///   — transport, auth, or service failure after all attempts.
pub async fn complete(
    provider: &Arc<dyn LLMProvider>,
    prompt: &str,
    config: &FillConfig,
) -> Result<Completion, DocfillError> {
    let messages = vec![ChatMessage::user(prompt)];
    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    complete_with(config, || async {
        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| DocfillError::GenerationFailed {
                message: e.to_string(),
            })?;
        Ok(ProviderReply {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    })
    .await
}

/// Drive `call` under the configured timeout and retry policy, then validate
/// the reply.
///
/// An empty reply is terminal and returned immediately as
/// [`DocfillError::EmptyCompletion`] — a blocked prompt stays blocked, so
/// retrying it would only burn attempts. Transport failures and timeouts are
/// retried up to `max_retries` with exponential backoff.
pub(crate) async fn complete_with<F, Fut>(
    config: &FillConfig,
    mut call: F,
) -> Result<Completion, DocfillError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ProviderReply, DocfillError>>,
{
    let start = Instant::now();
    let call_timeout = Duration::from_secs(config.api_timeout_secs);
    let mut last_err: Option<DocfillError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Generation retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(call_timeout, call()).await {
            Ok(Ok(reply)) => {
                let duration = start.elapsed();
                debug!(
                    "Completion: {} input tokens, {} output tokens, {:?}",
                    reply.input_tokens, reply.output_tokens, duration
                );
                if reply.content.trim().is_empty() {
                    return Err(DocfillError::EmptyCompletion {
                        detail: "the prompt may have been blocked by the provider".into(),
                    });
                }
                return Ok(Completion {
                    content: reply.content,
                    input_tokens: reply.input_tokens,
                    output_tokens: reply.output_tokens,
                    duration_ms: duration.as_millis() as u64,
                });
            }
            Ok(Err(e)) => {
                warn!("Generation attempt {} failed: {e}", attempt + 1);
                last_err = Some(e);
            }
            Err(_) => {
                warn!(
                    "Generation attempt {} timed out after {}s",
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_err = Some(DocfillError::GenerationTimeout {
                    secs: config.api_timeout_secs,
                });
            }
        }
    }

    Err(last_err.unwrap_or_else(|| DocfillError::Internal("generation produced no result".into())))
}
