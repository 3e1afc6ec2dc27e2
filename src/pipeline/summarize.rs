//! Abstractive summarisation of page text through an LLM provider.
//!
//! All prompt wording lives in [`crate::prompts`]; this module only builds the
//! message list, applies the per-call timeout and retries transient failures.
//! The raw model output is returned untouched; cleanup is the caller's job
//! ([`crate::pipeline::normalize`]).
//!
//! ## Retry Strategy
//!
//! Exponential backoff (`retry_backoff_ms * 2^(attempt-1)`): with 500 ms base
//! and 3 retries the wait sequence is 500 ms → 1 s → 2 s.

use crate::config::{ReaderConfig, SummaryOptions};
use crate::error::ReaderError;
use crate::prompts::{summary_request, SUMMARY_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Produces a raw abstractive summary of a body of text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, options: &SummaryOptions) -> Result<String, ReaderError>;
}

/// [`Summarizer`] backed by an edgequake-llm chat provider.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout: Duration,
}

impl LlmSummarizer {
    /// Wrap an already-configured provider with default prompt and retry settings.
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        let defaults = ReaderConfig::default();
        Self {
            provider,
            system_prompt: SUMMARY_SYSTEM_PROMPT.to_string(),
            max_retries: defaults.max_retries,
            retry_backoff_ms: defaults.retry_backoff_ms,
            api_timeout: Duration::from_secs(defaults.api_timeout_secs),
        }
    }

    /// Resolve the provider from `config` (see [`resolve_provider`]) and copy
    /// its prompt and retry settings.
    pub fn from_config(config: &ReaderConfig) -> Result<Self, ReaderError> {
        let provider = resolve_provider(config)?;
        Ok(Self {
            provider,
            system_prompt: config
                .summary_prompt
                .clone()
                .unwrap_or_else(|| SUMMARY_SYSTEM_PROMPT.to_string()),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout: Duration::from_secs(config.api_timeout_secs),
        })
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str, options: &SummaryOptions) -> Result<String, ReaderError> {
        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(&summary_request(text, options.min_length)),
        ];
        let completion = build_options(options);

        let mut last_err: Option<String> = None;
        let mut timed_out = false;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Summary: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.api_timeout, self.provider.chat(&messages, Some(&completion))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Summary: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content);
                }
                Ok(Err(e)) => {
                    let err_msg = format!("{}", e);
                    warn!("Summary: attempt {} failed — {}", attempt + 1, err_msg);
                    timed_out = false;
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    warn!(
                        "Summary: attempt {} timed out after {:?}",
                        attempt + 1,
                        self.api_timeout
                    );
                    timed_out = true;
                }
            }
        }

        if timed_out {
            return Err(ReaderError::ApiTimeout {
                stage: "Summarizer",
                secs: self.api_timeout.as_secs(),
            });
        }
        Err(ReaderError::SummarizationFailed {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

/// Build `CompletionOptions` from the summary bounds.
fn build_options(options: &SummaryOptions) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(options.temperature),
        max_tokens: Some(options.max_length),
        ..Default::default()
    }
}

/// Keep at most `max_chars` characters of `text`, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReaderError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReaderError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`OPENAI_API_KEY`** present → OpenAI with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &ReaderConfig) -> Result<Arc<dyn LLMProvider>, ReaderError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReaderError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;
    info!("Auto-detected LLM provider for summaries");

    Ok(llm_provider)
}
