//! Configuration types for the PDF reader.
//!
//! All reader behaviour is controlled through [`ReaderConfig`], built via its
//! [`ReaderConfigBuilder`]. Summariser and speech settings live in their own
//! small structs ([`SummaryOptions`], [`SpeechOptions`]) because they are handed
//! straight to the collaborator that consumes them.

use crate::error::ReaderError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a [`crate::Reader`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2speech::ReaderConfig;
///
/// let config = ReaderConfig::builder()
///     .upload_dir("/tmp/pdf2speech/uploads")
///     .audio_dir("/tmp/pdf2speech/audio")
///     .voice("nova")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReaderConfig {
    /// Directory holding the uploaded PDF. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Directory holding generated audio. Default: `audio`.
    pub audio_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// LLM model identifier for summaries. If None, uses `gpt-4.1-nano`.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom summariser instruction. If None, uses [`crate::prompts::SUMMARY_SYSTEM_PROMPT`].
    pub summary_prompt: Option<String>,

    /// Extra phrases stripped from summaries in addition to the built-in artifact.
    pub artifacts: Vec<String>,

    /// Summary generation bounds.
    pub summary: SummaryOptions,

    /// Speech engine settings.
    pub speech: SpeechOptions,

    /// Maximum retry attempts on a transient model failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout for the summariser and speech engine. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            audio_dir: PathBuf::from("audio"),
            max_upload_bytes: 16 * 1024 * 1024,
            model: None,
            provider_name: None,
            provider: None,
            summary_prompt: None,
            artifacts: Vec::new(),
            summary: SummaryOptions::default(),
            speech: SpeechOptions::default(),
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("upload_dir", &self.upload_dir)
            .field("audio_dir", &self.audio_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("artifacts", &self.artifacts)
            .field("summary", &self.summary)
            .field("speech", &self.speech)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ReaderConfig {
    /// Create a new builder for `ReaderConfig`.
    pub fn builder() -> ReaderConfigBuilder {
        ReaderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReaderConfig`].
#[derive(Debug)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn audio_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.audio_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
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

    pub fn summary_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.summary_prompt = Some(prompt.into());
        self
    }

    pub fn artifact(mut self, phrase: impl Into<String>) -> Self {
        self.config.artifacts.push(phrase.into());
        self
    }

    pub fn summary_length(mut self, min: usize, max: usize) -> Self {
        self.config.summary.min_length = min;
        self.config.summary.max_length = max;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.summary.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.summary.max_input_chars = n.max(1);
        self
    }

    pub fn speech_url(mut self, url: impl Into<String>) -> Self {
        self.config.speech.base_url = url.into();
        self
    }

    pub fn speech_model(mut self, model: impl Into<String>) -> Self {
        self.config.speech.model = model.into();
        self
    }

    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.config.speech.voice = voice.into();
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.config.speech.speed = speed.clamp(0.25, 4.0);
        self
    }

    pub fn speech_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.speech.api_key = Some(key.into());
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

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReaderConfig, ReaderError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(ReaderError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.summary.min_length > c.summary.max_length {
            return Err(ReaderError::InvalidConfig(format!(
                "Summary length bounds are inverted: min {} > max {}",
                c.summary.min_length, c.summary.max_length
            )));
        }
        if !c.speech.base_url.starts_with("http://") && !c.speech.base_url.starts_with("https://")
        {
            return Err(ReaderError::InvalidConfig(format!(
                "Speech URL must be http(s), got '{}'",
                c.speech.base_url
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReaderError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Collaborator options ─────────────────────────────────────────────────

/// Generation bounds handed to the [`crate::pipeline::summarize::Summarizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Lower bound on summary length, in words. Default: 150.
    pub min_length: usize,
    /// Upper bound on summary length, in tokens. Default: 600.
    pub max_length: usize,
    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,
    /// Page text beyond this many characters is dropped before summarising. Default: 4096.
    pub max_input_chars: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            min_length: 150,
            max_length: 600,
            temperature: 0.1,
            max_input_chars: 4096,
        }
    }
}

/// Settings for an OpenAI-compatible `/audio/speech` endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechOptions {
    /// Base URL, without the `/audio/speech` suffix. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Speech model. Default: `tts-1`.
    pub model: String,
    /// Voice name. Default: `alloy`.
    pub voice: String,
    /// Playback speed, 0.25–4.0. Default: 1.0.
    pub speed: f32,
    /// Bearer token. If None, `OPENAI_API_KEY` is read at call time.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            api_key: None,
        }
    }
}

impl fmt::Debug for SpeechOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechOptions")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("speed", &self.speed)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = ReaderConfig::builder().build().unwrap();
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.speech.model, "tts-1");
        assert_eq!(config.summary.max_length, 600);
    }

    #[test]
    fn inverted_lengths_rejected() {
        let err = ReaderConfig::builder().summary_length(700, 100).build();
        assert!(matches!(err, Err(ReaderError::InvalidConfig(_))));
    }

    #[test]
    fn non_http_speech_url_rejected() {
        let err = ReaderConfig::builder().speech_url("ftp://tts").build();
        assert!(matches!(err, Err(ReaderError::InvalidConfig(_))));
    }

    #[test]
    fn setters_clamp() {
        let config = ReaderConfig::builder()
            .speed(10.0)
            .temperature(-1.0)
            .max_input_chars(0)
            .build()
            .unwrap();
        assert_eq!(config.speech.speed, 4.0);
        assert_eq!(config.summary.temperature, 0.0);
        assert_eq!(config.summary.max_input_chars, 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ReaderConfig::builder()
            .speech_api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
