//! Speech synthesis through an OpenAI-compatible `/audio/speech` endpoint.
//!
//! Any server speaking that protocol works (OpenAI, a local TTS gateway,
//! vLLM-style proxies). Inputs longer than the endpoint limit are split on
//! sentence boundaries and the returned MP3 segments are concatenated; MP3
//! frames are self-delimiting, so the result plays as one file.

use crate::config::{ReaderConfig, SpeechOptions};
use crate::error::ReaderError;
use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Longest input the endpoint accepts in one request, in characters.
pub const MAX_INPUT_CHARS: usize = 4096;

/// Turns finished text into encoded audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesise `text` with the configured voice. Returns MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ReaderError>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

/// [`SpeechSynthesizer`] calling `{base_url}/audio/speech`.
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    options: SpeechOptions,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpSpeechSynthesizer {
    pub fn from_config(config: &ReaderConfig) -> Result<Self, ReaderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ReaderError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            options: config.speech.clone(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    fn endpoint(&self) -> String {
        speech_endpoint(&self.options.base_url)
    }

    fn api_key(&self) -> Option<String> {
        self.options
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }

    /// One chunk, with retries on transport errors, 429 and 5xx.
    async fn synthesize_chunk(&self, chunk: &str) -> Result<Vec<u8>, ReaderError> {
        let body = SpeechRequest {
            model: &self.options.model,
            input: chunk,
            voice: &self.options.voice,
            response_format: "mp3",
            speed: self.options.speed,
        };
        let url = self.endpoint();
        let key = self.api_key();

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "Speech: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self.client.post(&url).json(&body);
            if let Some(ref key) = key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    warn!("Speech: attempt {} timed out", attempt + 1);
                    last_err = Some("request timed out".to_string());
                    continue;
                }
                Err(e) => {
                    warn!("Speech: attempt {} failed — {}", attempt + 1, e);
                    last_err = Some(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let bytes = response.bytes().await.map_err(|e| ReaderError::SpeechFailed {
                    retries: attempt,
                    detail: format!("reading audio body: {e}"),
                })?;
                return Ok(bytes.to_vec());
            }

            let detail = response.text().await.unwrap_or_default();
            let err_msg = format!("HTTP {}: {}", status, detail.trim());
            if status.as_u16() == 429 || status.is_server_error() {
                warn!("Speech: attempt {} failed — {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
                continue;
            }
            return Err(ReaderError::SpeechFailed {
                retries: attempt,
                detail: err_msg,
            });
        }

        Err(ReaderError::SpeechFailed {
            retries: self.max_retries,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ReaderError> {
        let chunks = split_for_speech(text, MAX_INPUT_CHARS);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            "Synthesising {} chars in {} request(s) (voice {})",
            text.len(),
            chunks.len(),
            self.options.voice
        );

        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let bytes = self.synthesize_chunk(chunk).await?;
            debug!("Speech chunk {}/{}: {} bytes", i + 1, chunks.len(), bytes.len());
            audio.extend_from_slice(&bytes);
        }
        Ok(audio)
    }
}

fn speech_endpoint(base_url: &str) -> String {
    format!("{}/audio/speech", base_url.trim_end_matches('/'))
}

/// Split `text` into pieces of at most `max_chars` characters, preferring
/// sentence ends, then whitespace, then a hard cut.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let limit = match rest.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(rest);
                break;
            }
        };
        let window = &rest[..limit];
        let cut = window
            .rfind(['.', '!', '?', '\n'])
            .map(|i| i + 1)
            .or_else(|| window.rfind(char::is_whitespace))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        let (chunk, tail) = rest.split_at(cut);
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        rest = tail.trim_start();
    }

    chunks
}
