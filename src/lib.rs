//! # edgequake-pdf2speech
//!
//! Read PDF documents aloud, page by page, and summarise pages with an LLM.
//!
//! A user uploads a PDF, picks a page and gets an MP3 of its text. The same
//! page can be summarised by an LLM; the summary is cleaned up (preambles,
//! filler phrases, echoed prompt text, punctuation runs) and can be spoken
//! as well.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload     validate + sanitise + save under a per-upload key
//!  ├─ 2. Extract    page text via pdfium (spawn_blocking)
//!  ├─ 3. Speak      OpenAI-compatible /audio/speech → {key}_page_{N}_{uuid}.mp3
//!  ├─ 4. Summarise  gpt-4.1-nano / claude / gemini / … via edgequake-llm
//!  ├─ 5. Normalise  regex cleanup of the raw summary
//!  └─ 6. Speak      summary → {key}_page_{N}_{uuid}_summary.mp3
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2speech::{ConvertRequest, Reader, ReaderConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = Reader::new(ReaderConfig::default())?;
//!     let mut session = Session::new();
//!
//!     let bytes = std::fs::read("document.pdf")?;
//!     let upload = reader.upload(&mut session, Some("document.pdf"), &bytes).await?;
//!
//!     let page = reader
//!         .convert_page(&mut session, &ConvertRequest::for_page(&upload, 1))
//!         .await?;
//!     println!("audio: {}", page.audio_file);
//!
//!     let summary = reader.summarize(&mut session).await?;
//!     println!("{}", summary.summary);
//!     Ok(())
//! }
//! ```
//!
//! The normaliser is usable on its own:
//!
//! ```rust
//! use edgequake_pdf2speech::normalize;
//!
//! assert_eq!(normalize("this is fine   here"), "This is fine here.");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2speech` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod reader;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReaderConfig, ReaderConfigBuilder, SpeechOptions, SummaryOptions};
pub use error::ReaderError;
pub use output::{
    CleanupResponse, ConversionResponse, ConvertRequest, ErrorResponse, SummaryResponse,
    UploadResponse,
};
pub use pipeline::extract::{PageSource, PdfiumPageSource};
pub use pipeline::normalize::{normalize, normalize_opt, SummaryNormalizer};
pub use pipeline::speech::{HttpSpeechSynthesizer, SpeechSynthesizer};
pub use pipeline::summarize::{LlmSummarizer, Summarizer};
pub use reader::{Reader, ReaderBuilder};
pub use session::{Session, UploadedDocument};
