//! Pipeline stages for PDF-to-speech reading.
//!
//! Each submodule implements one step. The network- and pdfium-backed steps
//! sit behind traits ([`extract::PageSource`], [`summarize::Summarizer`],
//! [`speech::SpeechSynthesizer`]) so [`crate::Reader`] can be driven by fakes
//! in tests.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ speech ──▶ storage
//! (upload)  (pdfium)    (TTS)      (mp3)
//!              │
//!              └──▶ summarize ──▶ normalize ──▶ speech ──▶ storage
//!                   (LLM)         (cleanup)
//! ```
//!
//! 1. [`input`]     : validate, sanitise and save an uploaded PDF
//! 2. [`extract`]   : page count and page text; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`summarize`] : LLM call with timeout and retry/backoff
//! 4. [`normalize`] : deterministic cleanup of the raw summary
//! 5. [`speech`]    : text-to-speech over HTTP
//! 6. [`storage`]   : audio naming, cache lookup, atomic writes, cleanup

pub mod extract;
pub mod input;
pub mod normalize;
pub mod speech;
pub mod storage;
pub mod summarize;
