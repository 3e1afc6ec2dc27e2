//! Error types for the edgequake-pdf2speech library.
//!
//! Every fallible [`crate::Reader`] operation returns `Result<_, ReaderError>`.
//! The summary normaliser itself is total and has no error path.
//!
//! Variants are grouped by the stage that produced them. Each one maps to the
//! HTTP status a web front-end should answer with ([`ReaderError::status_code`]),
//! so a thin routing layer can forward errors without its own taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdf2speech library.
#[derive(Debug, Error)]
pub enum ReaderError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The upload request carried no file part.
    #[error("No file part")]
    NoFile,

    /// The upload request carried a file with an empty name.
    #[error("No file selected")]
    NoFileSelected,

    /// The uploaded file does not have a `.pdf` extension.
    #[error("Invalid file type: '{filename}' (only .pdf is accepted)")]
    InvalidFileType { filename: String },

    /// The uploaded file exceeds the configured size limit.
    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: usize, limit: usize },

    /// A conversion request is missing the filename or page number.
    #[error("Missing required data: {field}")]
    MissingData { field: &'static str },

    /// The previously uploaded PDF is no longer on disk.
    #[error("PDF file not found: '{path}'. Please re-upload.")]
    PdfNotFound { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not open the document.
    #[error("Error reading PDF '{path}': {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The requested page does not exist.
    #[error("Invalid page number: {page} (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium opened the page but could not extract its text layer.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Session state errors ──────────────────────────────────────────────
    /// `summarize` was called before any page text was extracted.
    #[error("No text available to summarize")]
    NoTextToSummarize,

    /// `summary_audio` was called before a summary was generated.
    #[error("No summary available to convert")]
    NoSummary,

    // ── Model errors ──────────────────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The summariser failed after all retries.
    #[error("Summarization failed after {retries} retries: {detail}")]
    SummarizationFailed { retries: u32, detail: String },

    /// The speech engine failed after all retries.
    #[error("Speech synthesis failed after {retries} retries: {detail}")]
    SpeechFailed { retries: u32, detail: String },

    /// A model call exceeded the per-call timeout.
    #[error("{stage} call timed out after {secs}s")]
    ApiTimeout { stage: &'static str, secs: u64 },

    // ── Storage errors ────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested audio file does not exist (or the name is not a plain file name).
    #[error("Audio file not found: '{filename}'")]
    AudioNotFound { filename: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReaderError {
    /// HTTP status code a web front-end should use for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ReaderError::NoFile
            | ReaderError::NoFileSelected
            | ReaderError::InvalidFileType { .. }
            | ReaderError::MissingData { .. }
            | ReaderError::PdfNotFound { .. }
            | ReaderError::PageOutOfRange { .. }
            | ReaderError::NoTextToSummarize
            | ReaderError::NoSummary => 400,
            ReaderError::AudioNotFound { .. } => 404,
            ReaderError::FileTooLarge { .. } => 413,
            _ => 500,
        }
    }

    /// True when the caller, not the system, is at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_out_of_range_display() {
        let e = ReaderError::PageOutOfRange { page: 9, total: 4 };
        let msg = e.to_string();
        assert!(msg.contains("9"), "got: {msg}");
        assert!(msg.contains("4 pages"), "got: {msg}");
    }

    #[test]
    fn state_errors_are_client_errors() {
        assert_eq!(ReaderError::NoTextToSummarize.status_code(), 400);
        assert_eq!(ReaderError::NoSummary.status_code(), 400);
        assert!(ReaderError::NoFile.is_client_error());
    }

    #[test]
    fn audio_not_found_is_404() {
        let e = ReaderError::AudioNotFound {
            filename: "page_1_x.mp3".into(),
        };
        assert_eq!(e.status_code(), 404);
        assert!(e.to_string().contains("page_1_x.mp3"));
    }

    #[test]
    fn upstream_failures_are_server_errors() {
        let e = ReaderError::SpeechFailed {
            retries: 3,
            detail: "503".into(),
        };
        assert_eq!(e.status_code(), 500);
        assert!(!e.is_client_error());
        let e = ReaderError::ApiTimeout {
            stage: "Summarizer",
            secs: 60,
        };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn too_large_is_413() {
        let e = ReaderError::FileTooLarge {
            size: 20,
            limit: 10,
        };
        assert_eq!(e.status_code(), 413);
    }
}
