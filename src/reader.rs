//! The reading service: upload a PDF, speak a page, summarise it, speak the summary.
//!
//! [`Reader`] owns configuration and collaborators only; all per-user state
//! lives in the caller's [`Session`]. Stored PDFs and audio are named after a
//! per-upload document key, so sessions only ever find and remove their own
//! files. One `Reader` can therefore be shared (behind an `Arc`) by every
//! request handler of a web front-end.
//!
//! ## Flow
//!
//! ```text
//! upload ──▶ convert_page ──▶ summarize ──▶ summary_audio
//!  (PDF)     (text + audio)   (clean text)   (audio)
//! ```

use crate::config::ReaderConfig;
use crate::error::ReaderError;
use crate::output::{
    CleanupResponse, ConversionResponse, ConvertRequest, SummaryResponse, UploadResponse,
};
use crate::pipeline::extract::{PageSource, PdfiumPageSource};
use crate::pipeline::normalize::SummaryNormalizer;
use crate::pipeline::speech::{HttpSpeechSynthesizer, SpeechSynthesizer};
use crate::pipeline::storage::{remove_with_extension, AudioStore};
use crate::pipeline::summarize::{truncate_chars, LlmSummarizer, Summarizer};
use crate::pipeline::input;
use crate::session::{Session, UploadedDocument};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Text spoken for pages without a text layer.
pub const NO_TEXT_PLACEHOLDER: &str = "No text found on this page.";

/// PDF-to-speech service. See the [module docs](self).
pub struct Reader {
    config: ReaderConfig,
    pages: Arc<dyn PageSource>,
    speech: Arc<dyn SpeechSynthesizer>,
    summarizer: OnceCell<Arc<dyn Summarizer>>,
    normalizer: SummaryNormalizer,
    audio: AudioStore,
}

impl Reader {
    /// Reader with the default collaborators: pdfium, the HTTP speech
    /// endpoint and (on first use) the configured LLM provider.
    pub fn new(config: ReaderConfig) -> Result<Self, ReaderError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ReaderConfig) -> ReaderBuilder {
        ReaderBuilder {
            config,
            pages: None,
            speech: None,
            summarizer: None,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Resolved lazily so that page conversion works without LLM credentials.
    fn summarizer(&self) -> Result<&Arc<dyn Summarizer>, ReaderError> {
        self.summarizer.get_or_try_init(|| {
            LlmSummarizer::from_config(&self.config).map(|s| Arc::new(s) as Arc<dyn Summarizer>)
        })
    }

    /// Accept an uploaded PDF and make it the session's document.
    ///
    /// The upload is stored under a fresh document key. Once it is accepted,
    /// the session's previous document and the audio generated from it are
    /// removed; files belonging to other sessions are never touched.
    /// Re-uploading the session's current document unchanged keeps it, and
    /// its page audio stays cached.
    pub async fn upload(
        &self,
        session: &mut Session,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<UploadResponse, ReaderError> {
        let safe_name = input::validate_upload(filename, bytes, self.config.max_upload_bytes)?;

        if let Some(doc) = self.reuse_upload(session, &safe_name, bytes).await {
            info!("'{}' already uploaded: {} pages", safe_name, doc.page_count);
            let response = upload_response(&doc);
            session.set_document(doc);
            return Ok(response);
        }

        let key = input::new_document_key();
        let stored = input::stored_name(&key, &safe_name);
        let path = input::save_upload(&self.config.upload_dir, &stored, bytes).await?;

        let page_count = match self.pages.page_count(&path).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove rejected upload {}: {}", path.display(), rm);
                }
                return Err(e);
            }
        };
        info!("Uploaded '{}' as {}: {} pages", safe_name, stored, page_count);

        if let Some(previous) = session.document() {
            self.discard(previous).await;
        }

        let doc = UploadedDocument {
            key,
            filename: safe_name,
            path,
            page_count,
        };
        let response = upload_response(&doc);
        session.set_document(doc);
        Ok(response)
    }

    /// The session's current document, if `bytes` is an identical re-upload of it.
    async fn reuse_upload(
        &self,
        session: &Session,
        safe_name: &str,
        bytes: &[u8],
    ) -> Option<UploadedDocument> {
        let current = session.document().filter(|d| d.filename == safe_name)?;
        let existing = tokio::fs::read(&current.path).await.ok()?;
        if existing != bytes {
            return None;
        }
        let page_count = self.pages.page_count(&current.path).await.ok()?;
        Some(UploadedDocument {
            page_count,
            ..current.clone()
        })
    }

    /// Remove a document's stored PDF and all audio generated from it.
    async fn discard(&self, doc: &UploadedDocument) -> usize {
        let pdf = match tokio::fs::remove_file(&doc.path).await {
            Ok(()) => 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                warn!("Failed to remove {}: {}", doc.path.display(), e);
                0
            }
        };
        let audio = self.audio.clear_document(&doc.key).await;
        debug!(
            "Discarded '{}' ({} PDF, {} audio file(s))",
            doc.filename, pdf, audio
        );
        pdf + audio
    }

    /// Select a page and extract its text into the session, without speech.
    ///
    /// Empty pages yield [`NO_TEXT_PLACEHOLDER`].
    pub async fn read_page(
        &self,
        session: &mut Session,
        request: &ConvertRequest,
    ) -> Result<String, ReaderError> {
        let filename = request
            .filename
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ReaderError::MissingData { field: "filename" })?;
        let temp_filename = request
            .temp_filename
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ReaderError::MissingData {
                field: "temp_filename",
            })?;
        let page_num = request
            .page_num
            .filter(|&p| p > 0)
            .ok_or(ReaderError::MissingData { field: "page_num" })?;

        let (key, pdf_path) = input::resolve_upload(&self.config.upload_dir, temp_filename)?;
        session.select_page(page_num);
        debug!("Reading page {} of '{}'", page_num, filename);

        let total = match session.document() {
            Some(doc) if doc.path == pdf_path => doc.page_count,
            _ => self.pages.page_count(&pdf_path).await?,
        };
        if page_num > total {
            return Err(ReaderError::PageOutOfRange {
                page: page_num,
                total,
            });
        }

        let text = self.pages.page_text(&pdf_path, page_num).await?;
        let text = if text.trim().is_empty() {
            NO_TEXT_PLACEHOLDER.to_string()
        } else {
            text
        };
        session.set_text(key, text.clone());
        Ok(text)
    }

    /// Extract one page's text and read it aloud.
    ///
    /// The page text is always stored in the session (so a following
    /// [`Reader::summarize`] covers this page), but speech is only synthesised
    /// when no audio for the page exists yet.
    pub async fn convert_page(
        &self,
        session: &mut Session,
        request: &ConvertRequest,
    ) -> Result<ConversionResponse, ReaderError> {
        let start = Instant::now();
        let text = self.read_page(session, request).await?;
        let page_num = session.page_num().unwrap_or_default();
        let key = session.text_key().unwrap_or_default().to_string();

        if let Some(existing) = self.audio.find_page_audio(&key, page_num).await {
            info!("Page {} audio already exists: {}", page_num, existing);
            return Ok(ConversionResponse {
                success: true,
                audio_file: existing,
                message: format!("Page {} audio already exists", page_num),
                already_converted: true,
            });
        }

        let audio = self.speech.synthesize(&text).await?;
        let audio_file = AudioStore::page_audio_name(&key, page_num);
        self.audio.save(&audio_file, &audio).await?;

        info!(
            "Converted page {} → {} ({} bytes, {}ms)",
            page_num,
            audio_file,
            audio.len(),
            start.elapsed().as_millis()
        );

        Ok(ConversionResponse {
            success: true,
            audio_file,
            message: format!("Successfully converted page {} to audio", page_num),
            already_converted: false,
        })
    }

    /// Summarise the last converted page and store the cleaned summary.
    pub async fn summarize(&self, session: &mut Session) -> Result<SummaryResponse, ReaderError> {
        let start = Instant::now();
        let text = session
            .last_text()
            .filter(|t| !t.is_empty())
            .ok_or(ReaderError::NoTextToSummarize)?;

        let input = truncate_chars(text, self.config.summary.max_input_chars);
        if input.len() < text.len() {
            debug!(
                "Truncated page text from {} to {} bytes before summarising",
                text.len(),
                input.len()
            );
        }

        let raw = self
            .summarizer()?
            .summarize(input, &self.config.summary)
            .await?;
        let summary = self.normalizer.normalize(&raw);
        info!(
            "Summary: {} raw chars → {} clean chars in {}ms",
            raw.len(),
            summary.len(),
            start.elapsed().as_millis()
        );

        session.set_summary(summary.clone());
        Ok(SummaryResponse {
            success: true,
            summary,
        })
    }

    /// Read the last summary aloud.
    pub async fn summary_audio(&self, session: &Session) -> Result<ConversionResponse, ReaderError> {
        let summary = session
            .last_summary()
            .filter(|s| !s.is_empty())
            .ok_or(ReaderError::NoSummary)?;
        let page_num = session.page_num().unwrap_or(0);
        let key = session.text_key().unwrap_or_default();

        let audio = self.speech.synthesize(summary).await?;
        let audio_file = AudioStore::summary_audio_name(key, page_num);
        self.audio.save(&audio_file, &audio).await?;
        info!("Summary of page {} → {}", page_num, audio_file);

        Ok(ConversionResponse {
            success: true,
            audio_file,
            message: format!("Successfully converted summary of page {} to audio", page_num),
            already_converted: false,
        })
    }

    /// Full path of a generated audio file.
    pub fn audio_path(&self, filename: &str) -> Result<PathBuf, ReaderError> {
        self.audio.path_of(filename)
    }

    /// Delete the session's document and its audio, and reset the session.
    pub async fn cleanup(&self, session: &mut Session) -> Result<CleanupResponse, ReaderError> {
        let removed = match session.document() {
            Some(doc) => self.discard(doc).await,
            None => 0,
        };
        session.clear();
        info!("Cleanup removed {} file(s)", removed);
        Ok(CleanupResponse {
            success: true,
            message: "Cleanup completed".to_string(),
            removed_files: removed,
        })
    }

    /// Delete every uploaded PDF and every generated audio file, whichever
    /// session they belong to.
    ///
    /// Meant for maintenance (the CLI `cleanup` command); request handlers
    /// serving several users should call [`Reader::cleanup`] instead.
    pub async fn purge(&self) -> CleanupResponse {
        let pdfs = remove_with_extension(&self.config.upload_dir, "pdf").await;
        let audio = self.audio.clear().await;
        info!("Purge removed {} PDF(s) and {} audio file(s)", pdfs, audio);
        CleanupResponse {
            success: true,
            message: "Cleanup completed".to_string(),
            removed_files: pdfs + audio,
        }
    }
}

fn upload_response(doc: &UploadedDocument) -> UploadResponse {
    UploadResponse {
        success: true,
        total_pages: doc.page_count,
        filename: doc.filename.clone(),
        temp_filename: input::stored_name(&doc.key, &doc.filename),
    }
}

/// Builder for [`Reader`]; any collaborator left unset gets its default.
pub struct ReaderBuilder {
    config: ReaderConfig,
    pages: Option<Arc<dyn PageSource>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl ReaderBuilder {
    pub fn page_source(mut self, pages: Arc<dyn PageSource>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Create the upload and audio directories and assemble the reader.
    pub fn build(self) -> Result<Reader, ReaderError> {
        let config = self.config;
        for dir in [&config.upload_dir, &config.audio_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ReaderError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        let speech = match self.speech {
            Some(s) => s,
            None => Arc::new(HttpSpeechSynthesizer::from_config(&config)?),
        };
        let pages = self
            .pages
            .unwrap_or_else(|| Arc::new(PdfiumPageSource::new()));

        let summarizer = OnceCell::new();
        if let Some(s) = self.summarizer {
            // A fresh cell is always empty.
            let _ = summarizer.set(s);
        }

        let normalizer = config
            .artifacts
            .iter()
            .fold(SummaryNormalizer::builder(), |b, phrase| b.artifact(phrase.as_str()))
            .build()?;

        Ok(Reader {
            audio: AudioStore::new(&config.audio_dir),
            config,
            pages,
            speech,
            summarizer,
            normalizer,
        })
    }
}
