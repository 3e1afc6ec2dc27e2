//! Per-caller reading state.
//!
//! A [`Session`] remembers what one user is working on: the uploaded document,
//! the page they last converted, that page's text and the last summary. The
//! [`crate::Reader`] is stateless and shared; operations that update this
//! context take `&mut Session`, so two users never see each other's pages.

use std::path::PathBuf;

/// A PDF accepted by [`crate::Reader::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Key shared by the stored PDF and all audio generated from it.
    pub key: String,
    /// Sanitised file name as uploaded.
    pub filename: String,
    /// Stored file, `{key}_{filename}` inside the upload directory.
    pub path: PathBuf,
    pub page_count: usize,
}

/// Reading context for one user.
#[derive(Debug, Clone, Default)]
pub struct Session {
    document: Option<UploadedDocument>,
    page_num: Option<usize>,
    /// Document key of the page `last_text` came from.
    text_key: Option<String>,
    last_text: Option<String>,
    last_summary: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        self.document.as_ref()
    }

    /// Page selected by the last conversion request (1-indexed).
    pub fn page_num(&self) -> Option<usize> {
        self.page_num
    }

    /// Text of the last converted page.
    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    /// Last cleaned summary.
    pub fn last_summary(&self) -> Option<&str> {
        self.last_summary.as_deref()
    }

    /// Switch to a new document, forgetting everything about the previous one.
    pub(crate) fn set_document(&mut self, doc: UploadedDocument) {
        *self = Self {
            document: Some(doc),
            ..Self::default()
        };
    }

    pub(crate) fn select_page(&mut self, page_num: usize) {
        self.page_num = Some(page_num);
    }

    /// Key of the document the last page text was read from.
    pub(crate) fn text_key(&self) -> Option<&str> {
        self.text_key.as_deref()
    }

    pub(crate) fn set_text(&mut self, key: &str, text: String) {
        self.text_key = Some(key.to_string());
        self.last_text = Some(text);
    }

    pub(crate) fn set_summary(&mut self, summary: String) {
        self.last_summary = Some(summary);
    }

    /// Forget the document and all derived state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
