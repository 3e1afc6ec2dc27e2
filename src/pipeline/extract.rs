//! Page-text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while parsing. Every call runs on tokio's blocking pool
//! so request handlers never stall a worker thread.
//!
//! ## Binding
//!
//! `PDFIUM_LIB_PATH` (file or directory) wins; otherwise a library next to the
//! working directory, then the system library.

use crate::error::ReaderError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of page counts and page text for an uploaded document.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, pdf_path: &Path) -> Result<usize, ReaderError>;

    /// Text layer of page `page_num` (1-indexed). May be empty.
    async fn page_text(&self, pdf_path: &Path, page_num: usize) -> Result<String, ReaderError>;
}

/// [`PageSource`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumPageSource {
    password: Option<String>,
}

impl PdfiumPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open encrypted documents with `password`.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
        }
    }
}

#[async_trait]
impl PageSource for PdfiumPageSource {
    async fn page_count(&self, pdf_path: &Path) -> Result<usize, ReaderError> {
        let path = pdf_path.to_path_buf();
        let password = self.password.clone();
        tokio::task::spawn_blocking(move || page_count_blocking(&path, password.as_deref()))
            .await
            .map_err(|e| ReaderError::Internal(format!("Page-count task panicked: {}", e)))?
    }

    async fn page_text(&self, pdf_path: &Path, page_num: usize) -> Result<String, ReaderError> {
        let path = pdf_path.to_path_buf();
        let password = self.password.clone();
        tokio::task::spawn_blocking(move || page_text_blocking(&path, password.as_deref(), page_num))
            .await
            .map_err(|e| ReaderError::Internal(format!("Extraction task panicked: {}", e)))?
    }
}

/// Bind to a pdfium library, honouring `PDFIUM_LIB_PATH`.
pub fn bind_pdfium() -> Result<Pdfium, ReaderError> {
    let bindings = match std::env::var_os("PDFIUM_LIB_PATH") {
        Some(p) => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&p)
            } else {
                p
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ReaderError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn open_error(pdf_path: &Path, e: PdfiumError) -> ReaderError {
    ReaderError::CorruptPdf {
        path: pdf_path.to_path_buf(),
        detail: format!("{:?}", e),
    }
}

fn page_count_blocking(pdf_path: &Path, password: Option<&str>) -> Result<usize, ReaderError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, e))?;
    let total = document.pages().len() as usize;
    info!("PDF loaded: {} pages", total);
    Ok(total)
}

fn page_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    page_num: usize,
) -> Result<String, ReaderError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, e))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if page_num < 1 || page_num > total {
        return Err(ReaderError::PageOutOfRange {
            page: page_num,
            total,
        });
    }

    let page = pages
        .get((page_num - 1) as u16)
        .map_err(|e| ReaderError::TextExtractionFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;
    let text = page
        .text()
        .map_err(|e| ReaderError::TextExtractionFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?
        .all();

    debug!("Extracted {} chars from page {}", text.len(), page_num);
    Ok(text)
}
