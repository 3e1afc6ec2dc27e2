//! Response types returned by [`crate::Reader`] operations.
//!
//! Field names match the JSON bodies a web front-end expects, so an HTTP layer
//! can serialise these with `serde_json` and send them unchanged.

use crate::error::ReaderError;
use serde::{Deserialize, Serialize};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub total_pages: usize,
    /// Sanitised file name the PDF was stored under.
    pub filename: String,
    /// Name to pass back in [`ConvertRequest::temp_filename`].
    pub temp_filename: String,
}

/// A request to read one page aloud.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub temp_filename: Option<String>,
    /// 1-indexed page number.
    #[serde(default)]
    pub page_num: Option<usize>,
}

impl ConvertRequest {
    /// Build a request for `page_num` of an uploaded document.
    pub fn for_page(upload: &UploadResponse, page_num: usize) -> Self {
        Self {
            filename: Some(upload.filename.clone()),
            temp_filename: Some(upload.temp_filename.clone()),
            page_num: Some(page_num),
        }
    }
}

/// Result of a page or summary audio conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResponse {
    pub success: bool,
    /// File name inside the audio directory.
    pub audio_file: String,
    pub message: String,
    /// True when existing audio was returned instead of synthesising anew.
    pub already_converted: bool,
}

/// Result of a summarisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub success: bool,
    /// Cleaned summary text.
    pub summary: String,
}

/// Result of a cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub message: String,
    pub removed_files: usize,
}

/// JSON error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&ReaderError> for ErrorResponse {
    fn from(e: &ReaderError) -> Self {
        Self {
            error: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_request_tolerates_missing_fields() {
        let req: ConvertRequest = serde_json::from_str(r#"{"filename": "a.pdf"}"#).unwrap();
        assert_eq!(req.filename.as_deref(), Some("a.pdf"));
        assert_eq!(req.temp_filename, None);
        assert_eq!(req.page_num, None);
    }

    #[test]
    fn conversion_response_field_names() {
        let r = ConversionResponse {
            success: true,
            audio_file: "page_2_abc.mp3".into(),
            message: "ok".into(),
            already_converted: false,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["audio_file"], "page_2_abc.mp3");
        assert_eq!(v["already_converted"], false);
    }

    #[test]
    fn error_response_from_reader_error() {
        let body = ErrorResponse::from(&ReaderError::NoSummary);
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"No summary available to convert"}"#
        );
    }
}
