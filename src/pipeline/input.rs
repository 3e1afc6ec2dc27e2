//! Upload handling: validate, sanitise and store a user-supplied PDF.
//!
//! The browser sends an arbitrary file name. It is reduced to a safe ASCII
//! name before it touches the file system, and the body is checked for the
//! `%PDF` magic bytes so callers get a meaningful error rather than a pdfium
//! failure later on.
//!
//! Every upload is stored as `{key}_{safe_name}`, where the key is a fresh
//! 32-digit hex id. The same key prefixes the document's audio files, so one
//! document's files can be looked up and removed without touching another's.

use crate::error::ReaderError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const KEY_LEN: usize = 32;

/// True when `filename` has a `.pdf` extension (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Reduce an untrusted file name to `[A-Za-z0-9._-]`, with no path components.
///
/// Separators and whitespace become `_`; leading and trailing `.`/`_` are
/// stripped so the result can never be `..` or a hidden file. Returns
/// `upload.pdf` when nothing usable is left.
pub fn secure_filename(filename: &str) -> String {
    let spaced: String = filename
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload.pdf".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Validate an upload and return the sanitised file name to store it under.
pub fn validate_upload(
    filename: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<String, ReaderError> {
    let filename = filename.ok_or(ReaderError::NoFile)?;
    if filename.is_empty() {
        return Err(ReaderError::NoFileSelected);
    }
    if !allowed_file(filename) {
        return Err(ReaderError::InvalidFileType {
            filename: filename.to_string(),
        });
    }
    if bytes.len() > max_bytes {
        return Err(ReaderError::FileTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let safe = secure_filename(filename);
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ReaderError::CorruptPdf {
            path: PathBuf::from(&safe),
            detail: format!("not a PDF, first bytes: {:?}", magic),
        });
    }

    debug!("Accepted upload '{}' as '{}'", filename, safe);
    Ok(safe)
}

/// Fresh document key for a new upload.
pub fn new_document_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// File name an upload is stored under.
pub fn stored_name(key: &str, safe_name: &str) -> String {
    format!("{key}_{safe_name}")
}

/// Document key of a stored upload name, or `None` for names not produced by
/// [`stored_name`].
pub fn document_key(stored: &str) -> Option<&str> {
    let (key, rest) = stored.split_once('_')?;
    let valid = key.len() == KEY_LEN
        && key.bytes().all(|b| b.is_ascii_hexdigit())
        && !rest.is_empty();
    valid.then_some(key)
}

/// Write `bytes` to `dir/filename` atomically (temp file + rename).
pub async fn save_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ReaderError> {
    let path = dir.join(filename);
    crate::pipeline::storage::write_atomic(&path, bytes).await?;
    info!("Saved upload: {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Locate a previously uploaded file by the name returned from the upload.
///
/// Returns the document key and the full path.
pub fn resolve_upload<'a>(
    dir: &Path,
    temp_filename: &'a str,
) -> Result<(&'a str, PathBuf), ReaderError> {
    let path = dir.join(temp_filename);
    if secure_filename(temp_filename) != temp_filename || !path.is_file() {
        return Err(ReaderError::PdfNotFound { path });
    }
    match document_key(temp_filename) {
        Some(key) => Ok((key, path)),
        None => Err(ReaderError::PdfNotFound { path }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("doc.pdf"));
        assert!(allowed_file("DOC.PDF"));
        assert!(allowed_file("a.b.pdf"));
        assert!(!allowed_file("doc.txt"));
        assert!(!allowed_file("pdf"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Report.pdf"), "My_Report.pdf");
        assert_eq!(secure_filename("../../etc/passwd.pdf"), "etc_passwd.pdf");
        assert_eq!(secure_filename("résumé.pdf"), "rsum.pdf");
        assert_eq!(secure_filename("..."), "upload.pdf");
        assert_eq!(secure_filename("C:\\docs\\a.pdf"), "C_docs_a.pdf");
    }

    #[test]
    fn test_validate_upload_errors() {
        let pdf = b"%PDF-1.7 rest";
        assert!(matches!(
            validate_upload(None, pdf, 100),
            Err(ReaderError::NoFile)
        ));
        assert!(matches!(
            validate_upload(Some(""), pdf, 100),
            Err(ReaderError::NoFileSelected)
        ));
        assert!(matches!(
            validate_upload(Some("a.txt"), pdf, 100),
            Err(ReaderError::InvalidFileType { .. })
        ));
        assert!(matches!(
            validate_upload(Some("a.pdf"), pdf, 4),
            Err(ReaderError::FileTooLarge { size: 13, limit: 4 })
        ));
        assert!(matches!(
            validate_upload(Some("a.pdf"), b"PK\x03\x04", 100),
            Err(ReaderError::CorruptPdf { .. })
        ));
        assert!(matches!(
            validate_upload(Some("a.pdf"), b"%P", 100),
            Err(ReaderError::CorruptPdf { .. })
        ));
    }

    #[test]
    fn test_validate_upload_ok() {
        let name = validate_upload(Some("my doc.pdf"), b"%PDF-1.4", 100).unwrap();
        assert_eq!(name, "my_doc.pdf");
    }

    #[test]
    fn test_document_key() {
        let key = new_document_key();
        assert_eq!(key.len(), 32);
        assert_ne!(key, new_document_key());

        let stored = stored_name(&key, "My_Report.pdf");
        assert_eq!(secure_filename(&stored), stored);
        assert_eq!(document_key(&stored), Some(key.as_str()));

        assert_eq!(document_key("report.pdf"), None);
        assert_eq!(document_key("My_Report.pdf"), None);
        assert_eq!(document_key(&format!("{key}_")), None);
    }

    #[test]
    fn test_resolve_upload() {
        let dir = tempfile::tempdir().unwrap();
        let key = new_document_key();
        let stored = stored_name(&key, "a.pdf");
        std::fs::write(dir.path().join(&stored), b"%PDF").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();

        let (found, path) = resolve_upload(dir.path(), &stored).unwrap();
        assert_eq!(found, key);
        assert_eq!(path, dir.path().join(&stored));

        for bad in ["a.pdf", "missing.pdf", "../a.pdf"] {
            assert!(
                matches!(
                    resolve_upload(dir.path(), bad),
                    Err(ReaderError::PdfNotFound { .. })
                ),
                "{bad}"
            );
        }
    }
}
