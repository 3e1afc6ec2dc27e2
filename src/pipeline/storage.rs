//! Audio file storage: naming, cache lookup, atomic writes and cleanup.
//!
//! Page audio is stored as `{key}_page_{N}_{uuid}.mp3` and summary audio as
//! `{key}_page_{N}_{uuid}_summary.mp3`, where `key` is the document key of the
//! upload (see [`crate::pipeline::input`]). The `{key}_page_{N}_` prefix is
//! what lets a repeated conversion of the same page of the same document reuse
//! the existing file.

use crate::error::ReaderError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const SUMMARY_SUFFIX: &str = "_summary.mp3";

/// Write `bytes` to `path` via a uniquely named sibling temp file and rename,
/// so readers never observe a half-written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReaderError> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes))
        .await
        .map_err(|e| ReaderError::Internal(format!("Write task panicked: {}", e)))?
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> Result<(), ReaderError> {
    let write_err = |source: std::io::Error| ReaderError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Delete every regular file in `dir` whose name ends with `.{ext}`.
///
/// Individual failures are logged and skipped. A missing directory counts as
/// empty. Returns the number of files removed.
pub async fn remove_with_extension(dir: &Path, ext: &str) -> usize {
    let suffix = format!(".{ext}");
    remove_matching(dir, |name| name.ends_with(&suffix)).await
}

/// Delete every file in `dir` whose name satisfies `matches`.
pub async fn remove_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Nothing to remove in {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read {}: {}", dir.display(), e);
                break;
            }
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !matches(name) {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!("Removed {}", entry.path().display());
                removed += 1;
            }
            Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
        }
    }
    removed
}

/// The directory holding generated audio.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh file name for the audio of page `page_num` of document `key`.
    pub fn page_audio_name(key: &str, page_num: usize) -> String {
        format!("{}_page_{}_{}.mp3", key, page_num, Uuid::new_v4())
    }

    /// Fresh file name for the summary audio of page `page_num` of document `key`.
    pub fn summary_audio_name(key: &str, page_num: usize) -> String {
        format!("{}_page_{}_{}{}", key, page_num, Uuid::new_v4(), SUMMARY_SUFFIX)
    }

    /// Find audio already generated for page `page_num` of document `key`
    /// (summary audio excluded).
    pub async fn find_page_audio(&self, key: &str, page_num: usize) -> Option<String> {
        let prefix = format!("{key}_page_{page_num}_");
        let mut entries = tokio::fs::read_dir(&self.dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix)
                    && name.ends_with(".mp3")
                    && !name.ends_with(SUMMARY_SUFFIX)
                {
                    return Some(name.to_string());
                }
            }
        }
        None
    }

    /// Store `bytes` as `filename`; returns the full path.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ReaderError> {
        let path = self.dir.join(filename);
        write_atomic(&path, bytes).await?;
        debug!("Wrote {} bytes of audio to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Resolve a plain file name inside the audio directory.
    pub fn path_of(&self, filename: &str) -> Result<PathBuf, ReaderError> {
        let not_found = || ReaderError::AudioNotFound {
            filename: filename.to_string(),
        };
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename.starts_with('.')
        {
            return Err(not_found());
        }
        let path = self.dir.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }

    /// Delete every generated `.mp3`.
    pub async fn clear(&self) -> usize {
        remove_with_extension(&self.dir, "mp3").await
    }

    /// Delete the audio generated for document `key` only.
    pub async fn clear_document(&self, key: &str) -> usize {
        let prefix = format!("{key}_");
        remove_matching(&self.dir, |name| {
            name.starts_with(&prefix) && name.ends_with(".mp3")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_names() {
        let page = AudioStore::page_audio_name("k1", 3);
        assert!(page.starts_with("k1_page_3_"));
        assert!(page.ends_with(".mp3"));
        assert!(!page.ends_with(SUMMARY_SUFFIX));

        let summary = AudioStore::summary_audio_name("k1", 3);
        assert!(summary.starts_with("k1_page_3_"));
        assert!(summary.ends_with("_summary.mp3"));
    }

    #[tokio::test]
    async fn find_page_audio_skips_summaries_and_other_pages() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        store.save("k1_page_1_aaa_summary.mp3", b"s").await.unwrap();
        store.save("k1_page_12_bbb.mp3", b"x").await.unwrap();
        assert_eq!(store.find_page_audio("k1", 1).await, None);

        store.save("k1_page_1_ccc.mp3", b"p").await.unwrap();
        assert_eq!(
            store.find_page_audio("k1", 1).await.as_deref(),
            Some("k1_page_1_ccc.mp3")
        );
        assert_eq!(
            store.find_page_audio("k1", 12).await.as_deref(),
            Some("k1_page_12_bbb.mp3")
        );
    }

    #[tokio::test]
    async fn find_page_audio_is_scoped_to_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        store.save("alice_page_1_aaa.mp3", b"a").await.unwrap();

        assert_eq!(store.find_page_audio("bob", 1).await, None);
        assert_eq!(
            store.find_page_audio("alice", 1).await.as_deref(),
            Some("alice_page_1_aaa.mp3")
        );
    }

    #[tokio::test]
    async fn clear_document_leaves_other_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        store.save("alice_page_1_aaa.mp3", b"a").await.unwrap();
        store.save("alice_page_1_bbb_summary.mp3", b"a").await.unwrap();
        store.save("bob_page_1_ccc.mp3", b"b").await.unwrap();

        assert_eq!(store.clear_document("alice").await, 2);
        assert!(store.path_of("bob_page_1_ccc.mp3").is_ok());
        assert_eq!(store.clear().await, 1);
    }

    #[tokio::test]
    async fn find_page_audio_missing_dir() {
        let store = AudioStore::new("/nonexistent/pdf2speech/audio");
        assert_eq!(store.find_page_audio("k1", 1).await, None);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path().join("nested"));
        let path = store.save("page_1_x.mp3", b"ID3").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3");
        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["page_1_x.mp3"]);
    }

    #[tokio::test]
    async fn path_of_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        store.save("page_1_x.mp3", b"ID3").await.unwrap();
        assert!(store.path_of("page_1_x.mp3").is_ok());
        assert!(matches!(
            store.path_of("../page_1_x.mp3"),
            Err(ReaderError::AudioNotFound { .. })
        ));
        assert!(matches!(
            store.path_of("page_9_y.mp3"),
            Err(ReaderError::AudioNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn remove_with_extension_only_matches_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"1").unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"2").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"3").unwrap();
        std::fs::write(dir.path().join("mp3"), b"4").unwrap();

        assert_eq!(remove_with_extension(dir.path(), "mp3").await, 2);
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("mp3").exists());
    }
}
