use chrono::{Local, SecondsFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::StoreError;
use super::line_diff::diff_tokens;
use super::models::DiffEntry;
use crate::monitor::observation::StatusOutcome;

/// Longest sanitized URL kept in a history file name, in bytes.
const MAX_SAFE_NAME_BYTES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Saved,
    NoChange,
}

/// Maps a URL to a string usable as part of a file name and truncates it
/// at a character boundary within 200 bytes.
pub fn safe_filename(url: &str) -> String {
    let mut name = String::with_capacity(url.len().min(MAX_SAFE_NAME_BYTES));
    for c in url.chars() {
        let c = match c {
            ':' => '.',
            '/' | '\\' => '_',
            '?' | '*' => '-',
            other => other,
        };
        if name.len() + c.len_utf8() > MAX_SAFE_NAME_BYTES {
            break;
        }
        name.push(c);
    }
    name
}

/// Append-only per-target history of content diffs, one JSON array per URL.
#[derive(Debug, Clone)]
pub struct DiffStore {
    dir: PathBuf,
}

impl DiffStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the history directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))
    }

    pub fn history_path(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("target_diffs_{}.json", safe_filename(url)))
    }

    /// Reads a history file. Missing or unreadable files count as empty.
    pub fn load_history(path: &Path) -> Vec<DiffEntry> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to read diff history, starting a new one.");
                return Vec::new();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(history) => history,
            Err(e) => {
                warn!(path = ?path, error = %e, "Diff history is corrupt, starting a new one.");
                Vec::new()
            }
        }
    }

    pub fn history(&self, url: &str) -> Vec<DiffEntry> {
        Self::load_history(&self.history_path(url))
    }

    /// Appends a diff entry for `url` when the content differs from the
    /// previous content and rewrites the history file.
    pub fn record_if_changed(
        &self,
        url: &str,
        status: &StatusOutcome,
        new_content: &str,
        old_content: &str,
    ) -> Result<RecordOutcome, StoreError> {
        let path = self.history_path(url);
        let mut history = Self::load_history(&path);

        if new_content == old_content {
            debug!(%url, "Content unchanged, no diff recorded.");
            return Ok(RecordOutcome::NoChange);
        }

        history.push(DiffEntry {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            status: status.clone(),
            diff: diff_tokens(old_content, new_content),
        });

        let serialized = serde_json::to_string_pretty(&history)?;
        fs::write(&path, serialized).map_err(|e| StoreError::io(&path, e))?;
        info!(%url, path = ?path, entries = history.len(), "New version saved to history.");
        Ok(RecordOutcome::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::line_diff::reconstruct_new;

    #[test]
    fn safe_filename_replaces_special_characters() {
        let name = safe_filename("https://a.test/path\\x?q=1*2");
        assert_eq!(name, "https.__a.test_path_x-q=1-2");
        for c in [':', '/', '\\', '?', '*'] {
            assert!(!name.contains(c));
        }
    }

    #[test]
    fn safe_filename_truncates_to_200_chars() {
        let url = format!("https://a.test/{}?*\\:", "p/".repeat(300));
        let name = safe_filename(&url);
        assert_eq!(name.chars().count(), 200);
        assert!(!name.contains(['/', ':', '\\', '?', '*']));
    }

    #[test]
    fn safe_filename_limits_bytes_for_non_ascii_urls() {
        let url = format!("https://a.test/{}", "日本".repeat(200));
        let name = safe_filename(&url);
        assert!(name.len() <= 200);
        assert!(name.len() > 196);
        assert!(name.starts_with("https.__a.test_日本"));
    }

    #[test]
    fn non_ascii_history_path_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path());
        let url = format!("https://a.test/{}", "é".repeat(300));

        let outcome = store
            .record_if_changed(&url, &StatusOutcome::Code(200), "new", "")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Saved);
        assert_eq!(store.history(&url).len(), 1);
    }

    #[test]
    fn records_one_entry_per_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path());
        let url = "https://a.test";

        let outcome = store
            .record_if_changed(url, &StatusOutcome::Code(200), "a\nb\nc", "a\nc")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Saved);

        let history = store.history(url);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, StatusOutcome::Code(200));
        assert_eq!(reconstruct_new(&history[0].diff), vec!["a", "b", "c"]);
    }

    #[test]
    fn identical_content_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path());
        let url = "https://a.test";

        store
            .record_if_changed(url, &StatusOutcome::Code(200), "new", "old")
            .unwrap();
        let outcome = store
            .record_if_changed(url, &StatusOutcome::Code(200), "same", "same")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::NoChange);
        assert_eq!(store.history(url).len(), 1);
    }

    #[test]
    fn history_is_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path());
        let url = "https://a.test";

        store
            .record_if_changed(url, &StatusOutcome::Code(200), "v1", "")
            .unwrap();
        store
            .record_if_changed(url, &StatusOutcome::Code(500), "v2", "v1")
            .unwrap();

        let history = store.history(url);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].diff, vec!["+ v1".to_string()]);
        assert_eq!(history[1].status, StatusOutcome::Code(500));
        assert_eq!(reconstruct_new(&history[1].diff), vec!["v2"]);
    }

    #[test]
    fn corrupt_history_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path());
        let url = "https://a.test";
        fs::write(store.history_path(url), "{not json").unwrap();

        assert!(store.history(url).is_empty());
        store
            .record_if_changed(url, &StatusOutcome::Code(200), "x", "")
            .unwrap();
        assert_eq!(store.history(url).len(), 1);
    }

    #[test]
    fn history_file_name_is_derived_from_url() {
        let store = DiffStore::new("history");
        assert_eq!(
            store.history_path("http://a.test/x"),
            PathBuf::from("history/target_diffs_http.__a.test_x.json")
        );
    }

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiffStore::new(dir.path().join("nested/history"));
        store.ensure_dir().unwrap();
        assert!(dir.path().join("nested/history").is_dir());
    }
}
