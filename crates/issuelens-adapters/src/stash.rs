//! Persisted client-side state.
//!
//! The last successful analysis is kept under a fixed key in a string
//! key-value store so the results views can pick it up later. Stores are
//! injectable: [`FileStore`] backs the CLI, [`MemoryStore`] backs tests.
//!
//! The stored payload is not versioned. When the analysis schema changes,
//! an older payload simply fails to parse and is reported as
//! [`StashError::Corrupt`].

use chrono::{DateTime, Utc};
use fs2::FileExt;
use issuelens_core::protocol::{AnalysisRecord, AnalyzedIssue};
use issuelens_core::tree::FlatFile;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Key holding the last analysis and its flattened files.
pub const ANALYSIS_KEY: &str = "analysis_data";

const LOCK_TIMEOUT_SECS: u64 = 5;
const LOCK_RETRY_MS: u64 = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("Timed out waiting for state lock ({0}s)")]
    LockTimeout(u64),
}

/// String key-value storage with get/set/clear semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        (**self).clear(key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one string value per key.
///
/// Access is serialized across processes with an advisory lock on a sibling
/// `.lock` file; writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

struct StoreLock {
    file: fs::File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self, exclusive: bool) -> Result<StoreLock, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = self.path.with_extension("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        let start = Instant::now();
        loop {
            let result = if exclusive {
                FileExt::try_lock_exclusive(&file)
            } else {
                FileExt::try_lock_shared(&file)
            };
            match result {
                Ok(()) => break,
                Err(err) => {
                    if err.kind() != ErrorKind::WouldBlock {
                        return Err(err.into());
                    }
                    if start.elapsed() >= Duration::from_secs(LOCK_TIMEOUT_SECS) {
                        return Err(StoreError::LockTimeout(LOCK_TIMEOUT_SECS));
                    }
                    std::thread::sleep(Duration::from_millis(LOCK_RETRY_MS));
                }
            }
        }

        Ok(StoreLock { file })
    }

    fn read_map(&self) -> Result<JsonMap<String, Value>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<Value>(&contents)? {
                Value::Object(map) => Ok(map),
                _ => Ok(JsonMap::new()),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(JsonMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Current map for a read-modify-write. An unreadable file is moved
    /// aside to `*.corrupt` so the write can start over.
    fn read_map_for_update(&self) -> Result<JsonMap<String, Value>, StoreError> {
        match self.read_map() {
            Err(StoreError::Json(err)) => {
                let corrupt_path = self.path.with_extension("json.corrupt");
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file was corrupted; moving it aside"
                );
                let _ = fs::rename(&self.path, corrupt_path);
                Ok(JsonMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: JsonMap<String, Value>) -> Result<(), StoreError> {
        let payload = serde_json::to_string_pretty(&Value::Object(map))?;
        write_atomic(&self.path, &payload)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let _lock = self.lock(false)?;
        let map = self.read_map()?;
        Ok(map.get(key).map(value_to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _lock = self.lock(true)?;
        let mut map = self.read_map_for_update()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.write_map(map)
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let _lock = self.lock(true)?;
        let mut map = self.read_map_for_update()?;
        if map.remove(key).is_some() {
            self.write_map(map)?;
        }
        Ok(())
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600));
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum StashError {
    #[error("No analysis has been saved yet")]
    Missing,
    #[error("Saved analysis could not be read: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
    #[error("Saving the analysis was interrupted: {0}")]
    Interrupted(String),
}

/// The last analysis, as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedAnalysis {
    pub issue: AnalyzedIssue,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StashedAnalysisRef<'a> {
    saved_at: DateTime<Utc>,
    analysis: &'a AnalysisRecord,
    flattened_files: &'a [FlatFile],
}

#[derive(Deserialize)]
struct StashedAnalysis {
    saved_at: DateTime<Utc>,
    analysis: AnalysisRecord,
    flattened_files: Vec<FlatFile>,
}

/// Typed access to the last analysis in a [`KeyValueStore`].
#[derive(Debug)]
pub struct AnalysisStash<S> {
    store: S,
}

impl<S: KeyValueStore> AnalysisStash<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Replace the stored analysis.
    pub fn save(&self, issue: &AnalyzedIssue) -> Result<(), StashError> {
        let stashed = StashedAnalysisRef {
            saved_at: Utc::now(),
            analysis: &issue.analysis,
            flattened_files: &issue.flattened_files,
        };
        let payload = serde_json::to_string(&stashed).map_err(StoreError::from)?;
        self.store.set(ANALYSIS_KEY, &payload)?;
        Ok(())
    }

    pub fn load(&self) -> Result<SavedAnalysis, StashError> {
        let payload = self.store.get(ANALYSIS_KEY)?.ok_or(StashError::Missing)?;
        let stashed: StashedAnalysis =
            serde_json::from_str(&payload).map_err(StashError::Corrupt)?;
        Ok(SavedAnalysis {
            issue: AnalyzedIssue {
                analysis: stashed.analysis,
                flattened_files: stashed.flattened_files,
            },
            saved_at: stashed.saved_at,
        })
    }

    pub fn clear(&self) -> Result<(), StashError> {
        self.store.clear(ANALYSIS_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuelens_core::protocol::{Analysis, FileNode, FileTree, IssueSummary};

    fn sample_issue(title: &str) -> AnalyzedIssue {
        let mut src = FileTree::new();
        src.insert("main.go".to_string(), FileNode::file("entry point"));
        let mut root = FileTree::new();
        root.insert("src".to_string(), FileNode::directory(src));
        AnalyzedIssue::from(AnalysisRecord {
            issue_summary: IssueSummary {
                title: title.to_string(),
                ..IssueSummary::default()
            },
            project_context: None,
            relevant_files: root,
            build_and_test: None,
            analysis: Analysis::default(),
        })
    }

    #[test]
    fn test_memory_store_get_set_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.clear("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        FileStore::new(&path).set("a", "1").unwrap();
        FileStore::new(&path).set("b", "2").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));

        store.clear("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state.json"));
        assert_eq!(store.get(ANALYSIS_KEY).unwrap(), None);
        store.clear(ANALYSIS_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_recovers_from_corrupt_file_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{oops").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("k"), Err(StoreError::Json(_))));

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        assert!(dir.path().join("state.json.corrupt").exists());
    }

    #[test]
    fn test_stash_round_trip() {
        let stash = AnalysisStash::new(MemoryStore::new());
        let issue = sample_issue("Crash on start");
        let before = Utc::now();
        stash.save(&issue).unwrap();

        let saved = stash.load().unwrap();
        assert_eq!(saved.issue, issue);
        assert_eq!(saved.issue.flattened_files[0].path, "src/main.go");
        assert!(saved.saved_at >= before);
    }

    #[test]
    fn test_stash_save_overwrites_previous() {
        let stash = AnalysisStash::new(MemoryStore::new());
        stash.save(&sample_issue("first")).unwrap();
        stash.save(&sample_issue("second")).unwrap();
        assert_eq!(stash.load().unwrap().issue.analysis.issue_summary.title, "second");
    }

    #[test]
    fn test_stash_missing_and_corrupt() {
        let store = MemoryStore::new();
        let stash = AnalysisStash::new(&store);
        assert!(matches!(stash.load(), Err(StashError::Missing)));

        store.set(ANALYSIS_KEY, r#"{"analysis": "old shape"}"#).unwrap();
        assert!(matches!(stash.load(), Err(StashError::Corrupt(_))));

        stash.clear().unwrap();
        assert!(matches!(stash.load(), Err(StashError::Missing)));
    }

    #[test]
    fn test_stash_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let stash = AnalysisStash::new(FileStore::new(dir.path().join("state.json")));
        let issue = sample_issue("on disk");
        stash.save(&issue).unwrap();

        let reopened = AnalysisStash::new(FileStore::new(dir.path().join("state.json")));
        assert_eq!(reopened.load().unwrap().issue, issue);
    }
}
