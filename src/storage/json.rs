//! JSON file storage implementation.
//!
//! Layout: `<root>/<topic key>/papers_info.json`, each file a pretty-printed
//! JSON object mapping paper id to entry. Entries are merged as raw JSON, so
//! fields written by other tools are carried over unchanged. Writes go through
//! a temporary file and a rename so a crash never leaves a half-written
//! document behind. A per-topic lock serializes the load-merge-write cycle.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{normalize_topic, PaperStorage, StorageError, StorageResult, TopicSummary};
use crate::models::{PaperRecord, StoredPaper, TopicDocument};

/// File name of the per-topic document.
pub const PAPERS_FILE: &str = "papers_info.json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Topic-folder storage backed by JSON documents.
pub struct JsonTopicStorage {
    /// Store root (`papers/` by default)
    root: PathBuf,

    /// Locks of the topics currently being written
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl JsonTopicStorage {
    /// Create a storage rooted at `root`. Nothing is created on disk until
    /// the first upsert.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document for a free-text topic.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidTopic` if the topic key is empty or a
    /// relative directory name (`.`/`..`)
    pub fn topic_path(&self, topic: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(topic_key(topic)?).join(PAPERS_FILE))
    }

    async fn topic_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Forget a topic lock once no other writer holds or waits on it.
    async fn release_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Sorted names of the directories directly under the root.
    async fn topic_dirs(&self) -> StorageResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.root, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.root, e))?
        {
            let is_dir = fs::metadata(entry.path())
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn merge_into(&self, key: &str, papers: &[PaperRecord]) -> StorageResult<usize> {
        let dir = self.root.join(key);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let path = dir.join(PAPERS_FILE);
        let mut document = read_document(&path).await.unwrap_or_default();
        for paper in papers {
            document.insert(paper.id.clone(), serde_json::to_value(paper)?);
        }

        write_document(&path, &document).await?;
        info!(
            "Stored {} papers under topic '{}' ({} total)",
            papers.len(),
            key,
            document.len()
        );
        Ok(document.len())
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[async_trait]
impl PaperStorage for JsonTopicStorage {
    fn check_topic(&self, topic: &str) -> StorageResult<()> {
        topic_key(topic).map(|_| ())
    }

    async fn upsert_papers(&self, topic: &str, papers: &[PaperRecord]) -> StorageResult<usize> {
        let key = topic_key(topic)?;
        let lock = self.topic_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.merge_into(&key, papers).await
        };
        self.release_lock(&key, lock).await;
        result
    }

    async fn load_topic(&self, topic: &str) -> StorageResult<TopicDocument> {
        let path = self.topic_path(topic)?;
        Ok(read_document(&path).await.unwrap_or_default())
    }

    async fn find_paper(&self, paper_id: &str) -> StorageResult<Option<StoredPaper>> {
        for name in self.topic_dirs().await? {
            let path = self.root.join(&name).join(PAPERS_FILE);
            let Some(mut document) = read_document(&path).await else {
                continue;
            };
            if let Some(value) = document.remove(paper_id) {
                debug!("Found paper {} under topic '{}'", paper_id, name);
                return Ok(Some(StoredPaper {
                    id: paper_id.to_string(),
                    value,
                }));
            }
        }
        Ok(None)
    }

    async fn list_topics(&self) -> StorageResult<Vec<TopicSummary>> {
        let mut topics = Vec::new();
        for name in self.topic_dirs().await? {
            let path = self.root.join(&name).join(PAPERS_FILE);
            let paper_count = read_document(&path).await.map(|d| d.len()).unwrap_or(0);
            topics.push(TopicSummary { name, paper_count });
        }
        Ok(topics)
    }
}

/// Directory name for a topic: the normalized topic with path separators
/// turned into underscores, so every topic maps to one folder under the root.
///
/// # Errors
/// Returns `StorageError::InvalidTopic` for an empty key, `.` or `..`
pub fn topic_key(topic: &str) -> StorageResult<String> {
    let key = normalize_topic(topic).replace(|c: char| c == '/' || c == '\\', "_");
    if key.is_empty() || key == "." || key == ".." {
        return Err(StorageError::InvalidTopic(key));
    }
    Ok(key)
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a topic document, or `None` if it is missing, unreadable or not a
/// JSON object.
async fn read_document(path: &Path) -> Option<TopicDocument> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            debug!("Skipping unreadable document {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(document)) => Some(document),
        Ok(_) => {
            warn!("Ignoring non-object document {}", path.display());
            None
        }
        Err(e) => {
            warn!("Ignoring malformed document {}: {}", path.display(), e);
            None
        }
    }
}

/// Sibling temp path, unique per process and per write.
fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{}.{}.{}.tmp", PAPERS_FILE, std::process::id(), seq))
}

/// Write a document through a sibling temp file and rename it into place.
async fn write_document(path: &Path, document: &TopicDocument) -> StorageResult<()> {
    let text = serde_json::to_string_pretty(document)?;
    let tmp = temp_path(path);

    fs::write(&tmp, text.as_bytes())
        .await
        .map_err(|e| io_error(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_error(path, e));
    }
    Ok(())
}
