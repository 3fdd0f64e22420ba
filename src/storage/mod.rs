//! Storage layer abstraction and implementations.
//!
//! This module defines the interface for persisting paper records grouped by
//! topic. The JSON implementation keeps one document per topic directory,
//! which is the layout existing caches already use.

pub mod json;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PaperRecord, StoredPaper, TopicDocument};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A topic document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The normalized topic cannot be used as a directory name
    #[error("Invalid topic {0:?}: it does not name a usable directory")]
    InvalidTopic(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A topic folder and the number of records it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSummary {
    /// Normalized topic name (the directory name)
    pub name: String,

    pub paper_count: usize,
}

/// Normalize a free-text topic into its directory name.
///
/// Lowercases the text and replaces spaces with underscores; all other
/// characters are kept as they are.
///
/// # Example
/// ```
/// use mcp_paper_cache::storage::normalize_topic;
///
/// assert_eq!(normalize_topic("Quantum Computing"), "quantum_computing");
/// ```
pub fn normalize_topic(topic: &str) -> String {
    topic.to_lowercase().replace(' ', "_")
}

/// Trait for paper storage backends.
///
/// Reads are forgiving: a missing or malformed topic document is treated as an
/// empty one and never reported as an error.
#[async_trait]
pub trait PaperStorage: Send + Sync {
    /// Check that `topic` can be stored, before any work is done for it.
    ///
    /// # Errors
    /// Returns `StorageError::InvalidTopic` if the topic has no usable key
    fn check_topic(&self, _topic: &str) -> StorageResult<()> {
        Ok(())
    }

    /// Merge papers into a topic's document, overwriting entries by id.
    ///
    /// Creates the topic on first use. Entries already stored under other ids
    /// are kept as they are.
    ///
    /// # Arguments
    /// * `topic` - Free-text topic; its folder name starts from `normalize_topic`
    /// * `papers` - Records to upsert, keyed by their `id`
    ///
    /// # Returns
    /// The number of records in the topic document after the merge
    ///
    /// # Errors
    /// Returns `StorageError` if the topic is unusable or the document cannot
    /// be written
    async fn upsert_papers(&self, topic: &str, papers: &[PaperRecord]) -> StorageResult<usize>;

    /// Load a topic's document; empty when absent or malformed.
    async fn load_topic(&self, topic: &str) -> StorageResult<TopicDocument>;

    /// Find a paper in any topic; the first topic holding the id wins.
    ///
    /// # Errors
    /// Returns `StorageError::Io` only if the store root itself cannot be listed
    async fn find_paper(&self, paper_id: &str) -> StorageResult<Option<StoredPaper>>;

    /// List all topic folders.
    async fn list_topics(&self) -> StorageResult<Vec<TopicSummary>>;
}
