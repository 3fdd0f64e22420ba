//! Paper provider module.
//!
//! This module defines the interface for sourcing paper metadata from an
//! external search backend and includes the arXiv implementation.
//!
//! The `PaperProvider` trait abstracts the backend so the cache service can be
//! exercised against mocks in tests and against the live arXiv API in
//! production.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PaperRecord;

pub mod arxiv;

/// Errors that can occur when fetching papers from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Failed to parse the response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backend reported an error for the request
    #[error("API error: {0}")]
    Api(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Field used to rank search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

/// Direction of the ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Free-text search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Free-text query
    pub query: String,

    /// Maximum number of results to return
    pub max_results: usize,

    pub sort_by: SortBy,

    pub sort_order: SortOrder,
}

impl SearchCriteria {
    /// Relevance-ranked, descending search for up to `max_results` matches.
    ///
    /// # Arguments
    /// * `query` - The search text
    /// * `max_results` - Result count limit
    pub fn relevance(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            sort_by: SortBy::Relevance,
            sort_order: SortOrder::Descending,
        }
    }
}

/// Trait for sourcing paper metadata from a search backend.
///
/// Implementations return fully populated `PaperRecord`s (identifier included)
/// in the order the backend ranked them.
#[async_trait]
pub trait PaperProvider: Send + Sync {
    /// Run a free-text search.
    ///
    /// # Arguments
    /// * `criteria` - Query text, result limit and ranking
    ///
    /// # Returns
    /// Matching papers in backend ranking order
    ///
    /// # Errors
    /// Returns `ProviderError` if the backend cannot be reached or its answer
    /// cannot be parsed
    async fn search(&self, criteria: &SearchCriteria) -> ProviderResult<Vec<PaperRecord>>;

    /// Look papers up directly by canonical identifier.
    ///
    /// Unknown identifiers are simply absent from the result.
    ///
    /// # Errors
    /// Returns `ProviderError` on transport, parse or backend errors
    async fn fetch_by_ids(&self, ids: &[String]) -> ProviderResult<Vec<PaperRecord>>;

    /// Get a human-readable name of this provider, for logging.
    fn name(&self) -> &str;
}
