//! Paper cache service.
//!
//! Orchestrates the three operations exposed to clients:
//!
//! - `search`: query the provider, merge the results into the topic store and
//!   return the identifiers in ranking order;
//! - `extract_info`: look a paper up across every cached topic;
//! - `get_citations`: look a paper up (falling back to the provider) and
//!   format its citations.
//!
//! Expected misses are not errors. They come back as outcome variants that
//! carry the message shown to clients.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::citation;
use crate::models::{CitationBundle, StoredPaper};
use crate::provider::{PaperProvider, ProviderError, SearchCriteria};
use crate::storage::{PaperStorage, StorageError};

/// Default number of results for a search.
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Errors that abort a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The cached entry, exactly as stored
    Found(StoredPaper),
    NotFound { paper_id: String },
}

impl LookupOutcome {
    /// Text shown to clients: the stored entry as indented JSON, or the miss
    /// message.
    pub fn to_message(&self) -> ServiceResult<String> {
        match self {
            LookupOutcome::Found(paper) => Ok(serde_json::to_string_pretty(&paper.value)?),
            LookupOutcome::NotFound { paper_id } => Ok(format!(
                "There's no saved information related to paper {}.",
                paper_id
            )),
        }
    }
}

/// Result of a citation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationOutcome {
    Citations(CitationBundle),

    /// Neither cached nor known to the provider
    NotFound { paper_id: String },

    /// The provider lookup failed
    FetchError { paper_id: String, message: String },
}

impl CitationOutcome {
    /// Text shown to clients: the bundle as indented JSON, or a message.
    pub fn to_message(&self) -> ServiceResult<String> {
        match self {
            CitationOutcome::Citations(bundle) => Ok(serde_json::to_string_pretty(bundle)?),
            CitationOutcome::NotFound { paper_id } => {
                Ok(format!("Paper with ID {} not found on arXiv.", paper_id))
            }
            CitationOutcome::FetchError { paper_id, message } => Ok(format!(
                "Error fetching paper {} from arXiv: {}",
                paper_id, message
            )),
        }
    }
}

/// The paper cache: a search provider in front of a topic store.
pub struct PaperCacheService<P, S>
where
    P: PaperProvider,
    S: PaperStorage,
{
    provider: P,
    storage: S,
}

impl<P, S> PaperCacheService<P, S>
where
    P: PaperProvider,
    S: PaperStorage,
{
    pub fn new(provider: P, storage: S) -> Self {
        Self { provider, storage }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Search the provider for `topic` and cache the results.
    ///
    /// # Arguments
    /// * `topic` - Free-text topic; also names the cache folder
    /// * `max_results` - Maximum number of papers to fetch
    ///
    /// # Returns
    /// Paper identifiers in the provider's relevance order
    ///
    /// # Errors
    /// Returns `ServiceError::InvalidInput` for a blank topic or a zero limit,
    /// `ServiceError::Storage` for a topic the store cannot hold (checked before
    /// the provider is called), and propagates provider and storage failures
    pub async fn search(&self, topic: &str, max_results: usize) -> ServiceResult<Vec<String>> {
        if topic.trim().is_empty() {
            return Err(ServiceError::InvalidInput("topic must not be empty".to_string()));
        }
        if max_results == 0 {
            return Err(ServiceError::InvalidInput(
                "max_results must be a positive integer".to_string(),
            ));
        }

        self.storage.check_topic(topic)?;

        let criteria = SearchCriteria::relevance(topic, max_results);
        let papers = self.provider.search(&criteria).await?;
        info!(
            "{} returned {} papers for topic {:?}",
            self.provider.name(),
            papers.len(),
            topic
        );

        self.storage.upsert_papers(topic, &papers).await?;

        Ok(papers.into_iter().map(|p| p.id).collect())
    }

    /// Look a paper up in the cache.
    ///
    /// # Errors
    /// Returns `ServiceError::Storage` only if the cache root cannot be listed
    pub async fn extract_info(&self, paper_id: &str) -> ServiceResult<LookupOutcome> {
        match self.storage.find_paper(paper_id).await? {
            Some(paper) => Ok(LookupOutcome::Found(paper)),
            None => {
                debug!("Paper {} is not cached", paper_id);
                Ok(LookupOutcome::NotFound {
                    paper_id: paper_id.to_string(),
                })
            }
        }
    }

    /// Format citations for a paper, fetching it from the provider when it is
    /// not cached. Fetched papers are not added to the cache.
    ///
    /// # Errors
    /// Returns `ServiceError::Storage` only if the cache root cannot be listed;
    /// provider failures are reported as `CitationOutcome::FetchError`
    pub async fn get_citations(&self, paper_id: &str) -> ServiceResult<CitationOutcome> {
        let record = match self.storage.find_paper(paper_id).await? {
            Some(paper) => paper.record(),
            None => {
                debug!("Paper {} is not cached, asking {}", paper_id, self.provider.name());
                match self.provider.fetch_by_ids(&[paper_id.to_string()]).await {
                    Ok(papers) => match papers.into_iter().next() {
                        Some(record) => record,
                        None => {
                            return Ok(CitationOutcome::NotFound {
                                paper_id: paper_id.to_string(),
                            })
                        }
                    },
                    Err(e) => {
                        warn!("Failed to fetch paper {}: {}", paper_id, e);
                        return Ok(CitationOutcome::FetchError {
                            paper_id: paper_id.to_string(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        };

        Ok(CitationOutcome::Citations(citation::bundle(paper_id, &record)))
    }
}
