//! MCP Paper Cache - arXiv search with a per-topic JSON cache.
//!
//! This library provides the core functionality behind the `research` MCP
//! server, which lets an agent search arXiv by topic, read back the metadata
//! of papers it found, and produce citations for them.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (PaperRecord, CitationBundle)
//! - **provider**: Search backends (arXiv Atom API)
//! - **storage**: Topic-folder persistence (`papers/<topic>/papers_info.json`)
//! - **citation**: APA, MLA and BibTeX formatting
//! - **service**: The three operations, tying provider and storage together
//! - **server**: MCP server over stdio
//! - **config**: Defaults and environment overrides
//!
//! # Workflow
//!
//! ## Search
//!
//! 1. Normalize the topic into a folder name
//! 2. Query arXiv by relevance
//! 3. Merge the results into the topic's JSON document
//! 4. Return the paper identifiers in ranking order
//!
//! ## Lookup and citation
//!
//! 1. Scan every topic folder for the identifier
//! 2. For citations, fall back to a direct arXiv lookup
//! 3. Render the record or the citation bundle as JSON
//!
//! # Example
//!
//! ```ignore
//! use mcp_paper_cache::{
//!     provider::arxiv::{ArxivConfig, ArxivProvider},
//!     service::PaperCacheService,
//!     storage::json::JsonTopicStorage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = ArxivProvider::new(ArxivConfig::default())?;
//!     let storage = JsonTopicStorage::new("papers");
//!     let service = PaperCacheService::new(provider, storage);
//!
//!     let ids = service.search("quantum computing", 3).await?;
//!     for id in ids {
//!         println!("{}", service.get_citations(&id).await?.to_message()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod citation;
pub mod config;
pub mod models;
pub mod provider;
pub mod server;
pub mod service;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use models::{CitationBundle, Citations, PaperRecord, StoredPaper, TopicDocument};
pub use provider::{PaperProvider, SearchCriteria};
pub use service::{CitationOutcome, LookupOutcome, PaperCacheService};
pub use storage::{normalize_topic, PaperStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default cache root, relative to the working directory
pub const DEFAULT_PAPER_DIR: &str = "papers";
