//! Literature retrieval sources.
//!
//! This module defines the [`Retriever`] trait that all sources implement.
//! New sources are added by implementing the trait and registering them with
//! the [`RetrieverRegistry`]. Retrieval failures never abort a run: each
//! source either returns items or a [`SourceError`] the pipeline records.

mod arxiv;
pub mod mock;
mod registry;
mod translate;

pub use arxiv::ArxivRetriever;
pub use mock::MockRetriever;
pub use registry::RetrieverRegistry;
pub use translate::normalize_topic;

use async_trait::async_trait;

use crate::models::LiteratureItem;

/// Parameters for one search against a source
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Normalized research topic
    pub topic: String,

    /// Maximum number of results to request
    pub max_results: usize,

    /// Optional inclusive publication-year range
    pub year_range: Option<(i32, i32)>,
}

impl SearchQuery {
    /// Create a query for a topic with a result cap
    pub fn new(topic: impl Into<String>, max_results: usize) -> Self {
        Self {
            topic: topic.into(),
            max_results,
            year_range: None,
        }
    }

    /// Restrict to an inclusive year range
    pub fn year_range(mut self, start: i32, end: i32) -> Self {
        self.year_range = Some((start, end));
        self
    }
}

/// Interface implemented by every literature source.
///
/// Implementations must be safe to call concurrently and must map transport
/// failures to [`SourceError`] rather than panicking.
#[async_trait]
pub trait Retriever: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "arxiv")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for items matching the query
    async fn search(&self, query: &SearchQuery) -> Result<Vec<LiteratureItem>, SourceError>;
}

/// Errors that can occur when querying a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Response could not be parsed (XML, JSON, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// API-level error reported by the source
    #[error("API error: {0}")]
    Api(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// The request did not complete within the per-source deadline
    #[error("Source request timed out")]
    Timeout,

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A requested source id is not registered
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
