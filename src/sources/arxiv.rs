//! arXiv retrieval source.

use async_trait::async_trait;
use feed_rs::parser;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{ItemBuilder, ItemSource, LiteratureItem};
use crate::sources::{normalize_topic, Retriever, SearchQuery, SourceError};
use crate::utils::{api_retry_config, with_retry, HttpClient};

/// Base URL for the arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
/// arXiv caps a single request at 200 results
const ARXIV_MAX_RESULTS: usize = 200;
/// Deadline for one whole search call, retries included
const SEARCH_TIMEOUT: Duration = Duration::from_secs(45);

/// arXiv retriever backed by the public Atom export API.
#[derive(Debug, Clone)]
pub struct ArxivRetriever {
    client: Arc<HttpClient>,
    api_url: String,
    search_timeout: Duration,
}

impl ArxivRetriever {
    /// Create a new arXiv retriever
    pub fn new() -> Self {
        Self {
            client: Arc::new(HttpClient::new()),
            api_url: ARXIV_API_URL.to_string(),
            search_timeout: SEARCH_TIMEOUT,
        }
    }

    /// Create against a custom endpoint and deadline (tests)
    #[cfg(test)]
    fn with_endpoint(url: &str, search_timeout: Duration) -> Self {
        Self {
            client: Arc::new(HttpClient::new()),
            api_url: url.to_string(),
            search_timeout,
        }
    }

    /// Parse a bare arXiv id from various formats
    ///
    /// Handles:
    /// - "2301.12345"
    /// - "2301.12345v1" (version is stripped)
    /// - "arxiv:2301.12345"
    /// - "https://arxiv.org/abs/2301.12345v1"
    pub fn parse_id(id: &str) -> Result<String, SourceError> {
        let id = id.trim().to_lowercase();

        if let Some(abs_pos) = id.find("/abs/") {
            let after = &id[abs_pos + 5..];
            let id = after.split('/').next().unwrap_or(after);
            return Ok(id.split('v').next().unwrap_or(id).to_string());
        }

        let id = id.strip_prefix("arxiv:").unwrap_or(&id);
        let id = id.split('v').next().unwrap_or(id);

        if id.is_empty() {
            return Err(SourceError::InvalidRequest("Empty arXiv ID".to_string()));
        }

        Ok(id.to_string())
    }

    /// Build the arXiv `search_query` parameter
    fn build_search_query(query: &SearchQuery) -> String {
        let mut parts = Vec::new();

        if !query.topic.is_empty() {
            parts.push(format!("all:{}", query.topic));
        }

        // arXiv filters on submitted date, the closest proxy for year
        if let Some((start, end)) = query.year_range {
            parts.push(format!("submitted_date:[{}0101 TO {}1231]", start, end));
        }

        if parts.is_empty() {
            "all:*".to_string()
        } else {
            parts.join(" AND ")
        }
    }

    /// Convert one Atom entry into a literature item
    fn parse_entry(entry: &feed_rs::model::Entry) -> Result<LiteratureItem, SourceError> {
        let arxiv_id = entry
            .id
            .rsplit("/abs/")
            .next()
            .and_then(|s| s.split('v').next())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::Parse("Missing entry id".to_string()))?
            .to_string();

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        let authors: Vec<String> = entry.authors.iter().map(|a| a.name.clone()).collect();

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .filter(|s| !s.is_empty());

        let categories: Vec<String> = entry
            .categories
            .iter()
            .map(|c| c.term.clone())
            .collect();

        let mut builder = ItemBuilder::new(
            format!("arxiv:{}", arxiv_id),
            title,
            entry.id.clone(),
            ItemSource::Arxiv,
        )
        .authors(authors)
        .external_id(arxiv_id.clone())
        .pdf_url(format!("{}/{}.pdf", ARXIV_PDF_URL, arxiv_id))
        .categories(categories);

        if let Some(text) = abstract_text {
            builder = builder.abstract_text(text);
        }
        if let Some(published) = entry.published {
            builder = builder.publication_date(published.date_naive());
        }

        Ok(builder.build())
    }
}

impl Default for ArxivRetriever {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Retriever for ArxivRetriever {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<LiteratureItem>, SourceError> {
        let mut query = query.clone();
        query.topic = normalize_topic(&query.topic);

        let search_query = Self::build_search_query(&query);
        let max_results = query.max_results.min(ARXIV_MAX_RESULTS);

        let url = format!(
            "{}?search_query={}&max_results={}&sortBy=relevance&sortOrder=descending",
            self.api_url,
            urlencoding::encode(&search_query),
            max_results,
        );

        tracing::debug!(source = "arxiv", %url, "searching");

        let client = Arc::clone(&self.client);
        let fetch = with_retry(api_retry_config(), || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let response = client
                    .client()
                    .get(&url)
                    .header("Accept", "application/atom+xml")
                    .send()
                    .await?;

                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(SourceError::RateLimit);
                }
                if !response.status().is_success() {
                    return Err(SourceError::Api(format!(
                        "arXiv API returned status: {}",
                        response.status()
                    )));
                }

                let bytes = response.bytes().await?;

                parser::parse(bytes.as_ref())
                    .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))
            }
        });

        // One deadline bounds the whole call, retries and backoff included
        let feed = tokio::time::timeout(self.search_timeout, fetch)
            .await
            .map_err(|_| SourceError::Timeout)??;

        let items: Result<Vec<LiteratureItem>, SourceError> =
            feed.entries.iter().map(Self::parse_entry).collect();
        let mut items = items?;

        // The submitted-date filter is a proxy; re-check publication year locally
        if let Some((start, end)) = query.year_range {
            items.retain(|item| match item.year() {
                Some(year) => year >= start && year <= end,
                None => true,
            });
        }

        tracing::info!(source = "arxiv", count = items.len(), "search complete");
        Ok(items)
    }
}
