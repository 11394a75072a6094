//! Full-text enrichment stage.
//!
//! Downloads each item's PDF and attaches the extracted text. Extraction
//! failures are recorded per item and never fail the stage; an item without
//! a document URL is skipped silently.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::models::{LiteratureItem, Stage, StageError};
use crate::utils::HttpClient;

/// Errors raised while fetching or extracting one document
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document could not be downloaded
    #[error("Download failed: {0}")]
    Download(String),

    /// The document was downloaded but text extraction failed
    #[error("Text extraction failed: {0}")]
    Extraction(String),

    /// Extraction succeeded but produced no text (scanned/image PDF)
    #[error("Document contains no extractable text")]
    EmptyText,

    /// The per-document deadline expired
    #[error("Extraction timed out")]
    Timeout,
}

/// Fetches a document and returns its plain text.
#[async_trait::async_trait]
pub trait FullTextExtractor: Send + Sync + std::fmt::Debug {
    async fn extract(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError>;
}

/// Production extractor: download to a tempfile, extract off the runtime.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    client: HttpClient,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
        }
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<tempfile::NamedTempFile, ExtractionError> {
        let response = self
            .client
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ExtractionError::Download(format!(
                "status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExtractionError::Download(e.to_string()))?;

        let mut file = tempfile::NamedTempFile::new()
            .map_err(|e| ExtractionError::Download(format!("tempfile: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| ExtractionError::Download(format!("tempfile write: {}", e)))?;

        Ok(file)
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FullTextExtractor for PdfExtractor {
    async fn extract(&self, url: &str, timeout: Duration) -> Result<String, ExtractionError> {
        let work = async {
            let file = self.download(url).await?;

            // pdf-extract is synchronous and can be slow on large documents
            let path = file.path().to_path_buf();
            let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path))
                .await
                .map_err(|e| ExtractionError::Extraction(format!("task join: {}", e)))?
                .map_err(|e| ExtractionError::Extraction(e.to_string()))?;

            drop(file);

            if text.trim().is_empty() {
                return Err(ExtractionError::EmptyText);
            }
            Ok(text)
        };

        tokio::time::timeout(timeout, work)
            .await
            .map_err(|_| ExtractionError::Timeout)?
    }
}

/// Bounded-concurrency enrichment over a batch of items.
#[derive(Debug)]
pub struct EnrichmentStage {
    extractor: Arc<dyn FullTextExtractor>,
    concurrency: usize,
    per_item_timeout: Duration,
}

impl EnrichmentStage {
    pub fn new(
        extractor: Arc<dyn FullTextExtractor>,
        concurrency: usize,
        per_item_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            concurrency: concurrency.max(1),
            per_item_timeout,
        }
    }

    /// Attach full text to every item with a document URL.
    ///
    /// Items are returned in their input order. Work still in flight at the
    /// deadline is abandoned; affected items keep whatever they had.
    pub async fn run(
        &self,
        items: &mut [LiteratureItem],
        deadline: Instant,
    ) -> Vec<StageError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(String, Result<String, ExtractionError>)> = JoinSet::new();

        for item in items.iter() {
            let Some(pdf_url) = item.pdf_url.clone() else {
                continue;
            };
            if item.full_text.is_some() {
                continue;
            }

            let id = item.id.clone();
            let extractor = Arc::clone(&self.extractor);
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.per_item_timeout;

            tasks.spawn(async move {
                // Closed only when the stage is dropped at the deadline
                let _permit = semaphore.acquire_owned().await;
                let result = extractor.extract(&pdf_url, timeout).await;
                (id, result)
            });
        }

        let mut errors = Vec::new();

        loop {
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(pending = tasks.len(), "enrichment deadline reached, aborting remaining tasks");
                    tasks.abort_all();
                    break;
                }
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((id, Ok(text))) => {
                    if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                        tracing::debug!(%id, chars = text.len(), "full text attached");
                        item.full_text = Some(text);
                    }
                }
                Ok((id, Err(err))) => {
                    tracing::warn!(%id, %err, "full-text extraction failed");
                    errors.push(StageError::new(id, Stage::Enriching, err));
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    errors.push(StageError::new("enrichment", Stage::Enriching, join_err));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_item;

    /// Extractor returning canned text or a canned failure per URL suffix.
    #[derive(Debug, Default)]
    struct FakeExtractor {
        delay: Option<Duration>,
    }

    #[async_trait::async_trait]
    impl FullTextExtractor for FakeExtractor {
        async fn extract(&self, url: &str, _timeout: Duration) -> Result<String, ExtractionError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if url.ends_with("bad.pdf") {
                return Err(ExtractionError::Download("404".to_string()));
            }
            if url.ends_with("empty.pdf") {
                return Err(ExtractionError::EmptyText);
            }
            Ok(format!("full text of {}", url))
        }
    }

    fn stage(extractor: FakeExtractor) -> EnrichmentStage {
        EnrichmentStage::new(Arc::new(extractor), 2, Duration::from_secs(5))
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn test_enrichment_attaches_text() {
        let mut items = vec![make_item("1", "One"), make_item("2", "Two")];
        items[0].pdf_url = Some("http://example.com/1.pdf".to_string());
        items[1].pdf_url = Some("http://example.com/2.pdf".to_string());

        let errors = stage(FakeExtractor::default())
            .run(&mut items, far_deadline())
            .await;

        assert!(errors.is_empty());
        assert!(items[0].full_text.as_deref().unwrap().contains("1.pdf"));
        assert!(items[1].full_text.as_deref().unwrap().contains("2.pdf"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let mut items = vec![make_item("1", "One"), make_item("2", "Two")];
        items[0].pdf_url = Some("http://example.com/bad.pdf".to_string());
        items[1].pdf_url = Some("http://example.com/good.pdf".to_string());

        let errors = stage(FakeExtractor::default())
            .run(&mut items, far_deadline())
            .await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].item_id, "mock:1");
        assert_eq!(errors[0].stage, Stage::Enriching);
        assert!(items[0].full_text.is_none());
        assert!(items[1].full_text.is_some());
    }

    #[tokio::test]
    async fn test_items_without_documents_skipped() {
        let mut items = vec![make_item("1", "One")];

        let errors = stage(FakeExtractor::default())
            .run(&mut items, far_deadline())
            .await;

        assert!(errors.is_empty());
        assert!(items[0].full_text.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_abandons_inflight_work() {
        let mut items = vec![make_item("1", "One")];
        items[0].pdf_url = Some("http://example.com/1.pdf".to_string());

        let slow = FakeExtractor {
            delay: Some(Duration::from_secs(30)),
        };
        let deadline = Instant::now() + Duration::from_secs(1);
        let errors = stage(slow).run(&mut items, deadline).await;

        // Aborted work leaves no text and no recorded error for the item
        assert!(items[0].full_text.is_none());
        assert!(errors.is_empty());
    }
}
