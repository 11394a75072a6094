//! Pipeline orchestration.
//!
//! Drives one review run through its stages in order: retrieval, dedup,
//! enrichment, analysis, report compilation. Every stage observes the shared
//! run deadline; on expiry the run returns whatever completed, with a timeout
//! notice recorded. Per-item failures never fail the run.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;

use crate::analysis::{AnalysisStage, ReportGenerator, SUMMARY_FAILED_NOTICE};
use crate::config::{Config, PipelineConfig};
use crate::enrich::{EnrichmentStage, FullTextExtractor, PdfExtractor};
use crate::llm::{LlmError, LlmGateway};
use crate::models::{PipelineResult, ReviewRequest, RunCounts, Stage, StageError};
use crate::sources::{normalize_topic, RetrieverRegistry, SearchQuery};
use crate::store::{ItemRecord, VectorStore};
use crate::utils::deduplicate_items;

/// Terminal pipeline failures. Everything else degrades to [`StageError`]
/// records on a returned result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No literature found for '{topic}'")]
    NoItems { topic: String },

    #[error("All configured sources failed")]
    AllSourcesFailed,

    #[error("Pipeline configuration error: {0}")]
    Config(String),
}

impl From<LlmError> for PipelineError {
    fn from(err: LlmError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// Receives stage transitions and progress notes during a run.
///
/// All methods default to no-ops; the CLI installs an indicatif-backed
/// implementation.
pub trait ProgressObserver: Send + Sync + std::fmt::Debug {
    fn stage_changed(&self, _stage: Stage) {}
    fn note(&self, _message: &str) {}
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Runs literature reviews end to end.
#[derive(Debug)]
pub struct Orchestrator {
    registry: RetrieverRegistry,
    gateway: Arc<LlmGateway>,
    extractor: Arc<dyn FullTextExtractor>,
    store: Option<Arc<dyn VectorStore>>,
    observer: Arc<dyn ProgressObserver>,
    config: PipelineConfig,
}

impl Orchestrator {
    /// Build from application configuration with the default source registry
    /// and PDF extractor.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let gateway = LlmGateway::from_config(&config.llm)?;
        Ok(Self::new(
            RetrieverRegistry::new(),
            Arc::new(gateway),
            config.pipeline.clone(),
        ))
    }

    pub fn new(
        registry: RetrieverRegistry,
        gateway: Arc<LlmGateway>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            extractor: Arc::new(PdfExtractor::new()),
            store: None,
            observer: Arc::new(NoopObserver),
            config,
        }
    }

    /// Replace the full-text extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn FullTextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Attach a vector store; processed items are upserted after each run
    pub fn with_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Install a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one review. Returns a partial result when the run budget expires;
    /// fails only on configuration problems or when no items survive and the
    /// request demands some.
    pub async fn run_review(
        &self,
        request: ReviewRequest,
    ) -> Result<PipelineResult, PipelineError> {
        let deadline = Instant::now() + self.config.run_budget();
        let topic = normalize_topic(&request.topic);

        let sources = if request.sources.is_empty() {
            self.config.default_sources.clone()
        } else {
            request.sources.clone()
        };

        tracing::info!(%topic, ?sources, max_items = request.max_items, "starting literature review");

        let mut errors: Vec<StageError> = Vec::new();
        let mut counts = RunCounts::default();
        let mut timed_out = false;

        // Retrieving
        self.observer.stage_changed(Stage::Retrieving);
        let mut query = SearchQuery::new(&topic, self.config.max_results_per_source);
        if let Some((start, end)) = request.year_range {
            query = query.year_range(start, end);
        }

        let mut retrieved: Vec<crate::models::LiteratureItem> = Vec::new();
        let mut failed_sources = 0usize;

        for source_id in &sources {
            let retriever = match self.registry.get(source_id) {
                Some(r) => r,
                None => {
                    tracing::warn!(source = %source_id, "unknown source requested");
                    errors.push(StageError::new(
                        source_id.clone(),
                        Stage::Retrieving,
                        format!("Unknown source: {}", source_id),
                    ));
                    failed_sources += 1;
                    continue;
                }
            };

            match tokio::time::timeout_at(deadline, retriever.search(&query)).await {
                Ok(Ok(items)) => {
                    tracing::info!(source = %source_id, count = items.len(), "source returned items");
                    self.observer
                        .note(&format!("{}: {} results", retriever.name(), items.len()));
                    retrieved.extend(items);
                }
                Ok(Err(err)) => {
                    tracing::warn!(source = %source_id, %err, "source failed");
                    errors.push(StageError::new(source_id.clone(), Stage::Retrieving, err));
                    failed_sources += 1;
                }
                Err(_) => {
                    timed_out = true;
                    errors.push(StageError::new(
                        source_id.clone(),
                        Stage::Retrieving,
                        "run budget exhausted during retrieval",
                    ));
                    break;
                }
            }
        }
        counts.retrieved = retrieved.len();

        // Deduplicating
        self.observer.stage_changed(Stage::Deduplicating);
        let mut items = deduplicate_items(retrieved);
        counts.deduped = items.len();
        // First-N in retrieval order; no re-ranking before truncation
        items.truncate(request.max_items);

        if items.is_empty() && !timed_out {
            if !sources.is_empty() && failed_sources == sources.len() {
                return Err(PipelineError::AllSourcesFailed);
            }
            if request.require_items {
                return Err(PipelineError::NoItems { topic });
            }
        }

        // Enriching (pass-through when disabled)
        self.observer.stage_changed(Stage::Enriching);
        if request.enrich_full_text && !timed_out && !items.is_empty() {
            let stage = EnrichmentStage::new(
                Arc::clone(&self.extractor),
                self.config.enrich_concurrency,
                self.config.extract_timeout(),
            );
            errors.extend(stage.run(&mut items, deadline).await);
            timed_out = timed_out || Instant::now() >= deadline;
        }

        // Analyzing
        self.observer.stage_changed(Stage::Analyzing);
        if !timed_out && !items.is_empty() {
            let stage =
                AnalysisStage::new(Arc::clone(&self.gateway), self.config.analysis_concurrency);
            errors.extend(stage.run(&mut items, deadline).await);
            timed_out = timed_out || Instant::now() >= deadline;
        }
        counts.processed = items
            .iter()
            .filter(|i| {
                i.summary
                    .as_deref()
                    .is_some_and(|s| s != SUMMARY_FAILED_NOTICE)
            })
            .count();

        // Compiling
        self.observer.stage_changed(Stage::Compiling);
        let report = if !timed_out && !items.is_empty() {
            let generator = ReportGenerator::new(Arc::clone(&self.gateway));
            match tokio::time::timeout_at(deadline, generator.generate(&items, &topic)).await {
                Ok(report) => Some(report),
                Err(_) => {
                    timed_out = true;
                    errors.push(StageError::new(
                        "report",
                        Stage::Compiling,
                        "run budget exhausted during report compilation",
                    ));
                    None
                }
            }
        } else {
            None
        };

        let mut action_plan = build_action_plan(&topic, &request, &sources);
        if timed_out {
            tracing::warn!("run budget exhausted, returning partial results");
            action_plan.push(
                "Note: the run budget expired before all steps completed; partial results \
                 are included."
                    .to_string(),
            );
            if !errors.iter().any(|e| e.cause.contains("run budget")) {
                errors.push(StageError::new(
                    "pipeline",
                    Stage::Analyzing,
                    "run budget exhausted",
                ));
            }
        }

        counts.failed = errors.len();

        self.observer.stage_changed(Stage::Done);
        tracing::info!(
            retrieved = counts.retrieved,
            deduped = counts.deduped,
            processed = counts.processed,
            failed = counts.failed,
            "literature review finished"
        );

        let result = PipelineResult {
            topic,
            items,
            action_plan,
            counts,
            errors,
            report,
        };

        if let Some(store) = &self.store {
            self.persist(store, &result).await;
        }

        Ok(result)
    }

    /// Upsert processed items into the attached vector store. Failures are
    /// logged and never affect the returned result.
    async fn persist(&self, store: &Arc<dyn VectorStore>, result: &PipelineResult) {
        let candidates: Vec<&crate::models::LiteratureItem> = result
            .items
            .iter()
            .filter(|item| item.analysis_text().is_some())
            .collect();
        if candidates.is_empty() {
            return;
        }

        let texts: Vec<String> = candidates
            .iter()
            .map(|item| item.analysis_text().unwrap_or_default().to_string())
            .collect();

        let embeddings = match self.gateway.embed(&texts).await {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(%err, "embedding for vector store failed");
                return;
            }
        };

        let records: Vec<ItemRecord> = candidates
            .iter()
            .zip(embeddings)
            .map(|(item, embedding)| ItemRecord {
                id: item.id.clone(),
                title: item.title.clone(),
                summary: item.summary.clone(),
                embedding,
            })
            .collect();

        let count = records.len();
        match store.upsert(records).await {
            Ok(()) => tracing::debug!(count, "items upserted into vector store"),
            Err(err) => tracing::warn!(%err, "vector store upsert failed"),
        }
    }
}

/// Ordered, human-readable description of what the run will do
fn build_action_plan(topic: &str, request: &ReviewRequest, sources: &[String]) -> Vec<String> {
    let mut plan = vec![format!("Identify the research topic: {}", topic)];

    if let Some((start, end)) = request.year_range {
        plan.push(format!("Restrict the publication window: {}-{}", start, end));
    }

    plan.push(format!("Select data sources: {}", sources.join(", ")));

    let mut strategy = format!("Search for up to {} relevant papers", request.max_items);
    if request.enrich_full_text {
        strategy.push_str(" and retrieve full-text content");
    }
    plan.push(strategy);

    plan.push("Analyze paper metadata: titles, authors, abstracts and citations".to_string());
    plan.push("Identify research trends: publication timeline and recurring keywords".to_string());
    if request.enrich_full_text {
        plan.push("Process full-text content: extract key information and core findings".to_string());
    }
    plan.push("Generate AI-driven research insights".to_string());
    plan.push("Compile the final report: findings and recommendations".to_string());

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockProvider;
    use crate::sources::mock::{make_item, MockRetriever};

    fn mock_orchestrator(retriever: MockRetriever) -> Orchestrator {
        let mut registry = RetrieverRegistry::empty();
        registry.register(Arc::new(retriever));
        let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new())));
        Orchestrator::new(registry, gateway, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_basic_run() {
        let retriever =
            MockRetriever::with_items(vec![make_item("1", "One"), make_item("2", "Two")]);
        let orchestrator = mock_orchestrator(retriever);

        let request = ReviewRequest::new("test topic").sources(vec!["mock".to_string()]);
        let result = orchestrator.run_review(request).await.unwrap();

        assert_eq!(result.counts.retrieved, 2);
        assert_eq!(result.counts.deduped, 2);
        assert_eq!(result.counts.processed, 2);
        assert_eq!(result.items.len(), 2);
        assert!(result.items.iter().all(|i| i.summary.is_some()));
        assert!(result.report.is_some());
        assert!(!result.action_plan.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_source_is_recorded_not_fatal() {
        let retriever = MockRetriever::with_items(vec![make_item("1", "One")]);
        let orchestrator = mock_orchestrator(retriever);

        let request = ReviewRequest::new("test topic")
            .sources(vec!["mock".to_string(), "nonexistent".to_string()]);
        let result = orchestrator.run_review(request).await.unwrap();

        assert_eq!(result.items.len(), 1);
        assert!(result
            .errors
            .iter()
            .any(|e| e.item_id == "nonexistent" && e.stage == Stage::Retrieving));
    }

    #[tokio::test]
    async fn test_all_sources_failed() {
        let orchestrator = mock_orchestrator(MockRetriever::failing("api down"));

        let request = ReviewRequest::new("test topic").sources(vec!["mock".to_string()]);
        let err = orchestrator.run_review(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::AllSourcesFailed));
    }

    #[tokio::test]
    async fn test_require_items_with_empty_result() {
        let orchestrator = mock_orchestrator(MockRetriever::with_items(vec![]));

        let request = ReviewRequest::new("test topic")
            .sources(vec!["mock".to_string()])
            .require_items(true);
        let err = orchestrator.run_review(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoItems { .. }));
    }

    #[tokio::test]
    async fn test_empty_result_without_require_items() {
        let orchestrator = mock_orchestrator(MockRetriever::with_items(vec![]));

        let request = ReviewRequest::new("test topic").sources(vec!["mock".to_string()]);
        let result = orchestrator.run_review(request).await.unwrap();
        assert!(result.items.is_empty());
        assert!(result.report.is_none());
    }

    #[tokio::test]
    async fn test_max_items_truncation() {
        let items: Vec<_> = (0..10)
            .map(|i| make_item(&i.to_string(), &format!("Paper {}", i)))
            .collect();
        let orchestrator = mock_orchestrator(MockRetriever::with_items(items));

        let request = ReviewRequest::new("test topic")
            .sources(vec!["mock".to_string()])
            .max_items(3);
        let result = orchestrator.run_review(request).await.unwrap();

        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].id, "mock:0");
        assert_eq!(result.counts.deduped, 10);
    }

    #[tokio::test]
    async fn test_store_receives_processed_items() {
        let retriever = MockRetriever::with_items(vec![make_item("1", "One")]);
        let store = Arc::new(crate::store::InMemoryVectorStore::new());
        let orchestrator = mock_orchestrator(retriever).with_store(store.clone());

        let request = ReviewRequest::new("test topic").sources(vec!["mock".to_string()]);
        orchestrator.run_review(request).await.unwrap();

        assert_eq!(store.len().await, 1);
    }
}
