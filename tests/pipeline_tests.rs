//! End-to-end pipeline tests with mock retrievers, providers and extractors.

use std::sync::Arc;
use std::time::Duration;

use lit_review::config::PipelineConfig;
use lit_review::enrich::{ExtractionError, FullTextExtractor};
use lit_review::llm::{ChatRequest, LlmError, LlmGateway, LlmProvider, MockProvider};
use lit_review::models::{ReviewRequest, Stage};
use lit_review::pipeline::{Orchestrator, PipelineError};
use lit_review::sources::mock::{make_item, MockRetriever};
use lit_review::sources::RetrieverRegistry;
use lit_review::utils::HttpClient;

fn orchestrator_with(retriever: MockRetriever, config: PipelineConfig) -> Orchestrator {
    let mut registry = RetrieverRegistry::empty();
    registry.register(Arc::new(retriever));
    let gateway = Arc::new(LlmGateway::new(Arc::new(MockProvider::new())));
    Orchestrator::new(registry, gateway, config)
}

fn request() -> ReviewRequest {
    ReviewRequest::new("test topic").sources(vec!["mock".to_string()])
}

/// Chat provider that sleeps before every completion.
#[derive(Debug)]
struct SlowProvider {
    delay: Duration,
}

#[async_trait::async_trait]
impl LlmProvider for SlowProvider {
    fn kind(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-model"
    }

    fn supports_embeddings(&self) -> bool {
        false
    }

    async fn send_chat(
        &self,
        _client: &HttpClient,
        _request: &ChatRequest,
    ) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }

    async fn send_embed(
        &self,
        _client: &HttpClient,
        _texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        Err(LlmError::EmbeddingsUnsupported {
            provider: "slow".to_string(),
        })
    }
}

/// Extractor that fails for URLs ending in `bad.pdf`.
#[derive(Debug)]
struct SelectiveExtractor;

#[async_trait::async_trait]
impl FullTextExtractor for SelectiveExtractor {
    async fn extract(&self, url: &str, _timeout: Duration) -> Result<String, ExtractionError> {
        if url.ends_with("bad.pdf") {
            return Err(ExtractionError::Download("connection refused".to_string()));
        }
        Ok(format!("extracted text for {}", url))
    }
}

#[tokio::test]
async fn duplicate_dois_collapse_to_first_seen() {
    let mut first = make_item("1", "A");
    first.doi = Some("10.1234/ABC".to_string());
    let mut second = make_item("2", "B");
    second.doi = Some("10.1234/abc".to_string());

    let orchestrator = orchestrator_with(
        MockRetriever::with_items(vec![first, second]),
        PipelineConfig::default(),
    );
    let result = orchestrator.run_review(request()).await.unwrap();

    assert_eq!(result.counts.retrieved, 2);
    assert_eq!(result.counts.deduped, 1);
    assert_eq!(result.items[0].title, "A");
}

#[tokio::test]
async fn rerunning_identical_input_is_idempotent() {
    let items = vec![make_item("1", "One"), make_item("2", "Two")];

    let first_run = orchestrator_with(
        MockRetriever::with_items(items.clone()),
        PipelineConfig::default(),
    )
    .run_review(request())
    .await
    .unwrap();

    let second_run = orchestrator_with(
        MockRetriever::with_items(items),
        PipelineConfig::default(),
    )
    .run_review(request())
    .await
    .unwrap();

    let first_ids: Vec<&str> = first_run.items.iter().map(|i| i.id.as_str()).collect();
    let second_ids: Vec<&str> = second_run.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn enrichment_failure_is_isolated_per_item() {
    let mut good = make_item("1", "Good");
    good.pdf_url = Some("http://example.com/good.pdf".to_string());
    let mut bad = make_item("2", "Bad");
    bad.pdf_url = Some("http://example.com/bad.pdf".to_string());

    let orchestrator = orchestrator_with(
        MockRetriever::with_items(vec![good, bad]),
        PipelineConfig::default(),
    )
    .with_extractor(Arc::new(SelectiveExtractor));

    let result = orchestrator
        .run_review(request().enrich_full_text(true))
        .await
        .unwrap();

    assert!(result.items[0].full_text.is_some());
    assert!(result.items[1].full_text.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| e.item_id == "mock:2" && e.stage == Stage::Enriching));
    // The failed item still went through analysis
    assert!(result.items[1].summary.is_some());
}

#[tokio::test(start_paused = true)]
async fn budget_expiry_returns_partial_result() {
    let mut registry = RetrieverRegistry::empty();
    registry.register(Arc::new(MockRetriever::with_items(vec![
        make_item("1", "One"),
        make_item("2", "Two"),
    ])));
    let gateway = Arc::new(LlmGateway::new(Arc::new(SlowProvider {
        delay: Duration::from_secs(5),
    })));

    let config = PipelineConfig {
        run_budget_secs: 1,
        ..PipelineConfig::default()
    };
    let orchestrator = Orchestrator::new(registry, gateway, config);

    let result = orchestrator.run_review(request()).await.unwrap();

    // Retrieval and dedup completed before the budget expired
    assert_eq!(result.items.len(), 2);
    assert!(result.report.is_none());
    assert!(result
        .action_plan
        .iter()
        .any(|step| step.contains("run budget expired")));
    assert!(result.errors.iter().any(|e| e.cause.contains("run budget")));
}

#[tokio::test]
async fn chinese_topic_is_translated_before_dispatch() {
    let orchestrator = orchestrator_with(
        MockRetriever::with_items(vec![make_item("1", "One")]),
        PipelineConfig::default(),
    );

    let result = orchestrator
        .run_review(ReviewRequest::new("深度学习").sources(vec!["mock".to_string()]))
        .await
        .unwrap();

    assert_eq!(result.topic, "deep learning");
}

#[tokio::test]
async fn require_items_fails_on_empty_retrieval() {
    let orchestrator = orchestrator_with(
        MockRetriever::with_items(vec![]),
        PipelineConfig::default(),
    );

    let err = orchestrator
        .run_review(request().require_items(true))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoItems { .. }));
}

#[tokio::test]
async fn failing_source_fails_run_when_it_is_the_only_one() {
    let orchestrator = orchestrator_with(
        MockRetriever::failing("upstream down"),
        PipelineConfig::default(),
    );

    let err = orchestrator.run_review(request()).await.unwrap_err();
    assert!(matches!(err, PipelineError::AllSourcesFailed));
}

#[tokio::test]
async fn items_without_identifiers_survive_dedup() {
    let mut plain_a = make_item("1", "Completely Different Title");
    plain_a.doi = None;
    plain_a.external_id = None;
    let mut plain_b = make_item("2", "Another Unrelated Title");
    plain_b.doi = None;
    plain_b.external_id = None;

    let orchestrator = orchestrator_with(
        MockRetriever::with_items(vec![plain_a, plain_b]),
        PipelineConfig::default(),
    );
    let result = orchestrator.run_review(request()).await.unwrap();

    assert_eq!(result.items.len(), 2);
}
