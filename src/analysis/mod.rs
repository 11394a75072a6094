//! Analysis stage: per-item annotation plus cross-item report generation.

pub mod keywords;
pub mod report;
pub mod summarizer;
pub mod trends;

pub use keywords::extract_keywords;
pub use report::{compile_markdown, ReportGenerator, ReportSections};
pub use summarizer::{Summarizer, SummaryType};
pub use trends::TrendAnalyzer;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::llm::{LlmError, LlmGateway};
use crate::models::{LiteratureItem, Stage, StageError};

/// Keywords attached to each item
const MAX_KEYWORDS_PER_ITEM: usize = 10;

/// Placeholder when summarization failed for one item
pub const SUMMARY_FAILED_NOTICE: &str = "AI summary generation failed.";
/// Placeholder when an item has nothing to summarize
pub const NO_TEXT_NOTICE: &str = "No text content available for summarization.";

/// Bounded-concurrency per-item analysis over a batch of items.
///
/// Attaches keywords and an AI summary to every item. Keyword extraction is
/// local and cannot fail; summary failures are recorded per item and replaced
/// with a placeholder so downstream stages see a summary on every item.
#[derive(Debug)]
pub struct AnalysisStage {
    summarizer: Summarizer,
    concurrency: usize,
}

impl AnalysisStage {
    pub fn new(gateway: Arc<LlmGateway>, concurrency: usize) -> Self {
        Self {
            summarizer: Summarizer::new(gateway),
            concurrency: concurrency.max(1),
        }
    }

    /// Annotate items in place. Work still in flight at the deadline is
    /// abandoned; affected items keep keywords but get the failure notice.
    pub async fn run(&self, items: &mut [LiteratureItem], deadline: Instant) -> Vec<StageError> {
        for item in items.iter_mut() {
            if let Some(text) = item.analysis_text() {
                item.keywords = extract_keywords(text, MAX_KEYWORDS_PER_ITEM);
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<(String, Result<String, LlmError>)> = JoinSet::new();

        for item in items.iter_mut() {
            let Some(text) = item.analysis_text().map(|t| t.to_string()) else {
                item.summary = Some(NO_TEXT_NOTICE.to_string());
                continue;
            };

            // Full text earns the deeper treatment
            let summary_type = if item.full_text.is_some() {
                SummaryType::KeyFindings
            } else {
                SummaryType::AbstractEnhancement
            };

            let id = item.id.clone();
            let summarizer = self.summarizer.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = summarizer.summarize(&text, summary_type).await;
                (id, result)
            });
        }

        let mut errors = Vec::new();

        loop {
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(pending = tasks.len(), "analysis deadline reached, aborting remaining tasks");
                    tasks.abort_all();
                    break;
                }
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((id, Ok(summary))) => {
                    if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                        item.summary = Some(summary);
                    }
                }
                Ok((id, Err(err))) => {
                    tracing::warn!(%id, %err, "summary generation failed");
                    if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                        item.summary = Some(SUMMARY_FAILED_NOTICE.to_string());
                    }
                    errors.push(StageError::new(id, Stage::Analyzing, err));
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    errors.push(StageError::new("analysis", Stage::Analyzing, join_err));
                }
            }
        }

        // Anything abandoned at the deadline still gets a summary value
        for item in items.iter_mut() {
            if item.summary.is_none() {
                item.summary = Some(SUMMARY_FAILED_NOTICE.to_string());
            }
        }

        errors
    }
}
