//! Review request and pipeline result models.

use serde::{Deserialize, Serialize};

use crate::models::LiteratureItem;

/// Parameters for one literature review run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Research topic to search for
    pub topic: String,

    /// Maximum number of items to retain after deduplication
    pub max_items: usize,

    /// Sources to query, in priority order (ids from the registry)
    pub sources: Vec<String>,

    /// Whether to attempt full-text retrieval for each item
    pub enrich_full_text: bool,

    /// Optional inclusive publication-year range
    pub year_range: Option<(i32, i32)>,

    /// Fail the run (instead of returning an empty result) when no items
    /// survive retrieval and deduplication
    pub require_items: bool,
}

impl ReviewRequest {
    /// Create a request with defaults for the optional knobs
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            max_items: 20,
            sources: vec!["arxiv".to_string()],
            enrich_full_text: false,
            year_range: None,
            require_items: false,
        }
    }

    /// Set the retained-item cap
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    /// Set the sources to query, in order
    pub fn sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Enable full-text enrichment
    pub fn enrich_full_text(mut self, enabled: bool) -> Self {
        self.enrich_full_text = enabled;
        self
    }

    /// Set the publication-year range
    pub fn year_range(mut self, start: i32, end: i32) -> Self {
        self.year_range = Some((start, end));
        self
    }

    /// Require at least one surviving item
    pub fn require_items(mut self, required: bool) -> Self {
        self.require_items = required;
        self
    }
}

/// Pipeline stages, in execution order. No stage is skipped even when it is
/// a no-op, so progress reporting stays uniform across configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Retrieving,
    Deduplicating,
    Enriching,
    Analyzing,
    Compiling,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Retrieving => "retrieving",
            Stage::Deduplicating => "deduplicating",
            Stage::Enriching => "enriching",
            Stage::Analyzing => "analyzing",
            Stage::Compiling => "compiling",
            Stage::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// A recorded per-item or per-task failure, attached to the result instead
/// of propagating past its stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    /// Id of the affected item, or a task label for non-item failures
    pub item_id: String,

    /// Stage the failure occurred in
    pub stage: Stage,

    /// Human-readable cause
    pub cause: String,
}

impl StageError {
    pub fn new(item_id: impl Into<String>, stage: Stage, cause: impl std::fmt::Display) -> Self {
        Self {
            item_id: item_id.into(),
            stage,
            cause: cause.to_string(),
        }
    }
}

/// Item counts across the run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunCounts {
    /// Items returned by all sources before deduplication
    pub retrieved: usize,
    /// Items surviving both deduplication passes (pre-truncation)
    pub deduped: usize,
    /// Items that completed the analysis stage
    pub processed: usize,
    /// Recorded per-item/per-task failures
    pub failed: usize,
}

/// The externally visible output of one pipeline run. Immutable after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The (possibly translated) research topic the run used
    pub topic: String,

    /// Retained items in deterministic retrieval order, each carrying its
    /// summary and keywords after analysis
    pub items: Vec<LiteratureItem>,

    /// Ordered human-readable step list describing what the run did
    pub action_plan: Vec<String>,

    /// Item counts
    pub counts: RunCounts,

    /// Per-item and per-task failures recorded at stage boundaries
    pub errors: Vec<StageError>,

    /// Compiled markdown report, when report generation was requested
    pub report: Option<String>,
}

impl PipelineResult {
    /// An empty result for a topic (used when retrieval yields nothing)
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            items: Vec::new(),
            action_plan: Vec::new(),
            counts: RunCounts::default(),
            errors: Vec::new(),
            report: None,
        }
    }

    /// Whether any failures were recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = ReviewRequest::new("quantum computing")
            .max_items(5)
            .sources(vec!["arxiv".into()])
            .enrich_full_text(true)
            .year_range(2020, 2023);

        assert_eq!(req.topic, "quantum computing");
        assert_eq!(req.max_items, 5);
        assert!(req.enrich_full_text);
        assert_eq!(req.year_range, Some((2020, 2023)));
        assert!(!req.require_items);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Retrieving.to_string(), "retrieving");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[test]
    fn test_stage_error_serializes() {
        let err = StageError::new("arxiv:1", Stage::Enriching, "download failed");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["stage"], "enriching");
        assert_eq!(json["item_id"], "arxiv:1");
    }
}
