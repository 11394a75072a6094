//! # lit-review
//!
//! An automated literature review pipeline: retrieve candidate papers from
//! external sources, deduplicate them, optionally fetch full texts, run an
//! LLM-backed analysis fan-out and assemble a markdown report.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (LiteratureItem, ReviewRequest, PipelineResult)
//! - [`sources`]: Retrieval plugins with a trait-based registry
//! - [`llm`]: Provider abstraction and the retrying gateway
//! - [`enrich`]: Full-text download and extraction
//! - [`analysis`]: Keywords, summaries, trends and report generation
//! - [`pipeline`]: The stage-by-stage orchestrator
//! - [`store`]: Vector store consumed after a run
//! - [`config`]: Configuration management

pub mod analysis;
pub mod config;
pub mod enrich;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{LiteratureItem, PipelineResult, ReviewRequest};
pub use pipeline::Orchestrator;
pub use sources::{Retriever, RetrieverRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
