//! Core data structures shared across the pipeline.

mod item;
mod review;

pub use item::{ItemBuilder, ItemSource, LiteratureItem};
pub use review::{PipelineResult, ReviewRequest, RunCounts, Stage, StageError};
