//! Shared utilities.
//!
//! - [`deduplicate_items`]: two-stage duplicate removal across sources
//! - [`HttpClient`]: shared HTTP client with sane timeouts
//! - [`with_retry`]: execute an operation with automatic retry on transient errors

pub mod dedup;
pub mod http;
pub mod retry;

pub use dedup::deduplicate_items;
pub use http::HttpClient;
pub use retry::{api_retry_config, with_retry, RetryConfig, TransientError};
