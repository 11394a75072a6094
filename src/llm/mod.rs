//! LLM access layer.
//!
//! Providers implement the [`LlmProvider`] trait; the [`LlmGateway`] wraps
//! the active provider with retry, rate-limit handling and an optional
//! embedding fallback provider.

mod gateway;
mod provider;

pub use gateway::LlmGateway;
pub use provider::{
    ChatMessage, ChatRequest, LlmProvider, MockProvider, OllamaProvider, OpenAiCompatibleProvider,
};

use thiserror::Error;

/// Errors raised by the LLM layer
#[derive(Debug, Error)]
pub enum LlmError {
    /// The gateway or a provider is misconfigured (e.g. missing API key)
    #[error("LLM configuration error: {0}")]
    Configuration(String),

    /// The provider rejected our credentials; never retried
    #[error("Authentication failed for provider '{provider}'")]
    Authentication { provider: String },

    /// Transport-level failure
    #[error("LLM request failed: {0}")]
    Http(String),

    /// Non-success status from the provider API
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// The provider has no embedding endpoint and no fallback is configured
    #[error("Provider '{provider}' does not support embeddings")]
    EmbeddingsUnsupported { provider: String },

    /// All retry attempts were spent
    #[error("LLM request exhausted retries (provider '{provider}', model '{model}'): {cause}")]
    Exhausted {
        provider: String,
        model: String,
        cause: String,
    },
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
