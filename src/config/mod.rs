//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables with the `LIT_REVIEW_` prefix (e.g.
//! `LIT_REVIEW_LLM__PROVIDER=mock` selects the mock LLM provider).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration. Fatal: the
/// pipeline is never constructed from an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// LLM gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Active provider: "openai", "deepseek", "ollama" or "mock"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Maximum retry attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Base delay applied on HTTP 429, scaled by attempt number
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_secs: u64,

    /// Provider to route embeddings through when the active provider has no
    /// embedding endpoint (e.g. chat on DeepSeek, embeddings on OpenAI)
    #[serde(default)]
    pub embedding_fallback: Option<String>,

    /// OpenAI settings
    #[serde(default = "ProviderSettings::openai_defaults")]
    pub openai: ProviderSettings,

    /// DeepSeek settings (OpenAI-compatible chat API, no embeddings)
    #[serde(default = "ProviderSettings::deepseek_defaults")]
    pub deepseek: ProviderSettings,

    /// Ollama settings (local server, no API key)
    #[serde(default = "ProviderSettings::ollama_defaults")]
    pub ollama: ProviderSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout(),
            rate_limit_delay_secs: default_rate_limit_delay(),
            embedding_fallback: None,
            openai: ProviderSettings::openai_defaults(),
            deepseek: ProviderSettings::deepseek_defaults(),
            ollama: ProviderSettings::ollama_defaults(),
        }
    }
}

impl LlmConfig {
    /// Per-request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rate-limit base delay as a [`Duration`]
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }
}

/// Settings for one LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; read from the environment when not set in the file
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Chat model name
    pub model: String,

    /// Embedding model name, for providers that support embeddings
    #[serde(default)]
    pub embedding_model: Option<String>,
}

impl ProviderSettings {
    fn openai_defaults() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: Some("text-embedding-ada-002".to_string()),
        }
    }

    fn deepseek_defaults() -> Self {
        Self {
            api_key: std::env::var("DEEPSEEK_API_KEY").ok(),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            embedding_model: None,
        }
    }

    fn ollama_defaults() -> Self {
        Self {
            api_key: None,
            base_url: "http://localhost:11434/api".to_string(),
            model: "llama3".to_string(),
            embedding_model: Some("nomic-embed-text".to_string()),
        }
    }
}

/// Pipeline tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum results requested from each source
    #[serde(default = "default_max_results")]
    pub max_results_per_source: usize,

    /// Overall wall-clock budget per run, in seconds
    #[serde(default = "default_run_budget")]
    pub run_budget_secs: u64,

    /// Worker-pool size for full-text enrichment
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,

    /// Worker-pool size for per-item analysis
    #[serde(default = "default_analysis_concurrency")]
    pub analysis_concurrency: usize,

    /// Per-document extraction timeout, in seconds
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,

    /// Sources queried when the request does not name any
    #[serde(default = "default_sources")]
    pub default_sources: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_results_per_source: default_max_results(),
            run_budget_secs: default_run_budget(),
            enrich_concurrency: default_enrich_concurrency(),
            analysis_concurrency: default_analysis_concurrency(),
            extract_timeout_secs: default_extract_timeout(),
            default_sources: default_sources(),
        }
    }
}

impl PipelineConfig {
    /// Overall run budget as a [`Duration`]
    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }

    /// Per-document extraction timeout as a [`Duration`]
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    60
}

fn default_rate_limit_delay() -> u64 {
    2
}

fn default_max_results() -> usize {
    20
}

fn default_run_budget() -> u64 {
    300
}

fn default_enrich_concurrency() -> usize {
    4
}

fn default_analysis_concurrency() -> usize {
    4
}

fn default_extract_timeout() -> u64 {
    60
}

fn default_sources() -> Vec<String> {
    vec!["arxiv".to_string()]
}

/// Load configuration from a TOML file plus `LIT_REVIEW_` env overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("LIT_REVIEW").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Get configuration from env overrides and defaults only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix("LIT_REVIEW").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "mock");
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.pipeline.run_budget_secs, 300);
        assert_eq!(config.pipeline.default_sources, vec!["arxiv"]);
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.llm.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.pipeline.run_budget(), Duration::from_secs(300));
    }

    #[test]
    fn test_provider_defaults() {
        let deepseek = ProviderSettings::deepseek_defaults();
        assert!(deepseek.embedding_model.is_none());
        assert!(deepseek.base_url.contains("deepseek"));

        let ollama = ProviderSettings::ollama_defaults();
        assert!(ollama.api_key.is_none());
    }
}
