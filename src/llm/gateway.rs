//! Gateway in front of the active LLM provider.
//!
//! Owns retry policy: authentication failures abort immediately, HTTP 429
//! sleeps `rate_limit_delay * attempt` before retrying, other transient
//! failures back off linearly, and a spent budget surfaces as
//! [`LlmError::Exhausted`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::llm::provider::{
    ChatMessage, ChatRequest, LlmProvider, MockProvider, OllamaProvider, OpenAiCompatibleProvider,
};
use crate::llm::LlmError;
use crate::utils::HttpClient;

/// Front door for all LLM traffic in a run.
#[derive(Debug)]
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    /// Embedding provider used when the active one has no embedding endpoint
    fallback: Option<Arc<dyn LlmProvider>>,
    /// Serializes fallback embedding calls so they never burst
    fallback_gate: Mutex<()>,
    client: HttpClient,
    max_retries: u32,
    rate_limit_delay: Duration,
    retry_delay: Duration,
}

impl LlmGateway {
    /// Build the gateway from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = build_provider(&config.provider, config)?;

        let fallback = match &config.embedding_fallback {
            Some(name) if name != &config.provider => Some(build_provider(name, config)?),
            _ => None,
        };

        tracing::info!(
            provider = provider.kind(),
            model = provider.model(),
            fallback = fallback.as_ref().map(|f| f.kind()),
            "LLM gateway initialized"
        );

        Ok(Self {
            provider,
            fallback,
            fallback_gate: Mutex::new(()),
            client: HttpClient::with_timeout(config.request_timeout()),
            max_retries: config.max_retries.max(1),
            rate_limit_delay: config.rate_limit_delay(),
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Build directly from a provider (tests)
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            fallback: None,
            fallback_gate: Mutex::new(()),
            client: HttpClient::new(),
            max_retries: 3,
            rate_limit_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Set the embedding fallback provider
    pub fn with_fallback(mut self, fallback: Arc<dyn LlmProvider>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Override the retry delays (tests)
    pub fn with_delays(mut self, rate_limit_delay: Duration, retry_delay: Duration) -> Self {
        self.rate_limit_delay = rate_limit_delay;
        self.retry_delay = retry_delay;
        self
    }

    /// Active provider kind
    pub fn provider_kind(&self) -> &str {
        self.provider.kind()
    }

    /// Active chat model
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Generate a chat completion. An empty string is a valid result.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let mut request = ChatRequest::new(messages);
        request.max_tokens = max_tokens;
        request.temperature = temperature;

        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.max_retries {
            match self.provider.send_chat(&self.client, &request).await {
                Ok(content) => return Ok(content),
                Err(err) => {
                    if !is_retryable(&err) {
                        return Err(err);
                    }

                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt, &err);
                        tracing::debug!(attempt, %err, ?delay, "LLM request failed, retrying");
                        sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(Self::exhausted(self.provider.as_ref(), last_error))
    }

    /// Delay before the next attempt, scaled by attempt number
    fn backoff_delay(&self, attempt: u32, err: &LlmError) -> Duration {
        match err {
            LlmError::Api { status: 429, .. } => {
                tracing::warn!(attempt, "LLM rate limit hit, backing off");
                self.rate_limit_delay * attempt
            }
            _ => self.retry_delay * attempt,
        }
    }

    fn exhausted(provider: &dyn LlmProvider, last_error: Option<LlmError>) -> LlmError {
        let cause = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        LlmError::Exhausted {
            provider: provider.kind().to_string(),
            model: provider.model().to_string(),
            cause,
        }
    }

    /// Convenience wrapper: one system + one user message
    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.complete(
            vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            None,
            Some(temperature),
        )
        .await
    }

    /// Embed a batch of texts, routing through the fallback provider when the
    /// active one has no embedding endpoint.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if self.provider.supports_embeddings() {
            return self.embed_with_retry(&self.provider, texts).await;
        }

        match &self.fallback {
            Some(fallback) => {
                // Held across the call: fallback traffic is single-flight
                let _gate = self.fallback_gate.lock().await;
                tracing::warn!(
                    provider = self.provider.kind(),
                    fallback = fallback.kind(),
                    "active provider has no embeddings, using fallback"
                );
                self.embed_with_retry(fallback, texts).await
            }
            None => Err(LlmError::EmbeddingsUnsupported {
                provider: self.provider.kind().to_string(),
            }),
        }
    }

    /// Embedding calls get the same retry policy as chat completions
    async fn embed_with_retry(
        &self,
        provider: &Arc<dyn LlmProvider>,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.max_retries {
            match provider.send_embed(&self.client, texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(err) => {
                    if !is_retryable(&err) {
                        return Err(err);
                    }

                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt, &err);
                        tracing::debug!(attempt, %err, ?delay, "embedding request failed, retrying");
                        sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(Self::exhausted(provider.as_ref(), last_error))
    }
}

fn build_provider(name: &str, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match name {
        "openai" => Ok(Arc::new(OpenAiCompatibleProvider::from_settings(
            "openai",
            &config.openai,
        )?)),
        "deepseek" => Ok(Arc::new(OpenAiCompatibleProvider::from_settings(
            "deepseek",
            &config.deepseek,
        )?)),
        "ollama" => Ok(Arc::new(OllamaProvider::from_settings(&config.ollama))),
        "mock" => Ok(Arc::new(MockProvider::new())),
        other => Err(LlmError::Configuration(format!(
            "Unsupported LLM provider: {}",
            other
        ))),
    }
}

/// Authentication, configuration and malformed-response errors are permanent
fn is_retryable(err: &LlmError) -> bool {
    match err {
        LlmError::Http(_) => true,
        LlmError::Api { status, .. } => {
            *status == 429 || *status >= 500
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;

    fn test_provider(server_url: &str) -> OpenAiCompatibleProvider {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            base_url: server_url.to_string(),
            model: "test-model".to_string(),
            embedding_model: Some("test-embed".to_string()),
        };
        OpenAiCompatibleProvider::from_settings("openai", &settings).unwrap()
    }

    fn fast_gateway(provider: OpenAiCompatibleProvider) -> LlmGateway {
        LlmGateway::new(Arc::new(provider))
            .with_delays(Duration::from_millis(1), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"hello there"}}]}"#)
            .create_async()
            .await;

        let gateway = fast_gateway(test_provider(&server.url()));
        let result = gateway
            .complete(vec![ChatMessage::user("hi")], Some(50), Some(0.7))
            .await
            .unwrap();

        assert_eq!(result, "hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .expect(1)
            .create_async()
            .await;

        let gateway = fast_gateway(test_provider(&server.url()));
        let err = gateway
            .complete(vec![ChatMessage::user("hi")], None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Authentication { provider } if provider == "openai"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .expect(3)
            .create_async()
            .await;

        let gateway = fast_gateway(test_provider(&server.url()));
        let err = gateway
            .complete(vec![ChatMessage::user("hi")], None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { provider, .. } if provider == "openai"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .expect(3)
            .create_async()
            .await;

        let gateway = fast_gateway(test_provider(&server.url()));
        let err = gateway
            .complete(vec![ChatMessage::user("hi")], None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { cause, .. } if cause.contains("429")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_server_error_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("boom")
            .expect(3)
            .create_async()
            .await;

        let gateway = fast_gateway(test_provider(&server.url()));
        let err = gateway.embed(&["text".to_string()]).await.unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { provider, .. } if provider == "openai"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_fallback_shares_retry_policy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(500)
            .with_body("boom")
            .expect(3)
            .create_async()
            .await;

        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            embedding_model: None,
        };
        let deepseek = OpenAiCompatibleProvider::from_settings("deepseek", &settings).unwrap();
        let gateway = LlmGateway::new(Arc::new(deepseek))
            .with_fallback(Arc::new(test_provider(&server.url())))
            .with_delays(Duration::from_millis(1), Duration::from_millis(1));

        let err = gateway.embed(&["text".to_string()]).await.unwrap_err();

        assert!(matches!(err, LlmError::Exhausted { provider, .. } if provider == "openai"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_uses_fallback() {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            embedding_model: None,
        };
        let deepseek = OpenAiCompatibleProvider::from_settings("deepseek", &settings).unwrap();

        let gateway = LlmGateway::new(Arc::new(deepseek)).with_fallback(Arc::new(MockProvider::new()));

        let embeddings = gateway.embed(&["text".to_string()]).await.unwrap();
        assert_eq!(embeddings.len(), 1);
        assert!(!embeddings[0].is_empty());
    }

    #[tokio::test]
    async fn test_embed_without_fallback_fails() {
        let settings = ProviderSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            embedding_model: None,
        };
        let deepseek = OpenAiCompatibleProvider::from_settings("deepseek", &settings).unwrap();
        let gateway = LlmGateway::new(Arc::new(deepseek));

        let err = gateway.embed(&["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, LlmError::EmbeddingsUnsupported { .. }));
    }

    #[tokio::test]
    async fn test_mock_gateway_from_config() {
        let config = LlmConfig::default();
        let gateway = LlmGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider_kind(), "mock");

        let reply = gateway
            .complete(vec![ChatMessage::user("hi")], None, None)
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected() {
        let mut config = LlmConfig::default();
        config.provider = "banana".to_string();
        let err = LlmGateway::from_config(&config).unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }
}
