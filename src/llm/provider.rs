//! LLM provider implementations.
//!
//! The provider set is closed: OpenAI-compatible HTTP APIs (OpenAI and
//! DeepSeek), a local Ollama server, and a deterministic mock. The gateway
//! owns retry policy; providers perform exactly one request per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::ProviderSettings;
use crate::llm::LlmError;
use crate::utils::HttpClient;

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// A system-role message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// A user-role message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Interface implemented by every LLM backend.
///
/// An empty response string is a valid completion, not an error.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Provider kind (e.g. "openai", "deepseek", "ollama", "mock")
    fn kind(&self) -> &str;

    /// Chat model name
    fn model(&self) -> &str;

    /// Whether this provider has an embedding endpoint
    fn supports_embeddings(&self) -> bool;

    /// Send one chat completion request and return the assistant content
    async fn send_chat(&self, client: &HttpClient, request: &ChatRequest)
        -> Result<String, LlmError>;

    /// Embed a batch of texts
    async fn send_embed(
        &self,
        client: &HttpClient,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible (OpenAI, DeepSeek)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OpenAiChatPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbedPayload<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

/// Provider speaking the OpenAI chat/embeddings wire format.
///
/// Serves both OpenAI itself and DeepSeek, which exposes a compatible chat
/// API but no embedding endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    kind: String,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build from per-provider settings. Fails when the API key is missing.
    pub fn from_settings(kind: &str, settings: &ProviderSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Configuration(format!("API key for provider '{}' is not set", kind))
            })?;

        Ok(Self {
            kind: kind.to_string(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
        })
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LlmError::Authentication {
                provider: self.kind.clone(),
            });
        }
        let message = response.text().await.unwrap_or_default();
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    async fn send_chat(
        &self,
        client: &HttpClient,
        request: &ChatRequest,
    ) -> Result<String, LlmError> {
        let payload = OpenAiChatPayload {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = client
            .client()
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let body: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    async fn send_embed(
        &self,
        client: &HttpClient,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or_else(|| LlmError::EmbeddingsUnsupported {
                provider: self.kind.clone(),
            })?;

        let payload = OpenAiEmbedPayload {
            model,
            input: texts,
        };

        let response = client
            .client()
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        let response = self.check_status(response).await?;

        let body: OpenAiEmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OllamaChatPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OpenAiMessage,
}

#[derive(Debug, Serialize)]
struct OllamaEmbedPayload<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embedding: Vec<f32>,
}

/// Local Ollama server. No API key; embeddings are one request per text.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    embedding_model: Option<String>,
}

impl OllamaProvider {
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn kind(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    async fn send_chat(
        &self,
        client: &HttpClient,
        request: &ChatRequest,
    ) -> Result<String, LlmError> {
        let payload = OllamaChatPayload {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = client
            .client()
            .post(format!("{}/chat", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(body.message.content.unwrap_or_default().trim().to_string())
    }

    async fn send_embed(
        &self,
        client: &HttpClient,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or_else(|| LlmError::EmbeddingsUnsupported {
                provider: "ollama".to_string(),
            })?;

        // The Ollama embeddings endpoint takes one prompt per request
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let payload = OllamaEmbedPayload {
                model,
                prompt: text,
            };

            let response = client
                .client()
                .post(format!("{}/embeddings", self.base_url))
                .json(&payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body: OllamaEmbedResponse = response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
            embeddings.push(body.embedding);
        }

        Ok(embeddings)
    }
}

// ---------------------------------------------------------------------------
// Mock
// ---------------------------------------------------------------------------

/// Deterministic provider with no I/O, used in tests and offline runs.
///
/// Replies can be scripted; once the script runs out (or none was given), a
/// fixed default reply is returned.
#[derive(Debug, Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<String>>,
}

const MOCK_REPLY: &str = "This is a mock response.";
const MOCK_EMBEDDING_DIM: usize = 128;

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a sequence of replies, returned in order
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    /// Queue one more scripted reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn kind(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock_model"
    }

    fn supports_embeddings(&self) -> bool {
        true
    }

    async fn send_chat(
        &self,
        _client: &HttpClient,
        _request: &ChatRequest,
    ) -> Result<String, LlmError> {
        let scripted = self.replies.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| MOCK_REPLY.to_string()))
    }

    async fn send_embed(
        &self,
        _client: &HttpClient,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>, LlmError> {
        let embedding: Vec<f32> = (0..MOCK_EMBEDDING_DIM).map(|i| 0.01 * i as f32).collect();
        Ok(vec![embedding; texts.len()])
    }
}
