//! llama-server HTTP client
//!
//! Sends OpenAI-compatible chat completion requests to a local
//! llama-server instance, either buffered or as an SSE stream, and checks
//! its `/health` endpoint.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::InferenceConfig;
use crate::error::{ChatError, Result};
use crate::inference::sse::delta_stream;
use crate::inference::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, HealthResponse,
};
use crate::inference::{DeltaStream, InferenceClient};

/// Client for a llama-server compatible endpoint
#[derive(Debug, Clone)]
pub struct LlamaServerClient {
    http: Client,
    base_url: String,
    n_predict: i64,
    add_bos: bool,
}

impl LlamaServerClient {
    /// Create a client from the inference configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    ///
    /// # Examples
    ///
    /// ```
    /// use localchat::config::InferenceConfig;
    /// use localchat::inference::LlamaServerClient;
    ///
    /// let client = LlamaServerClient::new(&InferenceConfig::default()).unwrap();
    /// assert_eq!(client.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("localchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            n_predict: config.n_predict,
            add_bos: config.add_bos,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    async fn post(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let body = ChatCompletionRequest {
            messages,
            stream,
            n_predict: self.n_predict,
            add_bos: self.add_bos,
        };

        tracing::debug!(
            "POST {} (messages={}, stream={})",
            self.completions_url(),
            messages.len(),
            stream
        );

        let response = self
            .http
            .post(self.completions_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("inference request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Inference(format!(
                "inference server returned {}: {}",
                status, text
            ))
            .into());
        }

        Ok(response)
    }

    /// Query the server's health endpoint
    ///
    /// # Returns
    ///
    /// The reported `status` string, `"ok"` once a model is loaded
    ///
    /// # Errors
    ///
    /// Returns a transport error when unreachable and an inference error
    /// when the payload has no `status` field
    pub async fn health(&self) -> Result<String> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::Transport(format!("health check failed: {}", e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Transport(format!("health check failed: {}", e)))?;
        let health: HealthResponse = serde_json::from_str(&body).map_err(|e| {
            ChatError::Inference(format!("unexpected health payload: {} ({})", body, e))
        })?;

        Ok(health.status)
    }
}

#[async_trait]
impl InferenceClient for LlamaServerClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.post(messages, false).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Inference(format!("failed to decode response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChatError::Inference("no content in LLM response".to_string()).into())
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<DeltaStream> {
        let response = self.post(messages, true).await?;
        Ok(delta_stream(response.bytes_stream()))
    }
}
