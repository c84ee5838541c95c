//! OpenAI-compatible Backend
//!
//! Chat backend for any provider that speaks the OpenAI chat-completions
//! protocol (OpenAI itself, RedPill, local gateways).
//!
//! # API
//!
//! - `POST {base}/chat/completions` - chat completion (non-streaming)
//! - `GET {base}/models` - list models, used as a health probe

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;

use super::traits::{BackendConfig, ChatBackend, ChatMessage, ChatRequest, ChatResponse};

/// OpenAI-compatible backend client
#[derive(Clone)]
pub struct OpenAiBackend {
    /// Bearer token
    api_key: String,
    /// Base URL without trailing slash
    base_url: String,
    /// HTTP client
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    temperature: f32,
}

impl OpenAiBackend {
    /// Create a new backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url,
            http_client,
        })
    }

    /// Create from [`BackendConfig`]
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        Self::new(config.api_key.clone(), config.base_url.clone(), config.timeout)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    fn build_body<'a>(request: &'a ChatRequest) -> CompletionBody<'a> {
        CompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: (request.max_tokens > 0).then_some(request.max_tokens),
            temperature: request.temperature,
        }
    }
}

/// Pull the first choice's content out of a completion payload
fn extract_content(data: &serde_json::Value) -> Option<String> {
    data.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.trim().to_string())
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();

        let response = self
            .http_client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&Self::build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat API returned {status}: {body}");
        }

        let data: serde_json::Value = response.json().await?;

        let content = extract_content(&data);
        if content.is_none() {
            tracing::warn!(payload = %data, "Chat API response had no message content");
        }

        let tokens_used = data
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u32::try_from(c).ok());

        let model = data
            .get("model")
            .and_then(|m| m.as_str())
            .unwrap_or(request.model.as_str())
            .to_string();

        Ok(ChatResponse {
            content,
            model,
            tokens_used,
            duration_ms: u64::try_from(start.elapsed().as_millis()).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_creation() {
        let backend =
            OpenAiBackend::new("key", "https://api.redpill.ai/v1/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(backend.base_url(), "https://api.redpill.ai/v1");
        assert_eq!(
            backend.completions_url(),
            "https://api.redpill.ai/v1/chat/completions"
        );
        assert_eq!(backend.models_url(), "https://api.redpill.ai/v1/models");
    }

    #[test]
    fn test_build_body() {
        let request = ChatRequest::new(
            "openai/gpt-oss-20b",
            vec![ChatMessage::system("persona"), ChatMessage::user("hi")],
        )
        .with_max_tokens(300)
        .with_temperature(0.8);

        let json = serde_json::to_value(OpenAiBackend::build_body(&request)).unwrap();
        assert_eq!(json["model"], "openai/gpt-oss-20b");
        assert_eq!(json["max_tokens"], 300);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_build_body_omits_zero_max_tokens() {
        let request = ChatRequest::new("m", vec![]);
        let json = serde_json::to_value(OpenAiBackend::build_body(&request)).unwrap();
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_extract_content() {
        let data = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Eh hello!  "}}]
        });
        assert_eq!(extract_content(&data), Some("Eh hello!".to_string()));

        let empty = serde_json::json!({"choices": []});
        assert_eq!(extract_content(&empty), None);

        let null_content = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        assert_eq!(extract_content(&null_content), None);
    }

    #[test]
    fn test_from_config() {
        let config = BackendConfig {
            api_key: "k".to_string(),
            base_url: "http://localhost:8000/v1".to_string(),
            timeout: Duration::from_secs(1),
        };
        let backend = OpenAiBackend::from_config(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000/v1");
    }
}
