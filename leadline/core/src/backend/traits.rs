//! Chat Backend Traits
//!
//! Trait definitions for chat-completion backends. The reply generator talks
//! to this trait only, so the hosted provider can be swapped (or scripted in
//! tests) without touching conversation logic.
//!
//! Implementations handle provider-specific details (API formats, auth, etc.)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Speaker of a chat message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions to the model
    System,
    /// The lead (or a synthetic instruction posing as them)
    User,
    /// The agent
    Assistant,
}

/// One entry of the ordered message list sent to the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion request
#[derive(Clone, Debug)]
pub struct ChatRequest {
    /// Model to use (backend-specific identifier)
    pub model: String,
    /// Ordered conversation
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens in response (0 = provider default)
    pub max_tokens: u32,
    /// Temperature (0.0-2.0, higher = more creative)
    pub temperature: f32,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 0,
            temperature: 0.8,
        }
    }
}

impl ChatRequest {
    /// Create a new request for a model
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from a chat-completion request
#[derive(Clone, Debug, Default)]
pub struct ChatResponse {
    /// Generated text, trimmed (`None` when the provider returned nothing)
    pub content: Option<String>,
    /// Model that generated the response
    pub model: String,
    /// Tokens used (if available)
    pub tokens_used: Option<u32>,
    /// Response generation time in milliseconds
    pub duration_ms: Option<u64>,
}

impl ChatResponse {
    /// Generated text if present and non-empty
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Chat backend trait
///
/// Implement this trait to add support for different chat providers.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Get the backend name (e.g., "OpenAI")
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Send a request and wait for the complete response
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse>;
}

/// Backend connection configuration
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// API key for bearer authentication
    pub api_key: String,
    /// Base URL up to and including the version segment
    pub base_url: String,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}
