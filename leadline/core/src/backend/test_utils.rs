//! Scripted Backend for Tests
//!
//! A [`ChatBackend`] that plays back queued outcomes instead of calling a
//! provider, and remembers every request it was given.
//!
//! # Usage
//!
//! ```ignore
//! use leadline_core::backend::test_utils::ScriptedBackend;
//!
//! let backend = ScriptedBackend::new();
//! backend.push_reply("Eh hello!");
//! backend.push_failure("connection reset");
//!
//! // ... drive the agent ...
//!
//! assert_eq!(backend.request_count(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::{ChatBackend, ChatRequest, ChatResponse};

/// One queued outcome
#[derive(Clone, Debug)]
pub enum ScriptedOutcome {
    /// Respond with this content
    Reply(String),
    /// Respond successfully with no content
    Empty,
    /// Fail with this error message
    Failure(String),
    /// Sleep before replying (exercises timeouts)
    Delayed(Duration, String),
}

/// Test double that replays scripted outcomes
///
/// Clones share the same script and request log. When the script runs dry
/// the backend keeps answering with the default reply.
#[derive(Clone)]
pub struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    default_reply: String,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Create an empty script answering "ok" by default
    pub fn new() -> Self {
        Self::with_default_reply("ok")
    }

    /// Create an empty script with a custom default reply
    pub fn with_default_reply(reply: impl Into<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_reply: reply.into(),
        }
    }

    /// Queue an outcome
    pub fn push(&self, outcome: ScriptedOutcome) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(outcome);
    }

    /// Queue a successful reply
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.push(ScriptedOutcome::Reply(reply.into()));
    }

    /// Queue an empty response
    pub fn push_empty(&self) {
        self.push(ScriptedOutcome::Empty);
    }

    /// Queue a failure
    pub fn push_failure(&self, error: impl Into<String>) {
        self.push(ScriptedOutcome::Failure(error.into()));
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("request lock poisoned").len()
    }

    /// All requests received, oldest first
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("request lock poisoned").clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .last()
            .cloned()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        self.requests
            .lock()
            .expect("request lock poisoned")
            .push(request.clone());

        let outcome = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| ScriptedOutcome::Reply(self.default_reply.clone()));

        let content = match outcome {
            ScriptedOutcome::Reply(text) => Some(text),
            ScriptedOutcome::Empty => None,
            ScriptedOutcome::Failure(error) => anyhow::bail!(error),
            ScriptedOutcome::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Some(text)
            }
        };

        Ok(ChatResponse {
            content,
            model: request.model.clone(),
            tokens_used: None,
            duration_ms: Some(0),
        })
    }
}
