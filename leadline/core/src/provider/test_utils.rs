//! Recording Messenger for Tests
//!
//! Keeps every message and call in memory instead of contacting a provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::Messenger;
use crate::error::{AgentError, AgentResult};

/// A sent message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Destination
    pub to: String,
    /// Text
    pub body: String,
}

/// Test double that records outbound traffic
///
/// Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingMessenger {
    messages: Arc<Mutex<Vec<SentMessage>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    fail_sends: bool,
}

impl RecordingMessenger {
    /// Create a messenger that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a messenger whose sends fail with a provider error
    pub fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::default()
        }
    }

    /// Messages sent so far
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().expect("message log poisoned").clone()
    }

    /// Calls placed so far as `(to, twiml_url)`
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn send_message(&self, to: &str, body: &str) -> AgentResult<String> {
        if self.fail_sends {
            return Err(AgentError::Provider {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut messages = self.messages.lock().expect("message log poisoned");
        messages.push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(format!("SM{}", messages.len()))
    }

    async fn place_call(&self, to: &str, twiml_url: &str) -> AgentResult<String> {
        if self.fail_sends {
            return Err(AgentError::Provider {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut calls = self.calls.lock().expect("call log poisoned");
        calls.push((to.to_string(), twiml_url.to_string()));
        Ok(format!("CA{}", calls.len()))
    }
}
