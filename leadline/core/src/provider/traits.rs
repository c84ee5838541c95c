use async_trait::async_trait;

use crate::error::AgentResult;

/// Outbound messaging and calling
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Send a message; returns the provider's message ID
    async fn send_message(&self, to: &str, body: &str) -> AgentResult<String>;

    /// Place a call that fetches its instructions from `twiml_url`;
    /// returns the provider's call ID
    async fn place_call(&self, to: &str, twiml_url: &str) -> AgentResult<String>;
}
