//! Agent Errors
//!
//! Failures of outbound-initiated operations (sending a message, placing a
//! call). Inbound handling never fails: chat problems degrade to fallback
//! replies, so nothing here reaches a lead.

use thiserror::Error;

/// Errors from outbound provider operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// A required setting is absent
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    /// The provider answered with a non-success status
    #[error("Provider returned {status}: {body}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Response body as text
        body: String,
    },

    /// Transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with something we could not read
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl AgentError {
    /// Whether the caller can fix this by configuring the service
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingConfiguration(_))
    }
}

/// Result alias for outbound operations
pub type AgentResult<T> = Result<T, AgentError>;
