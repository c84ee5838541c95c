//! Reply Generation
//!
//! Turns a lead's state into a chat request, calls the backend once, and
//! absorbs every failure into a canned fallback.
//!
//! # Request layout
//!
//! ```text
//! system     persona instruction
//! system     [INTERNAL CONTEXT - category, stage, notes, follow-up marker]
//! user/asst  last 10 history turns
//! user       follow-up instruction          (follow-ups only)
//! ```
//!
//! The inbound message is already the newest history turn by the time the
//! generator runs. Only a non-empty generated reply is written back to the
//! lead; fallbacks leave history alone.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backend::{ChatBackend, ChatMessage, ChatRequest};
use crate::lead::{LeadState, Turn, TurnRole};
use crate::persona::{ReplyProfile, FOLLOW_UP_INSTRUCTION};

/// History turns included in the model context
pub const CONTEXT_TURNS: usize = 10;

/// What the generator produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Model reply, recorded as an assistant turn
    Generated(String),
    /// Canned reply, history untouched
    Fallback(String),
}

impl ReplyOutcome {
    /// Text to send
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) | Self::Fallback(text) => text,
        }
    }

    /// Consume into the text to send
    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) | Self::Fallback(text) => text,
        }
    }

    /// Whether the model produced this reply
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Builds requests and runs the single-attempt backend call
pub struct ReplyGenerator<B: ChatBackend> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: ChatBackend> Clone for ReplyGenerator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
        }
    }
}

impl<B: ChatBackend> ReplyGenerator<B> {
    /// Create a generator with a bound on each backend call
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// The backend in use
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Generate a reply for the lead and record it on success
    pub async fn generate(
        &self,
        lead: &mut LeadState,
        profile: &ReplyProfile,
        is_follow_up: bool,
        now: DateTime<Utc>,
    ) -> ReplyOutcome {
        let outcome = self.draft(lead, profile, is_follow_up).await;
        if let ReplyOutcome::Generated(text) = &outcome {
            lead.record_outbound(text, now, is_follow_up);
        }
        outcome
    }

    /// Generate a reply without touching the lead
    ///
    /// Callers that must deliver the text before it counts as said record it
    /// themselves with [`LeadState::record_outbound`].
    pub async fn draft(
        &self,
        lead: &LeadState,
        profile: &ReplyProfile,
        is_follow_up: bool,
    ) -> ReplyOutcome {
        let request = build_request(lead, profile, is_follow_up);

        let result = tokio::time::timeout(self.timeout, self.backend.complete(&request)).await;

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(
                    backend = self.backend.name(),
                    error = %e,
                    "Chat backend call failed"
                );
                return ReplyOutcome::Fallback(profile.error_fallback.clone());
            }
            Err(_) => {
                tracing::error!(
                    backend = self.backend.name(),
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Chat backend call timed out"
                );
                return ReplyOutcome::Fallback(profile.error_fallback.clone());
            }
        };

        match response.text() {
            Some(text) => {
                let text = text.to_string();
                tracing::debug!(
                    model = %response.model,
                    tokens = ?response.tokens_used,
                    duration_ms = ?response.duration_ms,
                    "Reply generated"
                );
                ReplyOutcome::Generated(text)
            }
            None => {
                tracing::warn!(model = %response.model, "Chat backend returned an empty reply");
                ReplyOutcome::Fallback(profile.empty_fallback.clone())
            }
        }
    }
}

/// The context instruction describing the lead to the model
pub fn context_instruction(lead: &LeadState, is_follow_up: bool) -> String {
    let notes = if lead.notes().is_empty() {
        "none"
    } else {
        lead.notes()
    };
    format!(
        "[INTERNAL CONTEXT - Current lead status: {}, Stage: {}, Notes: {}{}]",
        lead.category().as_str().to_uppercase(),
        lead.stage(),
        notes,
        if is_follow_up {
            ", This is a FOLLOW-UP message"
        } else {
            ""
        }
    )
}

/// Assemble the ordered message list for a lead
pub fn build_request(lead: &LeadState, profile: &ReplyProfile, is_follow_up: bool) -> ChatRequest {
    let mut messages = Vec::with_capacity(CONTEXT_TURNS + 3);
    messages.push(ChatMessage::system(profile.persona.clone()));
    messages.push(ChatMessage::system(context_instruction(lead, is_follow_up)));
    messages.extend(lead.recent_turns(CONTEXT_TURNS).iter().map(turn_to_message));

    if is_follow_up {
        messages.push(ChatMessage::user(FOLLOW_UP_INSTRUCTION));
    }

    ChatRequest::new(profile.model.clone(), messages)
        .with_max_tokens(profile.max_tokens)
        .with_temperature(profile.temperature)
}

fn turn_to_message(turn: &Turn) -> ChatMessage {
    match turn.role {
        TurnRole::User => ChatMessage::user(turn.content.clone()),
        TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
    }
}
