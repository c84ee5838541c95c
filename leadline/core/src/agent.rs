//! Lead Agent - Conversation Orchestration
//!
//! The agent is the single entry point the channel adapters talk to. It owns
//! the conversation registry and the reply generator and runs the per-message
//! sequence for both channels:
//!
//! ```text
//! inbound text ──► command? ──yes──► reset / stop (no model call)
//!                     │
//!                     no
//!                     ▼
//!              record_inbound ──► reclassify ──► generate ──► record_outbound
//!              └───────────── conversation mutex held throughout ─────────────┘
//! ```
//!
//! # Design Philosophy
//!
//! Every inbound event gets an answer. Model failures become fallback replies
//! inside the generator, so the agent's handlers are infallible. Outbound work
//! that needs configuration (sending, calling) lives in the provider layer and
//! reports its own errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::ChatBackend;
use crate::conversation::{Channel, ConversationId, ConversationRegistry};
use crate::error::AgentError;
use crate::followup::FollowUpPolicy;
use crate::lead::{LeadSnapshot, LeadState};
use crate::persona::{ReplyProfile, OPT_OUT_ACK, RESET_GREETING};
use crate::provider::Messenger;
use crate::reply::{ReplyGenerator, ReplyOutcome};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Follow-up limits and minimum interval
    pub policy: FollowUpPolicy,
    /// Generation settings for WhatsApp
    pub text: ReplyProfile,
    /// Generation settings for phone calls
    pub voice: ReplyProfile,
    /// Upper bound on one chat call
    pub llm_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            policy: FollowUpPolicy::default(),
            text: ReplyProfile::text(),
            voice: ReplyProfile::voice(),
            llm_timeout: Duration::from_secs(30),
        }
    }
}

impl AgentConfig {
    /// Profile for a channel
    pub fn profile(&self, channel: Channel) -> &ReplyProfile {
        match channel {
            Channel::WhatsApp => &self.text,
            Channel::Voice => &self.voice,
        }
    }
}

/// Event identifier (for log correlation)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Generate a new random ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message from a lead
#[derive(Clone, Debug)]
pub struct InboundEvent {
    /// Correlation ID
    pub event_id: EventId,
    /// Sender address on the channel
    pub sender_id: String,
    /// Message text (already trimmed by the adapter)
    pub text: String,
    /// When the message arrived
    pub timestamp: DateTime<Utc>,
}

impl InboundEvent {
    /// Create an event stamped with the current time
    pub fn new(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::at(sender_id, text, Utc::now())
    }

    /// Create an event with an explicit timestamp
    pub fn at(
        sender_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            sender_id: sender_id.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Text commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Start the conversation over
    Reset,
    /// Opt out of automated contact
    Stop,
}

impl Command {
    /// Recognise a command (whole message, case-insensitive)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("reset") {
            Some(Self::Reset)
        } else if text.eq_ignore_ascii_case("stop") {
            Some(Self::Stop)
        } else {
            None
        }
    }
}

/// Where a reply came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Written by the model
    Generated,
    /// Canned text after a model failure
    Fallback,
    /// Greeting after `reset`
    Greeting,
    /// Acknowledgment of `stop`
    OptOut,
}

/// A reply to send back on the channel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    /// Reply text
    pub text: String,
    /// Origin of the text
    pub kind: ReplyKind,
}

impl OutboundReply {
    fn new(text: impl Into<String>, kind: ReplyKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

impl From<ReplyOutcome> for OutboundReply {
    fn from(outcome: ReplyOutcome) -> Self {
        match outcome {
            ReplyOutcome::Generated(text) => Self::new(text, ReplyKind::Generated),
            ReplyOutcome::Fallback(text) => Self::new(text, ReplyKind::Fallback),
        }
    }
}

/// Result of one follow-up attempt
#[derive(Debug)]
pub enum FollowUpOutcome {
    /// Unknown conversation, or the policy declined
    NotDue,
    /// The model gave no usable text; nothing was sent
    Skipped,
    /// Sent and recorded on the lead
    Delivered {
        /// Text sent
        text: String,
        /// Provider message ID
        sid: String,
    },
    /// The messenger rejected the message; the lead is unchanged
    Failed(AgentError),
}

impl FollowUpOutcome {
    /// Text that reached the lead, if any
    pub fn delivered_text(&self) -> Option<&str> {
        match self {
            Self::Delivered { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// The sales agent
pub struct LeadAgent<B: ChatBackend> {
    registry: ConversationRegistry,
    generator: ReplyGenerator<B>,
    config: AgentConfig,
}

impl<B: ChatBackend> Clone for LeadAgent<B> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            generator: self.generator.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: ChatBackend> LeadAgent<B> {
    /// Create an agent with an empty registry
    pub fn new(backend: B, config: AgentConfig) -> Self {
        Self::with_backend(Arc::new(backend), config)
    }

    /// Create an agent sharing an existing backend
    pub fn with_backend(backend: Arc<B>, config: AgentConfig) -> Self {
        let generator = ReplyGenerator::new(backend, config.llm_timeout);
        Self {
            registry: ConversationRegistry::new(),
            generator,
            config,
        }
    }

    /// Live conversations
    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The chat backend
    pub fn backend(&self) -> &B {
        self.generator.backend()
    }

    /// Handle one WhatsApp message
    pub async fn handle_text(&self, event: InboundEvent) -> OutboundReply {
        let id = ConversationId::whatsapp(&event.sender_id);
        let handle = self.registry.conversation(&id);
        let mut lead = handle.lock().await;

        tracing::debug!(
            conversation = %id,
            event_id = %event.event_id,
            chars = event.text.chars().count(),
            "Inbound text"
        );

        match Command::parse(&event.text) {
            Some(Command::Reset) => {
                lead.reset();
                lead.touch(event.timestamp);
                tracing::info!(conversation = %id, "Conversation reset by lead");
                OutboundReply::new(RESET_GREETING, ReplyKind::Greeting)
            }
            Some(Command::Stop) => {
                lead.set_dnc();
                tracing::info!(conversation = %id, "Lead opted out");
                OutboundReply::new(OPT_OUT_ACK, ReplyKind::OptOut)
            }
            None => {
                self.converse(&id, &mut lead, &event.text, event.timestamp)
                    .await
            }
        }
    }

    /// Start tracking a call
    pub fn open_call(&self, call_sid: &str) {
        let id = ConversationId::voice(call_sid);
        self.registry.conversation(&id);
        tracing::info!(call_sid, "Call connected");
    }

    /// Handle one transcribed utterance on a call
    ///
    /// Commands are not interpreted on calls.
    pub async fn handle_voice(&self, call_sid: &str, text: &str, now: DateTime<Utc>) -> OutboundReply {
        let id = ConversationId::voice(call_sid);
        let handle = self.registry.conversation(&id);
        let mut lead = handle.lock().await;
        self.converse(&id, &mut lead, text, now).await
    }

    /// Stop tracking a call; returns whether it was known
    pub fn close_call(&self, call_sid: &str) -> bool {
        let closed = self
            .registry
            .remove(&ConversationId::voice(call_sid))
            .is_some();
        if closed {
            tracing::info!(call_sid, "Call ended");
        }
        closed
    }

    /// Send a follow-up for a conversation if it is due
    ///
    /// The conversation stays locked from the policy check through delivery.
    /// The lead is only updated once the messenger accepts the message, so a
    /// failed send leaves count, stage and history as they were. Fallback
    /// replies are never sent as follow-ups.
    pub async fn follow_up<M: Messenger + ?Sized>(
        &self,
        id: &ConversationId,
        messenger: &M,
        now: DateTime<Utc>,
    ) -> FollowUpOutcome {
        let Some(handle) = self.registry.get(id) else {
            return FollowUpOutcome::NotDue;
        };
        let mut lead = handle.lock().await;

        if let Err(reason) = self.config.policy.check(&lead, now) {
            tracing::trace!(conversation = %id, ?reason, "Follow-up not due");
            return FollowUpOutcome::NotDue;
        }

        let profile = self.config.profile(id.channel);
        let text = match self.generator.draft(&lead, profile, true).await {
            ReplyOutcome::Generated(text) => text,
            ReplyOutcome::Fallback(_) => {
                tracing::warn!(conversation = %id, "Follow-up skipped, model unavailable");
                return FollowUpOutcome::Skipped;
            }
        };

        match messenger.send_message(&id.address, &text).await {
            Ok(sid) => {
                lead.record_outbound(&text, now, true);
                lead.enter_follow_up();
                tracing::info!(
                    conversation = %id,
                    sid = %sid,
                    category = %lead.category(),
                    follow_up_count = lead.follow_up_count(),
                    "Follow-up delivered"
                );
                FollowUpOutcome::Delivered { text, sid }
            }
            Err(e) => {
                tracing::error!(
                    conversation = %id,
                    messenger = messenger.name(),
                    error = %e,
                    "Failed to deliver follow-up"
                );
                FollowUpOutcome::Failed(e)
            }
        }
    }

    /// Snapshot of every conversation
    pub async fn snapshots(&self) -> Vec<(ConversationId, LeadSnapshot)> {
        self.registry.snapshots().await.into_iter().collect()
    }

    async fn converse(
        &self,
        id: &ConversationId,
        lead: &mut LeadState,
        text: &str,
        now: DateTime<Utc>,
    ) -> OutboundReply {
        lead.record_inbound(text, now);

        let change = lead.reclassify(text);
        if change.changed() {
            tracing::info!(
                conversation = %id,
                from = %change.previous,
                to = %change.current,
                "Lead reclassified"
            );
        }

        let profile = self.config.profile(id.channel);
        let outcome = self.generator.generate(lead, profile, false, now).await;
        if !outcome.is_generated() {
            tracing::warn!(conversation = %id, "Sent fallback reply");
        }
        outcome.into()
    }
}
