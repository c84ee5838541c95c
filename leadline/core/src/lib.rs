//! Leadline Core - Conversational Insurance Sales Agent
//!
//! This crate holds everything the agent knows: lead state, keyword
//! classification, follow-up policy, prompt assembly, and the Twilio wire
//! shapes. It has no HTTP server; the daemon crate wires these pieces to
//! webhooks and sockets.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Channel Adapters                          │
//! │   WhatsApp webhook (form → TwiML)   ConversationRelay (WS JSON)   │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ InboundEvent / prompt text
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                            LeadAgent                              │
//! │  ┌──────────────────┐  ┌────────────┐  ┌───────────────────────┐  │
//! │  │ Conversation     │  │ Classifier │  │ ReplyGenerator        │  │
//! │  │ Registry         │  │ (keywords) │  │ (persona + context)   │  │
//! │  │ id → LeadState   │  └────────────┘  └───────────┬───────────┘  │
//! │  └──────────────────┘                              │              │
//! │  ┌──────────────────┐                  ┌───────────▼───────────┐  │
//! │  │ FollowUpPolicy   │◄── Scheduler     │ ChatBackend (OpenAI)  │  │
//! │  └──────────────────┘        │         └───────────────────────┘  │
//! └──────────────────────────────┼───────────────────────────────────┘
//!                                ▼
//!                     Messenger (Twilio REST)
//! ```
//!
//! # Key Types
//!
//! - [`LeadAgent`]: Runs the per-message sequence for both channels
//! - [`LeadState`]: Category, stage, notes, opt-out flag and history of one lead
//! - [`FollowUpPolicy`]: Whether a lead may receive another automated nudge
//! - [`ReplyGenerator`]: Prompt assembly and the single-attempt model call
//! - [`FollowUpScheduler`]: Periodic follow-up delivery
//!
//! # Quick Start
//!
//! ```ignore
//! use leadline_core::{
//!     load_config, LeadAgent, InboundEvent,
//!     backend::OpenAiBackend,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = OpenAiBackend::from_config(&config.backend_config())?;
//!     let agent = LeadAgent::new(backend, config.agent_config());
//!
//!     let reply = agent
//!         .handle_text(InboundEvent::new("whatsapp:+60123456789", "how much for family plan?"))
//!         .await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`lead`]: Lead state record and its mutators
//! - [`classifier`]: Keyword-tier category classifier
//! - [`followup`]: Follow-up eligibility policy
//! - [`persona`]: Persona prompts, canned replies, per-channel profiles
//! - [`backend`]: Chat-completion backend abstraction (OpenAI-compatible)
//! - [`reply`]: Reply generation with fallbacks
//! - [`conversation`]: Conversation identity and registry
//! - [`agent`]: The lead agent
//! - [`channel`]: Twilio webhook and ConversationRelay wire shapes
//! - [`provider`]: Outbound messaging (Twilio REST)
//! - [`scheduler`]: Follow-up scheduler task
//! - [`config`]: Layered configuration (TOML, environment, CLI)
//! - [`error`]: Outbound operation errors

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod backend;
pub mod channel;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod error;
pub mod followup;
pub mod lead;
pub mod persona;
pub mod provider;
pub mod reply;
pub mod scheduler;

// Re-exports for convenience
pub use agent::{
    AgentConfig, Command, EventId, FollowUpOutcome, InboundEvent, LeadAgent, OutboundReply,
    ReplyKind,
};
pub use backend::{
    BackendConfig, ChatBackend, ChatMessage, ChatRequest, ChatResponse, ChatRole, OpenAiBackend,
};
pub use classifier::classify;
pub use conversation::{Channel, ConversationId, ConversationRegistry, LeadHandle};
pub use error::{AgentError, AgentResult};
pub use followup::{
    check_eligibility, is_eligible_for_follow_up, FollowUpLimits, FollowUpPolicy, Ineligibility,
};
pub use lead::{Category, LeadSnapshot, LeadState, Reclassification, Stage, Turn, TurnRole};
pub use persona::ReplyProfile;
pub use provider::{Messenger, TwilioConfig, TwilioMessenger};
pub use reply::{ReplyGenerator, ReplyOutcome};
pub use scheduler::{FollowUpScheduler, TickReport};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env,
    ConfigError, ConfigOverrides, ConfigSource, LeadlineConfig, LeadlineToml,
};
