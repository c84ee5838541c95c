//! Chat Backend Integration
//!
//! This module provides abstracted access to hosted chat-completion APIs
//! through a common trait interface.
//!
//! # Available Backends
//!
//! - **OpenAI-compatible**: OpenAI, RedPill, or anything speaking `/chat/completions`
//! - **Scripted**: canned replies and failures for tests ([`test_utils`])
//!
//! # Usage
//!
//! ```ignore
//! use leadline_core::backend::{ChatBackend, ChatMessage, ChatRequest, OpenAiBackend};
//!
//! let backend = OpenAiBackend::new(api_key, "https://api.openai.com/v1", timeout)?;
//! let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hello!")]);
//! let response = backend.complete(&request).await?;
//! ```

mod openai;
pub mod test_utils;
mod traits;

pub use openai::OpenAiBackend;
pub use traits::{BackendConfig, ChatBackend, ChatMessage, ChatRequest, ChatResponse, ChatRole};
