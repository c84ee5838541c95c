//! Channel Adapters
//!
//! Wire shapes for the two Twilio entry points:
//!
//! - [`text`]: WhatsApp webhook form and `MessagingResponse` TwiML
//! - [`voice`]: ConversationRelay connect TwiML and its WebSocket messages
//!
//! The adapters only translate. Conversation logic lives in
//! [`LeadAgent`](crate::agent::LeadAgent).

pub mod text;
pub mod voice;

pub use text::{messaging_response, WhatsAppWebhook};
pub use voice::{connect_response, RelayCommand, RelayMessage, VoiceSettings};

/// Escape text for XML element content and attribute values
pub fn xml_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Content type for TwiML documents
pub const TWIML_CONTENT_TYPE: &str = "text/xml";
