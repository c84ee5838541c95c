//! WhatsApp webhook (Twilio Messaging)
//!
//! Twilio posts `application/x-www-form-urlencoded` bodies and expects a
//! TwiML `MessagingResponse` back. Only `Body` and `From` are used.

use serde::Deserialize;

use super::xml_escape;
use crate::agent::InboundEvent;

/// Fields read from the messaging webhook
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WhatsAppWebhook {
    /// Message text
    #[serde(rename = "Body", default)]
    pub body: String,
    /// Sender, e.g. `whatsapp:+60123456789`
    #[serde(rename = "From", default)]
    pub from: String,
}

impl WhatsAppWebhook {
    /// Convert to an inbound event (text trimmed)
    pub fn into_event(self) -> InboundEvent {
        InboundEvent::new(self.from, self.body.trim())
    }
}

/// Render a `MessagingResponse` with a single message
pub fn messaging_response(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(message)
    )
}
