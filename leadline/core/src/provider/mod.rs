//! Messaging Provider Abstraction
//!
//! Outbound-initiated actions: sending a WhatsApp message the lead did not
//! directly ask for (follow-ups) and placing phone calls.
//!
//! Replies to inbound webhooks do not go through here; they are returned
//! inline as TwiML.

mod traits;
pub mod test_utils;
mod twilio;

pub use traits::Messenger;
pub use twilio::{TwilioConfig, TwilioMessenger, DEFAULT_API_BASE};
