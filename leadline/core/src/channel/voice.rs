//! Voice calls (Twilio ConversationRelay)
//!
//! Twilio handles speech recognition and synthesis; we exchange text over a
//! WebSocket.
//!
//! # Protocol
//!
//! ```text
//! Twilio ──► {"type":"setup","callSid":"CA…"}
//! Twilio ──► {"type":"prompt","voicePrompt":"how much is it?"}
//! us     ──► {"type":"text","token":"Around fifty ringgit a month lah","last":true}
//! Twilio ──► {"type":"interrupt", …} | {"type":"dtmf","digit":"1"} | {"type":"error", …}
//! ```

use serde::{Deserialize, Serialize};

use super::xml_escape;
use crate::persona::WELCOME_GREETING;

/// Default ElevenLabs voice
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";

/// Messages Twilio sends over the relay socket
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayMessage {
    /// Call connected
    Setup {
        /// Call identifier
        #[serde(rename = "callSid", default)]
        call_sid: String,
    },
    /// Caller finished an utterance
    Prompt {
        /// Transcribed speech
        #[serde(rename = "voicePrompt", default)]
        voice_prompt: String,
    },
    /// Caller talked over the agent
    Interrupt {
        /// What had been spoken when the caller cut in
        #[serde(rename = "utteranceUntilInterrupt", default)]
        utterance_until_interrupt: String,
    },
    /// Keypad press
    Dtmf {
        /// Key pressed
        #[serde(default)]
        digit: String,
    },
    /// Relay-side error
    Error {
        /// Error text from Twilio
        #[serde(default)]
        description: String,
    },
    /// Anything else
    #[serde(other)]
    Unknown,
}

impl RelayMessage {
    /// Decode one socket frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object with a string `type`.
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Messages we send over the relay socket
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayCommand {
    /// Text to speak
    Text {
        /// Text, whole reply in one token
        token: String,
        /// Whether this is the final token of the reply
        last: bool,
    },
}

impl RelayCommand {
    /// A complete reply in one frame
    pub fn speak(text: impl Into<String>) -> Self {
        Self::Text {
            token: text.into(),
            last: true,
        }
    }

    /// Encode as a socket frame
    pub fn encode(&self) -> String {
        // Serialising a string-only enum cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Voice settings for the connect document
#[derive(Clone, Debug)]
pub struct VoiceSettings {
    /// ElevenLabs voice ID
    pub voice_id: String,
    /// First thing said on connect
    pub welcome_greeting: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            welcome_greeting: WELCOME_GREETING.to_string(),
        }
    }
}

/// Relay socket URL for a public host
pub fn relay_url(public_host: &str) -> String {
    format!("wss://{public_host}/ws")
}

/// Render the TwiML that connects a call to the relay socket
pub fn connect_response(ws_url: &str, settings: &VoiceSettings) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
            "<Response><Connect>",
            "<ConversationRelay url=\"{}\" ttsProvider=\"ElevenLabs\" voice=\"{}\" ",
            "welcomeGreeting=\"{}\" interruptible=\"true\"/>",
            "</Connect></Response>"
        ),
        xml_escape(ws_url),
        xml_escape(&settings.voice_id),
        xml_escape(&settings.welcome_greeting),
    )
}
