//! Twilio REST client
//!
//! # API
//!
//! - `POST /2010-04-01/Accounts/{sid}/Messages.json` - send a message
//! - `POST /2010-04-01/Accounts/{sid}/Calls.json` - place a call
//!
//! Both take form-encoded bodies and HTTP basic auth (account SID, auth
//! token) and answer with a JSON resource carrying a `sid`.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::Messenger;
use crate::error::{AgentError, AgentResult};

/// Production API host
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio credentials and sender identities
#[derive(Clone, Debug)]
pub struct TwilioConfig {
    /// Account SID (basic-auth user)
    pub account_sid: String,
    /// Auth token (basic-auth password)
    pub auth_token: String,
    /// WhatsApp sender, e.g. `whatsapp:+14155238886`
    pub whatsapp_from: Option<String>,
    /// Voice caller ID
    pub phone_number: Option<String>,
    /// API host (overridable for tests)
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
}

/// Twilio messenger
#[derive(Clone)]
pub struct TwilioMessenger {
    config: TwilioConfig,
    http_client: reqwest::Client,
}

impl TwilioMessenger {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: TwilioConfig) -> AgentResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{resource}.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn create(&self, resource: &str, form: &[(&str, &str)]) -> AgentResult<String> {
        let response = self
            .http_client
            .post(self.resource_url(resource))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response.json().await?;
        data.get("sid")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AgentError::Malformed(format!("{resource} response has no sid")))
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> AgentResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AgentError::MissingConfiguration(format!("{name} is not set")))
}

#[async_trait]
impl Messenger for TwilioMessenger {
    fn name(&self) -> &str {
        "Twilio"
    }

    async fn send_message(&self, to: &str, body: &str) -> AgentResult<String> {
        let from = required(self.config.whatsapp_from.as_deref(), "WHATSAPP_FROM")?;
        let to = required(Some(to), "message destination")?;

        let sid = self
            .create("Messages", &[("To", to), ("From", from), ("Body", body)])
            .await?;
        tracing::info!(to, sid = %sid, "Message sent");
        Ok(sid)
    }

    async fn place_call(&self, to: &str, twiml_url: &str) -> AgentResult<String> {
        let from = required(self.config.phone_number.as_deref(), "TWILIO_PHONE_NUMBER")?;
        let to = required(Some(to), "call destination")?;

        let sid = self
            .create(
                "Calls",
                &[("To", to), ("From", from), ("Url", twiml_url), ("Method", "GET")],
            )
            .await?;
        tracing::info!(to, sid = %sid, "Call placed");
        Ok(sid)
    }
}
