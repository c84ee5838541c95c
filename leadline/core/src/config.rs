//! TOML Configuration File Support
//!
//! Centralized configuration loading for the agent, supporting a TOML file at
//! `~/.config/leadline/leadline.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! Environment variable names match the Twilio/ngrok tutorials the demo is
//! usually set up from (`TWILIO_ACCOUNT_SID`, `NGROK_URL`, ...). Empty
//! variables count as unset.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! port = 3000
//! public_host = "abc123.ngrok-free.app"
//!
//! [model]
//! redpill_api_key = "sk-..."
//! text_model = "openai/gpt-oss-20b"
//! voice_model = "gpt-4o-mini"
//! timeout_secs = 30
//!
//! [followup]
//! interval_minutes = 3
//! check_interval_secs = 30
//! limits = { hot = 8, warm = 5, cold = 3 }
//!
//! [twilio]
//! account_sid = "AC..."
//! auth_token = "..."
//! whatsapp_from = "whatsapp:+14155238886"
//! phone_number = "+15551234567"
//!
//! [voice]
//! voice_id = "EXAVITQu4vr4xnSDxMaL"
//!
//! [persona]
//! text = "You are Sarah..."
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::AgentConfig;
use crate::backend::BackendConfig;
use crate::channel::VoiceSettings;
use crate::followup::{FollowUpLimits, FollowUpPolicy};
use crate::persona::ReplyProfile;
use crate::provider::{TwilioConfig, DEFAULT_API_BASE};
use crate::scheduler::DEFAULT_CHECK_INTERVAL;

/// RedPill gateway, used when a RedPill key is configured
pub const REDPILL_BASE_URL: &str = "https://api.redpill.ai/v1";

/// OpenAI API
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Twilio WhatsApp sandbox sender
pub const DEFAULT_WHATSAPP_FROM: &str = "whatsapp:+14155238886";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[server]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen port
    pub port: Option<u16>,
    /// Public hostname Twilio reaches us on (no scheme)
    pub public_host: Option<String>,
}

/// `[model]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelToml {
    /// RedPill API key
    pub redpill_api_key: Option<String>,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// Explicit API base URL
    pub base_url: Option<String>,
    /// Model for WhatsApp replies
    pub text_model: Option<String>,
    /// Model for phone replies
    pub voice_model: Option<String>,
    /// Output cap for WhatsApp replies
    pub text_max_tokens: Option<u32>,
    /// Output cap for phone replies
    pub voice_max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Chat call timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[followup]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpToml {
    /// Whether the scheduler runs
    pub enabled: Option<bool>,
    /// Minimum quiet time before a follow-up
    pub interval_minutes: Option<u64>,
    /// Scheduler tick period
    pub check_interval_secs: Option<u64>,
    /// Per-category limits
    pub limits: Option<FollowUpLimits>,
}

/// `[twilio]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioToml {
    /// Account SID
    pub account_sid: Option<String>,
    /// Auth token
    pub auth_token: Option<String>,
    /// WhatsApp sender
    pub whatsapp_from: Option<String>,
    /// Voice caller ID
    pub phone_number: Option<String>,
    /// Default destination for `/call`
    pub default_call_to: Option<String>,
    /// Demo WhatsApp number shown at startup
    pub demo_to: Option<String>,
}

/// `[voice]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceToml {
    /// ElevenLabs voice ID
    pub voice_id: Option<String>,
    /// Greeting spoken on connect
    pub welcome_greeting: Option<String>,
}

/// `[persona]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaToml {
    /// WhatsApp persona override
    pub text: Option<String>,
    /// Phone persona override
    pub voice: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadlineToml {
    /// Server section
    pub server: ServerToml,
    /// Model section
    pub model: ModelToml,
    /// Follow-up section
    pub followup: FollowUpToml,
    /// Twilio section
    pub twilio: TwilioToml,
    /// Voice section
    pub voice: VoiceToml,
    /// Persona section
    pub persona: PersonaToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Chat model settings
#[derive(Clone, Debug)]
pub struct ModelSettings {
    /// RedPill API key
    pub redpill_api_key: Option<String>,
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// Explicit base URL (otherwise derived from which key is set)
    pub base_url: Option<String>,
    /// Generation settings for WhatsApp
    pub text: ReplyProfile,
    /// Generation settings for phone calls
    pub voice: ReplyProfile,
    /// Chat call timeout
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            redpill_api_key: None,
            openai_api_key: None,
            base_url: None,
            text: ReplyProfile::text(),
            voice: ReplyProfile::voice(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ModelSettings {
    /// Key to authenticate with (RedPill preferred)
    pub fn api_key(&self) -> Option<&str> {
        self.redpill_api_key
            .as_deref()
            .or(self.openai_api_key.as_deref())
    }

    /// Effective API base URL
    pub fn base_url(&self) -> &str {
        match (&self.base_url, &self.redpill_api_key) {
            (Some(url), _) => url.as_str(),
            (None, Some(_)) => REDPILL_BASE_URL,
            (None, None) => OPENAI_BASE_URL,
        }
    }
}

/// Follow-up settings
#[derive(Clone, Debug)]
pub struct FollowUpSettings {
    /// Whether the scheduler runs
    pub enabled: bool,
    /// Minimum quiet time before a follow-up
    pub interval: Duration,
    /// Scheduler tick period
    pub check_interval: Duration,
    /// Per-category limits
    pub limits: FollowUpLimits,
}

impl Default for FollowUpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(3 * 60),
            check_interval: DEFAULT_CHECK_INTERVAL,
            limits: FollowUpLimits::default(),
        }
    }
}

/// Twilio settings
#[derive(Clone, Debug)]
pub struct TwilioSettings {
    /// Account SID
    pub account_sid: Option<String>,
    /// Auth token
    pub auth_token: Option<String>,
    /// WhatsApp sender
    pub whatsapp_from: String,
    /// Voice caller ID
    pub phone_number: Option<String>,
    /// Default destination for `/call`
    pub default_call_to: Option<String>,
    /// Demo WhatsApp number
    pub demo_to: Option<String>,
}

impl Default for TwilioSettings {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            whatsapp_from: DEFAULT_WHATSAPP_FROM.to_string(),
            phone_number: None,
            default_call_to: None,
            demo_to: None,
        }
    }
}

/// Centralized configuration
///
/// Consolidates all sources and tracks where the last override came from.
/// Use [`load_config`] to load with proper priority handling.
#[derive(Clone, Debug)]
pub struct LeadlineConfig {
    /// Listen port
    pub port: u16,
    /// Public hostname Twilio reaches us on (no scheme)
    pub public_host: Option<String>,
    /// Chat model settings
    pub model: ModelSettings,
    /// Follow-up settings
    pub followup: FollowUpSettings,
    /// Twilio settings
    pub twilio: TwilioSettings,
    /// Voice settings
    pub voice: VoiceSettings,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    /// Source of configuration values
    source: ConfigSource,
}

impl Default for LeadlineConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_host: None,
            model: ModelSettings::default(),
            followup: FollowUpSettings::default(),
            twilio: TwilioSettings::default(),
            voice: VoiceSettings::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl LeadlineConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make the service misbehave
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.followup.interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "follow-up interval must be at least one minute".into(),
            ));
        }
        if self.followup.check_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "follow-up check interval must be positive".into(),
            ));
        }
        if self.model.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "model timeout must be positive".into(),
            ));
        }
        for profile in [&self.model.text, &self.model.voice] {
            if !(0.0..=2.0).contains(&profile.temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "temperature {} outside 0.0-2.0",
                    profile.temperature
                )));
            }
        }
        Ok(())
    }

    /// Agent settings derived from this configuration
    pub fn agent_config(&self) -> AgentConfig {
        let interval = chrono::Duration::from_std(self.followup.interval)
            .unwrap_or_else(|_| chrono::Duration::minutes(3));
        AgentConfig {
            policy: FollowUpPolicy::new(self.followup.limits, interval),
            text: self.model.text.clone(),
            voice: self.model.voice.clone(),
            llm_timeout: self.model.timeout,
        }
    }

    /// Chat backend settings derived from this configuration
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            api_key: self.model.api_key().unwrap_or_default().to_string(),
            base_url: self.model.base_url().to_string(),
            timeout: self.model.timeout,
        }
    }

    /// Twilio client settings, if credentials are present
    pub fn twilio_config(&self) -> Option<TwilioConfig> {
        let account_sid = self.twilio.account_sid.clone()?;
        let auth_token = self.twilio.auth_token.clone()?;
        Some(TwilioConfig {
            account_sid,
            auth_token,
            whatsapp_from: Some(self.twilio.whatsapp_from.clone()),
            phone_number: self.twilio.phone_number.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
        })
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/leadline/leadline.toml` or
/// `~/.config/leadline/leadline.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("leadline").join("leadline.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<LeadlineConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<LeadlineConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using a custom environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<LeadlineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LeadlineConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: LeadlineToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| {
        env(key).filter(|value| !value.trim().is_empty())
    })?;

    Ok(config)
}

/// Strip scheme and trailing slash from a public host setting
fn normalize_host(host: &str) -> String {
    host.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

/// Convert a minute count to a follow-up interval
///
/// Rejects counts whose span does not fit a timestamp offset.
fn follow_up_minutes(minutes: u64, setting: &str) -> Result<Duration, ConfigError> {
    let interval = minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .filter(|interval| chrono::Duration::from_std(*interval).is_ok());
    interval.ok_or_else(|| {
        ConfigError::ValidationError(format!("{setting} = {minutes} minutes is out of range"))
    })
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut LeadlineConfig, toml: &LeadlineToml) -> Result<(), ConfigError> {
    // Server
    if let Some(port) = toml.server.port {
        config.port = port;
    }
    if let Some(ref host) = toml.server.public_host {
        config.public_host = Some(normalize_host(host));
    }

    // Model
    if toml.model.redpill_api_key.is_some() {
        config.model.redpill_api_key = toml.model.redpill_api_key.clone();
    }
    if toml.model.openai_api_key.is_some() {
        config.model.openai_api_key = toml.model.openai_api_key.clone();
    }
    if toml.model.base_url.is_some() {
        config.model.base_url = toml.model.base_url.clone();
    }
    if let Some(ref model) = toml.model.text_model {
        config.model.text.model = model.clone();
    }
    if let Some(ref model) = toml.model.voice_model {
        config.model.voice.model = model.clone();
    }
    if let Some(tokens) = toml.model.text_max_tokens {
        config.model.text.max_tokens = tokens;
    }
    if let Some(tokens) = toml.model.voice_max_tokens {
        config.model.voice.max_tokens = tokens;
    }
    if let Some(temperature) = toml.model.temperature {
        config.model.text.temperature = temperature;
        config.model.voice.temperature = temperature;
    }
    if let Some(secs) = toml.model.timeout_secs {
        config.model.timeout = Duration::from_secs(secs);
    }

    // Follow-ups
    if let Some(enabled) = toml.followup.enabled {
        config.followup.enabled = enabled;
    }
    if let Some(minutes) = toml.followup.interval_minutes {
        config.followup.interval = follow_up_minutes(minutes, "followup.interval_minutes")?;
    }
    if let Some(secs) = toml.followup.check_interval_secs {
        config.followup.check_interval = Duration::from_secs(secs);
    }
    if let Some(limits) = toml.followup.limits {
        config.followup.limits = limits;
    }

    // Twilio
    if toml.twilio.account_sid.is_some() {
        config.twilio.account_sid = toml.twilio.account_sid.clone();
    }
    if toml.twilio.auth_token.is_some() {
        config.twilio.auth_token = toml.twilio.auth_token.clone();
    }
    if let Some(ref from) = toml.twilio.whatsapp_from {
        config.twilio.whatsapp_from = from.clone();
    }
    if toml.twilio.phone_number.is_some() {
        config.twilio.phone_number = toml.twilio.phone_number.clone();
    }
    if toml.twilio.default_call_to.is_some() {
        config.twilio.default_call_to = toml.twilio.default_call_to.clone();
    }
    if toml.twilio.demo_to.is_some() {
        config.twilio.demo_to = toml.twilio.demo_to.clone();
    }

    // Voice
    if let Some(ref voice_id) = toml.voice.voice_id {
        config.voice.voice_id = voice_id.clone();
    }
    if let Some(ref greeting) = toml.voice.welcome_greeting {
        config.voice.welcome_greeting = greeting.clone();
    }

    // Persona
    if let Some(ref persona) = toml.persona.text {
        config.model.text.persona = persona.clone();
    }
    if let Some(ref persona) = toml.persona.voice {
        config.model.voice.persona = persona.clone();
    }

    Ok(())
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut LeadlineConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Server
    if let Some(port) = env("PORT") {
        if let Ok(port) = port.trim().parse::<u16>() {
            config.port = port;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(host) = env("NGROK_URL") {
        config.public_host = Some(normalize_host(&host));
        config.source = ConfigSource::Env;
    }

    // Model
    if let Some(key) = env("REDPILL_API_KEY") {
        config.model.redpill_api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(key) = env("OPENAI_API_KEY") {
        config.model.openai_api_key = Some(key);
        config.source = ConfigSource::Env;
    }
    if let Some(model) = env("AI_MODEL") {
        config.model.voice.model = model;
        config.source = ConfigSource::Env;
    }

    // Follow-ups
    if let Some(minutes) = env("FOLLOWUP_MINUTES") {
        if let Ok(minutes) = minutes.trim().parse::<u64>() {
            if minutes > 0 {
                config.followup.interval = follow_up_minutes(minutes, "FOLLOWUP_MINUTES")?;
                config.source = ConfigSource::Env;
            }
        }
    }

    // Twilio
    if let Some(sid) = env("TWILIO_ACCOUNT_SID") {
        config.twilio.account_sid = Some(sid);
        config.source = ConfigSource::Env;
    }
    if let Some(token) = env("TWILIO_AUTH_TOKEN") {
        config.twilio.auth_token = Some(token);
        config.source = ConfigSource::Env;
    }
    if let Some(from) = env("WHATSAPP_FROM") {
        config.twilio.whatsapp_from = from;
        config.source = ConfigSource::Env;
    }
    if let Some(number) = env("TWILIO_PHONE_NUMBER") {
        config.twilio.phone_number = Some(number);
        config.source = ConfigSource::Env;
    }
    if let Some(number) = env("MY_PHONE_NUMBER") {
        config.twilio.default_call_to = Some(number);
        config.source = ConfigSource::Env;
    }
    if let Some(number) = env("DEMO_TO") {
        config.twilio.demo_to = Some(number);
        config.source = ConfigSource::Env;
    }

    // Voice
    if let Some(voice_id) = env("ELEVENLABS_VOICE_ID") {
        config.voice.voice_id = voice_id;
        config.source = ConfigSource::Env;
    }
    if let Some(greeting) = env("WELCOME_GREETING") {
        config.voice.welcome_greeting = greeting;
        config.source = ConfigSource::Env;
    }

    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Port override
    pub port: Option<u16>,

    /// Follow-up scheduler override
    pub follow_ups_enabled: Option<bool>,

    /// Public host override
    pub public_host: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set port override
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set follow-up scheduler override
    #[must_use]
    pub fn with_follow_ups_enabled(mut self, enabled: bool) -> Self {
        self.follow_ups_enabled = Some(enabled);
        self
    }

    /// Set public host override
    #[must_use]
    pub fn with_public_host(mut self, host: String) -> Self {
        self.public_host = Some(host);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut LeadlineConfig) {
        if self.port.is_some() || self.follow_ups_enabled.is_some() || self.public_host.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(port) = self.port {
            config.port = port;
        }

        if let Some(enabled) = self.follow_ups_enabled {
            config.followup.enabled = enabled;
        }

        if let Some(ref host) = self.public_host {
            config.public_host = Some(normalize_host(host));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
