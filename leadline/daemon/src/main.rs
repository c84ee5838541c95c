//! Leadline Daemon - Webhook and Voice Relay Server
//!
//! Serves the WhatsApp webhook and the ConversationRelay socket for the
//! leadline sales agent, and sends follow-ups in the background.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (port 3000, config from ~/.config/leadline)
//! leadline-daemon
//!
//! # Custom port and config file
//! leadline-daemon --port 8080 --config ./leadline.toml
//!
//! # Replies only, no automated follow-ups
//! leadline-daemon --no-follow-ups
//!
//! # Verbose logging
//! RUST_LOG=debug leadline-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: Graceful shutdown

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info, warn};

use leadline_core::{
    default_config_path, load_config_from_path, ConfigOverrides, FollowUpScheduler, LeadAgent,
    LeadlineConfig, Messenger, OpenAiBackend, TwilioMessenger,
};
use server::{AppState, DaemonServer, ServerSettings};

/// Leadline Daemon - WhatsApp and voice insurance sales agent
#[derive(Parser, Debug)]
#[command(name = "leadline-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "LEADLINE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen port (overrides PORT and the config file)
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Disable the follow-up scheduler
    #[arg(long)]
    no_follow_ups: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "LEADLINE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "leadline_daemon={level},leadline_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Load the file and environment layers, then apply CLI overrides
fn resolve_config(args: &Args) -> Result<LeadlineConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(port) = args.port {
        overrides = overrides.with_port(port);
    }
    if args.no_follow_ups {
        overrides = overrides.with_follow_ups_enabled(false);
    }
    overrides.apply(&mut config);

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn log_startup(config: &LeadlineConfig) {
    let not_set = || "Not set".to_string();
    info!(
        port = config.port,
        source = ?config.source(),
        config_file = ?config.config_file_path,
        "Configuration loaded"
    );
    info!(
        base_url = config.model.base_url(),
        text_model = %config.model.text.model,
        voice_model = %config.model.voice.model,
        "Chat model"
    );
    info!(
        whatsapp_from = %config.twilio.whatsapp_from,
        demo_to = %config.twilio.demo_to.clone().unwrap_or_else(not_set),
        public_host = %config.public_host.clone().unwrap_or_else(not_set),
        "Channels"
    );
    if config.model.api_key().is_none() {
        warn!("No REDPILL_API_KEY or OPENAI_API_KEY set, every reply will be a fallback");
    }
}

/// Flip the shutdown flag on SIGTERM or SIGINT
fn spawn_signal_handler(shutdown: watch::Sender<bool>) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
        }
        let _ = shutdown.send(true);
    });

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Leadline Daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    let config = resolve_config(&args)?;
    log_startup(&config);

    let backend = OpenAiBackend::from_config(&config.backend_config())
        .context("Failed to create chat backend")?;
    let agent = LeadAgent::new(backend, config.agent_config());

    let messenger: Option<Arc<dyn Messenger>> = match config.twilio_config() {
        Some(twilio) => Some(Arc::new(
            TwilioMessenger::new(twilio).context("Failed to create Twilio client")?,
        )),
        None => {
            warn!("Twilio credentials not set, follow-ups and outbound calls are disabled");
            None
        }
    };

    let scheduler = match (&messenger, config.followup.enabled) {
        (Some(messenger), true) => Some(FollowUpScheduler::new(
            agent.clone(),
            Arc::clone(messenger),
            config.followup.check_interval,
        )),
        (None, true) => None,
        (_, false) => {
            info!("Follow-ups disabled");
            None
        }
    };

    let state = AppState {
        agent,
        messenger,
        settings: Arc::new(ServerSettings {
            port: config.port,
            public_host: config.public_host.clone(),
            default_call_to: config.twilio.default_call_to.clone(),
            voice: config.voice.clone(),
        }),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_handler(shutdown_tx)?;

    let result = DaemonServer::new(state, scheduler).run(shutdown_rx).await;

    info!("Shutting down...");
    match result {
        Ok(()) => {
            info!("Leadline daemon stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e)
        }
    }
}
