//! Daemon Server - Twilio Webhooks and Voice Relay
//!
//! One axum server carries both channels:
//!
//! - `GET /` - status and per-conversation snapshots
//! - `POST /whatsapp` - WhatsApp webhook, answered inline with TwiML
//! - `GET /twiml` - connect document pointing calls at the relay socket
//! - `GET /call?to=` - place an outbound call
//! - `GET /ws` - ConversationRelay WebSocket
//!
//! The follow-up scheduler runs beside the server when a messenger is
//! configured, and both stop on the same shutdown signal.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::FormRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use leadline_core::channel::voice::relay_url;
use leadline_core::channel::{
    connect_response, messaging_response, RelayCommand, RelayMessage, VoiceSettings,
    WhatsAppWebhook, TWIML_CONTENT_TYPE,
};
use leadline_core::{
    Channel, ChatBackend, EventId, FollowUpScheduler, LeadAgent, LeadSnapshot, Messenger,
};

/// Service name reported on the status endpoint
pub const SERVICE_NAME: &str = "leadline";

/// Server settings that handlers need
#[derive(Clone, Debug, Default)]
pub struct ServerSettings {
    /// Listen port
    pub port: u16,
    /// Public hostname Twilio reaches us on
    pub public_host: Option<String>,
    /// Default destination for `/call`
    pub default_call_to: Option<String>,
    /// Voice connect settings
    pub voice: VoiceSettings,
}

/// Shared handler state
pub struct AppState<B: ChatBackend + 'static> {
    /// The sales agent
    pub agent: LeadAgent<B>,
    /// Outbound provider, absent without Twilio credentials
    pub messenger: Option<Arc<dyn Messenger>>,
    /// Server settings
    pub settings: Arc<ServerSettings>,
}

impl<B: ChatBackend + 'static> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent.clone(),
            messenger: self.messenger.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

/// Build the router
pub fn router<B: ChatBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(status::<B>))
        .route("/whatsapp", post(whatsapp_webhook::<B>))
        .route("/twiml", get(voice_twiml::<B>))
        .route("/call", get(place_call::<B>))
        .route("/ws", get(relay_upgrade::<B>))
        .with_state(state)
}

// =============================================================================
// Status
// =============================================================================

/// Body of `GET /`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always "running"
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Snapshot per conversation, keyed `channel:address`
    pub conversations: BTreeMap<String, LeadSnapshot>,
    /// Live voice calls
    pub voice_sessions: usize,
}

/// GET / - service status
#[instrument(skip(state))]
pub async fn status<B: ChatBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<StatusResponse> {
    let conversations = state
        .agent
        .snapshots()
        .await
        .into_iter()
        .map(|(id, snapshot)| (id.to_string(), snapshot))
        .collect();

    Json(StatusResponse {
        status: "running",
        service: SERVICE_NAME,
        conversations,
        voice_sessions: state.agent.registry().count(Channel::Voice),
    })
}

// =============================================================================
// WhatsApp
// =============================================================================

fn twiml(body: String) -> Response {
    ([(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)], body).into_response()
}

/// POST /whatsapp - inbound message webhook
///
/// Unreadable bodies are treated as an empty message from an unknown sender
/// so Twilio always gets a TwiML answer.
#[instrument(skip_all)]
pub async fn whatsapp_webhook<B: ChatBackend + 'static>(
    State(state): State<AppState<B>>,
    form: Result<Form<WhatsAppWebhook>, FormRejection>,
) -> Response {
    let webhook = match form {
        Ok(Form(webhook)) => webhook,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable webhook body, treating as empty");
            WhatsAppWebhook::default()
        }
    };

    let event = webhook.into_event();
    info!(from = %event.sender_id, event_id = %event.event_id, "WhatsApp message received");

    let reply = state.agent.handle_text(event).await;
    debug!(kind = ?reply.kind, "Replying");
    twiml(messaging_response(&reply.text))
}

// =============================================================================
// Voice
// =============================================================================

fn public_host<B: ChatBackend + 'static>(state: &AppState<B>, headers: &HeaderMap) -> String {
    state
        .settings
        .public_host
        .clone()
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("localhost:{}", state.settings.port))
}

/// GET /twiml - connect an answered call to the relay socket
#[instrument(skip_all)]
pub async fn voice_twiml<B: ChatBackend + 'static>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
) -> Response {
    let host = public_host(&state, &headers);
    info!(host = %host, "Incoming call, sending connect TwiML");
    twiml(connect_response(&relay_url(&host), &state.settings.voice))
}

/// Query of `GET /call`
#[derive(Debug, Default, Deserialize)]
pub struct CallQuery {
    /// Destination number
    pub to: Option<String>,
}

/// Error body for `GET /call`
#[derive(Debug, Serialize)]
pub struct CallError {
    /// What went wrong
    pub error: String,
    /// How to fix it
    pub hint: &'static str,
}

/// Success body for `GET /call`
#[derive(Debug, Serialize)]
pub struct CallPlaced {
    /// Always true
    pub success: bool,
    /// Human-readable status
    pub message: String,
    /// Provider call ID
    pub call_sid: String,
}

fn call_error(status: StatusCode, error: impl Into<String>, hint: &'static str) -> Response {
    (
        status,
        Json(CallError {
            error: error.into(),
            hint,
        }),
    )
        .into_response()
}

/// GET /call - place an outbound call
#[instrument(skip(state))]
pub async fn place_call<B: ChatBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<CallQuery>,
) -> Response {
    let to = query
        .to
        .filter(|to| !to.trim().is_empty())
        .or_else(|| state.settings.default_call_to.clone());
    let Some(to) = to else {
        return call_error(
            StatusCode::BAD_REQUEST,
            "Missing phone number",
            "Add MY_PHONE_NUMBER to .env or use ?to=+60123456789",
        );
    };

    let Some(host) = state.settings.public_host.as_deref() else {
        return call_error(
            StatusCode::BAD_REQUEST,
            "Missing NGROK_URL",
            "Set NGROK_URL to the public host Twilio can reach",
        );
    };

    let Some(messenger) = state.messenger.as_ref() else {
        return call_error(
            StatusCode::BAD_REQUEST,
            "Missing TWILIO_ACCOUNT_SID or TWILIO_AUTH_TOKEN",
            "Add your Twilio credentials to .env",
        );
    };

    info!(to = %to, "Initiating outbound call");
    match messenger
        .place_call(&to, &format!("https://{host}/twiml"))
        .await
    {
        Ok(call_sid) => (
            StatusCode::OK,
            Json(CallPlaced {
                success: true,
                message: format!("Calling {to}... Answer your phone!"),
                call_sid,
            }),
        )
            .into_response(),
        Err(e) if e.is_configuration() => call_error(
            StatusCode::BAD_REQUEST,
            e.to_string(),
            "Add TWILIO_PHONE_NUMBER to .env",
        ),
        Err(e) => {
            error!(error = %e, "Failed to place call");
            call_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
                "Check your Twilio credentials and phone numbers",
            )
        }
    }
}

/// GET /ws - ConversationRelay socket
pub async fn relay_upgrade<B: ChatBackend + 'static>(
    State(state): State<AppState<B>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| relay_session(socket, state.agent))
}

/// Per-socket relay state
#[derive(Debug, Default)]
pub struct RelaySession {
    call_sid: Option<String>,
}

impl RelaySession {
    /// Call bound to this socket, if set up
    pub fn call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref()
    }
}

/// Apply one relay frame; returns a frame to send back
pub async fn handle_relay_frame<B: ChatBackend>(
    agent: &LeadAgent<B>,
    session: &mut RelaySession,
    frame: &str,
) -> Option<String> {
    let message = match RelayMessage::decode(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Malformed relay frame ignored");
            return None;
        }
    };

    match message {
        RelayMessage::Setup { call_sid } => {
            if call_sid.trim().is_empty() {
                warn!(current = ?session.call_sid, "Setup without callSid ignored");
                return None;
            }
            if let Some(previous) = session.call_sid.replace(call_sid.clone()) {
                if previous != call_sid {
                    info!(previous = %previous, call_sid = %call_sid, "Socket rebound to new call");
                    agent.close_call(&previous);
                }
            }
            agent.open_call(&call_sid);
            None
        }
        RelayMessage::Prompt { voice_prompt } => {
            let call_sid = session.call_sid.get_or_insert_with(|| {
                let sid = format!("ws-{}", EventId::new());
                warn!(call_sid = %sid, "Prompt before setup, using socket-local call ID");
                agent.open_call(&sid);
                sid
            });
            info!(call_sid = %call_sid, "Caller spoke");
            let reply = agent.handle_voice(call_sid, &voice_prompt, Utc::now()).await;
            Some(RelayCommand::speak(reply.text).encode())
        }
        RelayMessage::Interrupt {
            utterance_until_interrupt,
        } => {
            info!(
                call_sid = ?session.call_sid,
                spoken = %utterance_until_interrupt,
                "Caller interrupted"
            );
            None
        }
        RelayMessage::Dtmf { digit } => {
            info!(call_sid = ?session.call_sid, digit = %digit, "DTMF received");
            None
        }
        RelayMessage::Error { description } => {
            error!(call_sid = ?session.call_sid, description = %description, "ConversationRelay error");
            None
        }
        RelayMessage::Unknown => {
            debug!(frame, "Unknown relay message ignored");
            None
        }
    }
}

async fn relay_session<B: ChatBackend + 'static>(mut socket: WebSocket, agent: LeadAgent<B>) {
    info!("Relay socket connected");
    let mut session = RelaySession::default();

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "Relay socket error");
                break;
            }
        };

        if let Some(reply) = handle_relay_frame(&agent, &mut session, &text).await {
            if let Err(e) = socket.send(Message::Text(reply)).await {
                warn!(error = %e, "Failed to send relay reply");
                break;
            }
        }
    }

    info!(call_sid = ?session.call_sid, "Relay socket closed");
    if let Some(call_sid) = session.call_sid {
        agent.close_call(&call_sid);
    }
}

// =============================================================================
// Server
// =============================================================================

/// The daemon: HTTP server plus optional follow-up scheduler
pub struct DaemonServer<B: ChatBackend + 'static> {
    state: AppState<B>,
    scheduler: Option<FollowUpScheduler<B, dyn Messenger>>,
}

impl<B: ChatBackend + 'static> DaemonServer<B> {
    /// Create a server
    pub fn new(state: AppState<B>, scheduler: Option<FollowUpScheduler<B, dyn Messenger>>) -> Self {
        Self { state, scheduler }
    }

    /// Serve until the shutdown flag flips to `true`
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.settings.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        info!(addr = %addr, "Listening");

        let scheduler_task = self
            .scheduler
            .map(|scheduler| tokio::spawn(scheduler.run(shutdown.clone())));

        let mut server_shutdown = shutdown;
        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                while !*server_shutdown.borrow() {
                    if server_shutdown.changed().await.is_err() {
                        break;
                    }
                }
            })
            .await
            .context("Server terminated with error")?;

        if let Some(task) = scheduler_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Follow-up scheduler task failed");
            }
        }

        Ok(())
    }
}
