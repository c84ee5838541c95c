//! Integration tests for the lead agent
//!
//! These tests drive the agent through realistic conversations with a
//! scripted backend and check the lead state it leaves behind.
//! Tests cover:
//! - Classification across a conversation
//! - `reset` and `stop` commands
//! - Chat failures and empty replies
//! - Follow-up eligibility and counting
//! - Per-conversation isolation and serialization
//! - Voice calls

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;

use leadline_core::backend::test_utils::{ScriptedBackend, ScriptedOutcome};
use leadline_core::backend::ChatRole;
use leadline_core::lead::NOTES_MAX_CHARS;
use leadline_core::persona::{OPT_OUT_ACK, RESET_GREETING};
use leadline_core::provider::test_utils::RecordingMessenger;
use leadline_core::{
    AgentConfig, Category, ConversationId, FollowUpOutcome, InboundEvent, LeadAgent, ReplyKind,
    ReplyProfile, Stage, TurnRole,
};

const LEAD: &str = "whatsapp:+60123456789";

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn agent(backend: &ScriptedBackend) -> LeadAgent<ScriptedBackend> {
    LeadAgent::new(backend.clone(), AgentConfig::default())
}

async fn say(agent: &LeadAgent<ScriptedBackend>, text: &str, at: DateTime<Utc>) -> ReplyKind {
    agent.handle_text(InboundEvent::at(LEAD, text, at)).await.kind
}

async fn follow_up(
    agent: &LeadAgent<ScriptedBackend>,
    id: &ConversationId,
    now: DateTime<Utc>,
) -> Option<String> {
    agent
        .follow_up(id, &RecordingMessenger::new(), now)
        .await
        .delivered_text()
        .map(str::to_string)
}

async fn lead_category(agent: &LeadAgent<ScriptedBackend>) -> Category {
    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let category = handle.lock().await.category();
    category
}

// =============================================================================
// Classification
// =============================================================================

#[tokio::test]
async fn test_category_moves_through_conversation() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);

    say(&agent, "hello", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Warm);

    say(&agent, "maybe later, quite busy", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Cold);

    say(&agent, "ok tell me more about the benefits", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Warm);

    say(&agent, "not interested but how much?", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Hot);

    say(&agent, "options?", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Hot);
}

#[tokio::test]
async fn test_context_reflects_classification_of_current_message() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);

    say(&agent, "can I get a quote", t0()).await;

    let request = backend.last_request().unwrap();
    assert!(request.messages[1]
        .content
        .starts_with("[INTERNAL CONTEXT - Current lead status: HOT, Stage: discovery"));
    assert_eq!(request.messages.last().unwrap().content, "can I get a quote");
}

// =============================================================================
// Commands
// =============================================================================

#[tokio::test]
async fn test_reset_restores_defaults() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);

    say(&agent, "not interested", t0()).await;
    say(&agent, "stop", t0()).await;

    let reply = agent
        .handle_text(InboundEvent::at(LEAD, "  Reset ", t0() + ChronoDuration::minutes(1)))
        .await;
    assert_eq!(reply.kind, ReplyKind::Greeting);
    assert_eq!(reply.text, RESET_GREETING);

    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let lead = handle.lock().await;
    assert_eq!(lead.category(), Category::Warm);
    assert_eq!(lead.stage(), Stage::Greeting);
    assert_eq!(lead.follow_up_count(), 0);
    assert!(!lead.dnc());
    assert!(lead.history().is_empty());
    assert_eq!(lead.last_inbound_at(), Some(t0() + ChronoDuration::minutes(1)));
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn test_stop_sets_dnc_without_generating() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);

    say(&agent, "hi", t0()).await;
    let before = backend.request_count();

    let reply = agent.handle_text(InboundEvent::at(LEAD, "STOP", t0())).await;
    assert_eq!(reply.kind, ReplyKind::OptOut);
    assert_eq!(reply.text, OPT_OUT_ACK);
    assert_eq!(backend.request_count(), before);

    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let lead = handle.lock().await;
    assert!(lead.dnc());
    assert_eq!(lead.history().len(), 2);
    assert_eq!(lead.category(), Category::Warm);
}

#[tokio::test]
async fn test_stop_blocks_follow_ups_until_lead_writes_again() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "hi", t0()).await;
    say(&agent, "stop", t0()).await;
    assert_eq!(follow_up(&agent, &id, t0() + ChronoDuration::hours(1)).await, None);

    say(&agent, "actually, tell me more", t0() + ChronoDuration::hours(2)).await;
    let later = t0() + ChronoDuration::hours(3);
    assert!(follow_up(&agent, &id, later).await.is_some());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_chat_failure_yields_fallback_without_assistant_turn() {
    let backend = ScriptedBackend::new();
    backend.push_failure("upstream 502");
    let agent = agent(&backend);

    let reply = agent.handle_text(InboundEvent::at(LEAD, "how much ah", t0())).await;
    assert_eq!(reply.kind, ReplyKind::Fallback);
    assert_eq!(reply.text, ReplyProfile::text().error_fallback);

    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let lead = handle.lock().await;
    assert_eq!(lead.history().len(), 1);
    assert_eq!(lead.history()[0].role, TurnRole::User);
    assert_eq!(lead.category(), Category::Hot);
    assert!(lead.last_outbound_at().is_none());
}

#[tokio::test]
async fn test_empty_reply_yields_empty_fallback() {
    let backend = ScriptedBackend::new();
    backend.push_empty();
    let agent = agent(&backend);

    let reply = agent.handle_text(InboundEvent::at(LEAD, "hello", t0())).await;
    assert_eq!(reply.kind, ReplyKind::Fallback);
    assert_eq!(reply.text, ReplyProfile::text().empty_fallback);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let backend = ScriptedBackend::new();
    backend.push(ScriptedOutcome::Delayed(
        Duration::from_millis(300),
        "late".into(),
    ));
    let config = AgentConfig {
        llm_timeout: Duration::from_millis(20),
        ..AgentConfig::default()
    };
    let agent = LeadAgent::new(backend.clone(), config);

    let reply = agent.handle_text(InboundEvent::at(LEAD, "hello", t0())).await;
    assert_eq!(reply.kind, ReplyKind::Fallback);
}

// =============================================================================
// Notes
// =============================================================================

#[tokio::test]
async fn test_notes_truncated() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let long = "x".repeat(NOTES_MAX_CHARS + 20);

    say(&agent, &long, t0()).await;

    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let lead = handle.lock().await;
    assert_eq!(lead.notes(), format!("{}...", "x".repeat(NOTES_MAX_CHARS)));
}

// =============================================================================
// Follow-ups
// =============================================================================

#[tokio::test]
async fn test_follow_up_flow() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "hi", t0()).await;

    assert_eq!(follow_up(&agent, &id, t0() + ChronoDuration::minutes(2)).await, None);

    backend.push_reply("Eh, still there? 😊");
    let sent = follow_up(&agent, &id, t0() + ChronoDuration::minutes(3)).await;
    assert_eq!(sent.as_deref(), Some("Eh, still there? 😊"));

    let request = backend.last_request().unwrap();
    let last = request.messages.last().unwrap();
    assert_eq!(last.role, ChatRole::User);
    assert!(last.content.contains("follow-up"));

    let handle = agent.registry().get(&id).unwrap();
    let lead = handle.lock().await;
    assert_eq!(lead.follow_up_count(), 1);
    assert_eq!(lead.stage(), Stage::Followup);
}

#[tokio::test]
async fn test_follow_up_limit_per_category() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "not interested", t0()).await;
    assert_eq!(lead_category(&agent).await, Category::Cold);

    let mut now = t0();
    let mut sent = 0;
    for _ in 0..10 {
        now += ChronoDuration::minutes(5);
        if follow_up(&agent, &id, now).await.is_some() {
            sent += 1;
        }
    }
    assert_eq!(sent, 3);
}

#[tokio::test]
async fn test_failed_follow_up_not_counted() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "hi", t0()).await;
    backend.push_failure("timeout");

    assert_eq!(follow_up(&agent, &id, t0() + ChronoDuration::minutes(10)).await, None);

    let handle = agent.registry().get(&id).unwrap();
    let lead = handle.lock().await;
    assert_eq!(lead.follow_up_count(), 0);
    assert_eq!(lead.stage(), Stage::Discovery);
}

#[tokio::test]
async fn test_follow_up_sent_to_lead_address() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let messenger = RecordingMessenger::new();
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "hi", t0()).await;
    backend.push_reply("Still there?");

    let outcome = agent
        .follow_up(&id, &messenger, t0() + ChronoDuration::minutes(5))
        .await;
    assert!(matches!(outcome, FollowUpOutcome::Delivered { ref sid, .. } if sid == "SM1"));
    assert_eq!(messenger.messages()[0].to, LEAD);
    assert_eq!(messenger.messages()[0].body, "Still there?");
}

#[tokio::test]
async fn test_undelivered_follow_ups_do_not_use_quota() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    let id = ConversationId::whatsapp(LEAD);

    say(&agent, "not interested", t0()).await;

    let down = RecordingMessenger::failing();
    let mut now = t0();
    for _ in 0..5 {
        now += ChronoDuration::minutes(5);
        let outcome = agent.follow_up(&id, &down, now).await;
        assert!(matches!(outcome, FollowUpOutcome::Failed(_)));
    }

    {
        let handle = agent.registry().get(&id).unwrap();
        let lead = handle.lock().await;
        assert_eq!(lead.follow_up_count(), 0);
        assert_eq!(lead.history().len(), 2);
        assert_eq!(lead.stage(), Stage::Discovery);
    }

    // Provider back up: the full cold quota is still available
    let mut sent = 0;
    for _ in 0..5 {
        now += ChronoDuration::minutes(5);
        if follow_up(&agent, &id, now).await.is_some() {
            sent += 1;
        }
    }
    assert_eq!(sent, 3);
}

#[tokio::test]
async fn test_follow_up_for_unknown_conversation() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);
    assert_eq!(
        follow_up(&agent, &ConversationId::whatsapp("nobody"), t0()).await,
        None
    );
    assert_eq!(backend.request_count(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_conversations_are_isolated() {
    let backend = ScriptedBackend::new();
    let agent = agent(&backend);

    agent
        .handle_text(InboundEvent::at("whatsapp:+1", "price please", t0()))
        .await;
    agent
        .handle_text(InboundEvent::at("whatsapp:+2", "no thanks", t0()))
        .await;

    let snapshots = agent.snapshots().await;
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].1.category, Category::Hot);
    assert_eq!(snapshots[1].1.category, Category::Cold);
}

#[tokio::test]
async fn test_same_conversation_is_serialized() {
    let backend = ScriptedBackend::new();
    backend.push(ScriptedOutcome::Delayed(
        Duration::from_millis(50),
        "first".into(),
    ));
    backend.push_reply("second");
    let agent = Arc::new(agent(&backend));

    let a = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.handle_text(InboundEvent::at(LEAD, "one", t0())).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let b = {
        let agent = Arc::clone(&agent);
        tokio::spawn(async move { agent.handle_text(InboundEvent::at(LEAD, "two", t0())).await })
    };

    assert_eq!(a.await.unwrap().text, "first");
    assert_eq!(b.await.unwrap().text, "second");

    let handle = agent.registry().get(&ConversationId::whatsapp(LEAD)).unwrap();
    let lead = handle.lock().await;
    let turns: Vec<&str> = lead.history().iter().map(|t| t.content.as_str()).collect();
    assert_eq!(turns, vec!["one", "first", "two", "second"]);

    let second_request = &backend.requests()[1];
    assert_eq!(second_request.messages.len(), 2 + 3);
}

// =============================================================================
// Voice
// =============================================================================

#[tokio::test]
async fn test_voice_call_lifecycle() {
    let backend = ScriptedBackend::new();
    backend.push_reply("Family Shield quite popular one");
    let agent = agent(&backend);

    agent.open_call("CA42");
    let reply = agent.handle_voice("CA42", "stop", t0()).await;
    assert_eq!(reply.kind, ReplyKind::Generated);

    let request = backend.last_request().unwrap();
    assert_eq!(request.model, "gpt-4o-mini");
    assert_eq!(request.max_tokens, 150);

    assert!(agent.registry().get(&ConversationId::whatsapp("CA42")).is_none());
    assert!(agent.close_call("CA42"));
    assert!(!agent.close_call("CA42"));
    assert!(agent.registry().is_empty());
}
