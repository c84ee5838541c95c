//! Follow-up Scheduler
//!
//! Periodically asks the agent to follow up on each WhatsApp conversation,
//! handing it the messenger to deliver through.
//!
//! Each tick visits conversations one at a time. A conversation that is busy
//! answering an inbound message is simply waited for; its follow-up check
//! then sees the fresh activity and declines.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::agent::{FollowUpOutcome, LeadAgent};
use crate::backend::ChatBackend;
use crate::conversation::Channel;
use crate::provider::Messenger;

/// Default time between ticks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Result of one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Conversations examined
    pub checked: usize,
    /// Follow-ups delivered
    pub sent: usize,
    /// Follow-ups the messenger rejected
    pub failed: usize,
}

/// Background follow-up sender
pub struct FollowUpScheduler<B: ChatBackend, M: Messenger + ?Sized> {
    agent: LeadAgent<B>,
    messenger: Arc<M>,
    check_interval: Duration,
}

impl<B: ChatBackend, M: Messenger + ?Sized> FollowUpScheduler<B, M> {
    /// Create a scheduler
    pub fn new(agent: LeadAgent<B>, messenger: Arc<M>, check_interval: Duration) -> Self {
        Self {
            agent,
            messenger,
            check_interval,
        }
    }

    /// Time between ticks
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Run one pass over all WhatsApp conversations
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        for id in self.agent.registry().ids(Some(Channel::WhatsApp)) {
            report.checked += 1;

            match self.agent.follow_up(&id, self.messenger.as_ref(), now).await {
                FollowUpOutcome::Delivered { .. } => report.sent += 1,
                FollowUpOutcome::Failed(_) => report.failed += 1,
                FollowUpOutcome::NotDue | FollowUpOutcome::Skipped => {}
            }
        }

        report
    }

    /// Tick until the shutdown flag flips to `true`
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.check_interval.as_secs(),
            "Follow-up scheduler started"
        );

        let mut interval = tokio::time::interval(self.check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick(Utc::now()).await;
                    if report.sent > 0 || report.failed > 0 {
                        tracing::debug!(?report, "Follow-up tick");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Follow-up scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentConfig, InboundEvent};
    use crate::backend::test_utils::ScriptedBackend;
    use crate::conversation::ConversationId;
    use crate::lead::Stage;
    use crate::provider::test_utils::RecordingMessenger;
    use chrono::Duration as ChronoDuration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn scheduler(
        backend: &ScriptedBackend,
        messenger: &RecordingMessenger,
    ) -> FollowUpScheduler<ScriptedBackend, RecordingMessenger> {
        let agent = LeadAgent::new(backend.clone(), AgentConfig::default());
        FollowUpScheduler::new(agent, Arc::new(messenger.clone()), DEFAULT_CHECK_INTERVAL)
    }

    #[tokio::test]
    async fn test_tick_sends_due_follow_ups_only() {
        let backend = ScriptedBackend::new();
        let messenger = RecordingMessenger::new();
        let scheduler = scheduler(&backend, &messenger);

        backend.push_reply("Eh hello!");
        scheduler
            .agent
            .handle_text(InboundEvent::at("whatsapp:+601", "hi", t0()))
            .await;
        scheduler.agent.open_call("CA1");

        let early = scheduler.tick(t0() + ChronoDuration::minutes(1)).await;
        assert_eq!(early.sent, 0);
        assert!(messenger.messages().is_empty());

        backend.push_reply("Still thinking ah?");
        let due = scheduler.tick(t0() + ChronoDuration::minutes(4)).await;
        assert_eq!(due, TickReport { checked: 1, sent: 1, failed: 0 });
        assert_eq!(messenger.messages()[0].to, "whatsapp:+601");
        assert_eq!(messenger.messages()[0].body, "Still thinking ah?");
    }

    #[tokio::test]
    async fn test_fallback_is_not_sent() {
        let backend = ScriptedBackend::new();
        let messenger = RecordingMessenger::new();
        let scheduler = scheduler(&backend, &messenger);

        scheduler
            .agent
            .handle_text(InboundEvent::at("whatsapp:+601", "hi", t0()))
            .await;

        backend.push_failure("provider down");
        let report = scheduler.tick(t0() + ChronoDuration::minutes(4)).await;
        assert_eq!(report.sent, 0);
        assert!(messenger.messages().is_empty());

        let handle = scheduler
            .agent
            .registry()
            .get(&ConversationId::whatsapp("whatsapp:+601"))
            .unwrap();
        assert_eq!(handle.lock().await.follow_up_count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failure_leaves_lead_unchanged() {
        let backend = ScriptedBackend::new();
        let messenger = RecordingMessenger::failing();
        let scheduler = scheduler(&backend, &messenger);
        let id = ConversationId::whatsapp("whatsapp:+601");

        scheduler
            .agent
            .handle_text(InboundEvent::at("whatsapp:+601", "not interested", t0()))
            .await;

        let mut now = t0();
        for _ in 0..5 {
            now += ChronoDuration::minutes(5);
            let report = scheduler.tick(now).await;
            assert_eq!(report, TickReport { checked: 1, sent: 0, failed: 1 });
        }

        let handle = scheduler.agent.registry().get(&id).unwrap();
        let lead = handle.lock().await;
        assert_eq!(lead.follow_up_count(), 0);
        assert_eq!(lead.history().len(), 2);
        assert_eq!(lead.stage(), Stage::Discovery);
        assert_eq!(lead.last_outbound_at(), Some(t0()));
        assert!(scheduler
            .agent
            .config()
            .policy
            .is_eligible(&lead, now + ChronoDuration::minutes(5)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let backend = ScriptedBackend::new();
        let messenger = RecordingMessenger::new();
        let scheduler = scheduler(&backend, &messenger);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(scheduler.run(rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
