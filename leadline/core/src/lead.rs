//! Lead State
//!
//! The mutable record of a single conversation with a prospective customer.
//! Tracks when we last heard from the lead, how warm they are, where the
//! conversation stands, and the turn history fed back to the model.
//!
//! # Design Philosophy
//!
//! All mutation goes through a handful of methods on [`LeadState`]. Callers
//! never poke at fields directly, so the invariants below hold no matter which
//! channel drives the conversation:
//!
//! - `category` only changes through the classifier ([`LeadState::reclassify`])
//! - `stage` never moves backwards (only [`LeadState::reset`] returns to greeting)
//! - `follow_up_count` only grows when a follow-up is recorded
//!
//! The record does no I/O. Serialization of access is the job of the
//! [`crate::conversation::ConversationRegistry`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier;

/// Maximum characters of the last inbound message kept in `notes`
pub const NOTES_MAX_CHARS: usize = 50;

/// Marker appended to truncated notes
pub const NOTES_ELLIPSIS: &str = "...";

/// Lead temperature, estimating purchase intent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Explicit buying signals
    Hot,
    /// Engaged but undecided
    #[default]
    Warm,
    /// Disinterested or deferring
    Cold,
}

impl Category {
    /// Lower-case label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse conversation phase
///
/// Variants are declared in progression order; the derived `Ord` is what
/// keeps the stage from regressing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Nothing meaningful received yet
    #[default]
    Greeting,
    /// The lead has started talking
    Discovery,
    /// We are nudging a quiet lead
    Followup,
}

impl Stage {
    /// Lower-case label
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Discovery => "discovery",
            Self::Followup => "followup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// The lead
    User,
    /// The agent
    Assistant,
}

/// A single entry in the conversation history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub role: TurnRole,
    /// What was said
    pub content: String,
}

impl Turn {
    /// A turn from the lead
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// A turn from the agent
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Result of running the classifier against a lead
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reclassification {
    /// Category before the message
    pub previous: Category,
    /// Category after the message
    pub current: Category,
}

impl Reclassification {
    /// Whether the category moved
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// The mutable record of one conversation
#[derive(Clone, Debug, Default)]
pub struct LeadState {
    last_inbound_at: Option<DateTime<Utc>>,
    last_outbound_at: Option<DateTime<Utc>>,
    category: Category,
    stage: Stage,
    notes: String,
    dnc: bool,
    follow_up_count: u32,
    history: Vec<Turn>,
}

impl LeadState {
    /// Create a lead with default state (warm, greeting)
    pub fn new() -> Self {
        Self::default()
    }

    /// Current category
    pub fn category(&self) -> Category {
        self.category
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Short summary of the last inbound message
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Whether the lead opted out of automated contact
    pub fn dnc(&self) -> bool {
        self.dnc
    }

    /// Automated follow-ups sent so far
    pub fn follow_up_count(&self) -> u32 {
        self.follow_up_count
    }

    /// When the lead last messaged us
    pub fn last_inbound_at(&self) -> Option<DateTime<Utc>> {
        self.last_inbound_at
    }

    /// When we last messaged the lead
    pub fn last_outbound_at(&self) -> Option<DateTime<Utc>> {
        self.last_outbound_at
    }

    /// Most recent contact in either direction
    pub fn last_activity_at(&self) -> Option<DateTime<Utc>> {
        match (self.last_inbound_at, self.last_outbound_at) {
            (Some(inbound), Some(outbound)) => Some(inbound.max(outbound)),
            (inbound, outbound) => inbound.or(outbound),
        }
    }

    /// Full history
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The last `count` turns, oldest first
    pub fn recent_turns(&self, count: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    /// Read-only view for introspection
    pub fn snapshot(&self) -> LeadSnapshot {
        LeadSnapshot {
            category: self.category,
            stage: self.stage,
            dnc: self.dnc,
            follow_up_count: self.follow_up_count,
            last_inbound_at: self.last_inbound_at,
            last_outbound_at: self.last_outbound_at,
            turns: self.history.len(),
        }
    }

    /// Restore defaults and clear history
    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::debug!("Lead state reset");
    }

    /// Record a message from the lead
    ///
    /// Clears the opt-out flag: writing to us again counts as consent.
    pub fn record_inbound(&mut self, text: &str, now: DateTime<Utc>) {
        self.last_inbound_at = Some(now);
        self.dnc = false;
        self.history.push(Turn::user(text));
        self.advance_stage(Stage::Discovery);
        self.notes = summarize(text);
    }

    /// Record a message we sent to the lead
    pub fn record_outbound(&mut self, text: &str, now: DateTime<Utc>, is_follow_up: bool) {
        self.last_outbound_at = Some(now);
        self.history.push(Turn::assistant(text));
        if is_follow_up {
            self.follow_up_count += 1;
        }
    }

    /// Mark the lead as do-not-contact
    pub fn set_dnc(&mut self) {
        if !self.dnc {
            tracing::info!("DNC flag set, follow-ups suppressed");
        }
        self.dnc = true;
    }

    /// Mark both directions as active now without touching history
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_inbound_at = Some(now);
        self.last_outbound_at = Some(now);
    }

    /// Run the classifier over a message and apply the result
    pub fn reclassify(&mut self, text: &str) -> Reclassification {
        let previous = self.category;
        self.category = classifier::classify(previous, text);
        Reclassification {
            previous,
            current: self.category,
        }
    }

    /// Move into the follow-up stage
    pub fn enter_follow_up(&mut self) {
        self.advance_stage(Stage::Followup);
    }

    fn advance_stage(&mut self, target: Stage) {
        if target > self.stage {
            self.stage = target;
        }
    }
}

/// Read-only view of a lead for health/introspection endpoints
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadSnapshot {
    /// Current category
    pub category: Category,
    /// Current stage
    pub stage: Stage,
    /// Do-not-contact flag
    pub dnc: bool,
    /// Automated follow-ups sent
    pub follow_up_count: u32,
    /// Last inbound message time
    pub last_inbound_at: Option<DateTime<Utc>>,
    /// Last outbound message time
    pub last_outbound_at: Option<DateTime<Utc>>,
    /// History length
    pub turns: usize,
}

/// Truncate a message for the `notes` field
pub fn summarize(text: &str) -> String {
    match text.char_indices().nth(NOTES_MAX_CHARS) {
        Some((cut, _)) => format!("{}{NOTES_ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_default_state() {
        let lead = LeadState::new();
        assert_eq!(lead.category(), Category::Warm);
        assert_eq!(lead.stage(), Stage::Greeting);
        assert!(!lead.dnc());
        assert_eq!(lead.follow_up_count(), 0);
        assert!(lead.history().is_empty());
        assert!(lead.last_activity_at().is_none());
    }

    #[test]
    fn test_record_inbound() {
        let mut lead = LeadState::new();
        lead.set_dnc();

        lead.record_inbound("Hi there", t0());

        assert_eq!(lead.last_inbound_at(), Some(t0()));
        assert!(!lead.dnc());
        assert_eq!(lead.stage(), Stage::Discovery);
        assert_eq!(lead.notes(), "Hi there");
        assert_eq!(lead.history(), &[Turn::user("Hi there")]);
    }

    #[test]
    fn test_record_outbound_counts_follow_ups_only() {
        let mut lead = LeadState::new();

        lead.record_outbound("reply", t0(), false);
        assert_eq!(lead.follow_up_count(), 0);

        lead.record_outbound("nudge", t0() + Duration::minutes(5), true);
        assert_eq!(lead.follow_up_count(), 1);
        assert_eq!(lead.last_outbound_at(), Some(t0() + Duration::minutes(5)));
        assert_eq!(lead.history().len(), 2);
        assert_eq!(lead.history()[1], Turn::assistant("nudge"));
    }

    #[test]
    fn test_set_dnc_is_idempotent() {
        let mut lead = LeadState::new();
        lead.set_dnc();
        lead.set_dnc();
        assert!(lead.dnc());
        assert!(lead.history().is_empty());
    }

    #[test]
    fn test_stage_never_regresses() {
        let mut lead = LeadState::new();
        lead.record_inbound("hello", t0());
        lead.enter_follow_up();
        assert_eq!(lead.stage(), Stage::Followup);

        lead.record_inbound("back again", t0());
        assert_eq!(lead.stage(), Stage::Followup);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut lead = LeadState::new();
        lead.record_inbound("how much is it", t0());
        lead.reclassify("how much is it");
        lead.record_outbound("nudge", t0(), true);
        lead.set_dnc();

        lead.reset();

        assert_eq!(lead.category(), Category::Warm);
        assert_eq!(lead.stage(), Stage::Greeting);
        assert_eq!(lead.follow_up_count(), 0);
        assert!(!lead.dnc());
        assert!(lead.history().is_empty());
        assert!(lead.notes().is_empty());
    }

    #[test]
    fn test_touch_sets_both_timestamps() {
        let mut lead = LeadState::new();
        lead.touch(t0());
        assert_eq!(lead.last_inbound_at(), Some(t0()));
        assert_eq!(lead.last_outbound_at(), Some(t0()));
        assert!(lead.history().is_empty());
        assert_eq!(lead.stage(), Stage::Greeting);
    }

    #[test]
    fn test_notes_truncation() {
        let long = "a".repeat(60);
        assert_eq!(summarize(&long), format!("{}...", "a".repeat(50)));

        let short = "b".repeat(40);
        assert_eq!(summarize(&short), short);

        let exact = "c".repeat(50);
        assert_eq!(summarize(&exact), exact);
    }

    #[test]
    fn test_notes_truncation_is_char_based() {
        let text = "é".repeat(55);
        let notes = summarize(&text);
        assert_eq!(notes.chars().count(), 53);
        assert!(notes.ends_with("..."));
    }

    #[test]
    fn test_recent_turns_window() {
        let mut lead = LeadState::new();
        for i in 0..15 {
            lead.record_inbound(&format!("msg {i}"), t0());
        }
        let recent = lead.recent_turns(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "msg 5");
        assert_eq!(recent[9].content, "msg 14");
    }

    #[test]
    fn test_last_activity_takes_latest() {
        let mut lead = LeadState::new();
        lead.record_inbound("hi", t0());
        lead.record_outbound("hey", t0() + Duration::minutes(2), false);
        assert_eq!(lead.last_activity_at(), Some(t0() + Duration::minutes(2)));
    }

    #[test]
    fn test_snapshot() {
        let mut lead = LeadState::new();
        lead.record_inbound("hi", t0());
        let snap = lead.snapshot();
        assert_eq!(snap.category, Category::Warm);
        assert_eq!(snap.stage, Stage::Discovery);
        assert_eq!(snap.turns, 1);
        assert_eq!(snap.last_inbound_at, Some(t0()));
    }
}
