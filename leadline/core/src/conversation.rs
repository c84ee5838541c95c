//! Conversation Registry - Per-Lead State Management
//!
//! Tracks one [`LeadState`] per conversation. A conversation is identified by
//! its channel plus the channel's address for the remote party (the WhatsApp
//! sender or the voice call SID), so a lead who both texts and calls has two
//! independent states.
//!
//! # Architecture
//!
//! ```text
//!                    ConversationRegistry
//!          ┌──────────────────────────────────────────────┐
//!          │ DashMap<ConversationId,                      │
//!          │         Arc<tokio::sync::Mutex<LeadState>>>  │
//!          └──────────────┬───────────────────────────────┘
//!                         │
//!        ┌────────────────┼─────────────────┐
//!        │                │                 │
//!  whatsapp:+6012…   whatsapp:+6017…   voice:CA81f2…
//! ```
//!
//! # Locking
//!
//! Map guards are dropped before any conversation mutex is awaited. The
//! returned handle is an owned `Arc`, so a caller can hold the conversation
//! lock across a chat call without blocking other conversations or the map.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::lead::{LeadSnapshot, LeadState};

/// Shared handle to one conversation's state
pub type LeadHandle = Arc<Mutex<LeadState>>;

/// Transport a conversation runs over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// WhatsApp messages via webhook
    WhatsApp,
    /// Phone call via ConversationRelay
    Voice,
}

impl Channel {
    /// Lowercase name used in IDs and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WhatsApp => "whatsapp",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one conversation
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId {
    /// Channel of the conversation
    pub channel: Channel,
    /// Remote address on that channel (sender number or call SID)
    pub address: String,
}

impl ConversationId {
    /// Create an ID
    pub fn new(channel: Channel, address: impl Into<String>) -> Self {
        Self {
            channel,
            address: address.into(),
        }
    }

    /// WhatsApp conversation with a sender (e.g. `whatsapp:+60123456789`)
    pub fn whatsapp(sender: impl Into<String>) -> Self {
        Self::new(Channel::WhatsApp, sender)
    }

    /// Voice conversation for a call SID
    pub fn voice(call_sid: impl Into<String>) -> Self {
        Self::new(Channel::Voice, call_sid)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.address)
    }
}

/// Registry of live conversations
///
/// Cheap to clone; clones share the same map.
#[derive(Clone, Default)]
pub struct ConversationRegistry {
    inner: Arc<DashMap<ConversationId, LeadHandle>>,
}

impl ConversationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the conversation's handle, creating a fresh lead on first use
    pub fn conversation(&self, id: &ConversationId) -> LeadHandle {
        if let Some(handle) = self.inner.get(id) {
            return Arc::clone(handle.value());
        }

        self.inner
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(conversation = %id, "Conversation started");
                Arc::new(Mutex::new(LeadState::new()))
            })
            .value()
            .clone()
    }

    /// Get an existing conversation
    #[must_use]
    pub fn get(&self, id: &ConversationId) -> Option<LeadHandle> {
        self.inner.get(id).map(|h| Arc::clone(h.value()))
    }

    /// Drop a conversation
    pub fn remove(&self, id: &ConversationId) -> Option<LeadHandle> {
        let removed = self.inner.remove(id).map(|(_, handle)| handle);
        if removed.is_some() {
            tracing::info!(conversation = %id, "Conversation removed");
        }
        removed
    }

    /// Whether a conversation exists
    #[must_use]
    pub fn contains(&self, id: &ConversationId) -> bool {
        self.inner.contains_key(id)
    }

    /// IDs of all conversations, optionally restricted to one channel
    #[must_use]
    pub fn ids(&self, channel: Option<Channel>) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self
            .inner
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|id| channel.map_or(true, |c| id.channel == c))
            .collect();
        ids.sort();
        ids
    }

    /// Total number of conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of conversations on a channel
    #[must_use]
    pub fn count(&self, channel: Channel) -> usize {
        self.inner
            .iter()
            .filter(|entry| entry.key().channel == channel)
            .count()
    }

    /// Snapshot every conversation, keyed by ID
    ///
    /// Each lead is locked in turn; a conversation busy with a chat call
    /// delays the snapshot until its sequence finishes.
    pub async fn snapshots(&self) -> BTreeMap<ConversationId, LeadSnapshot> {
        let handles: Vec<(ConversationId, LeadHandle)> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut snapshots = BTreeMap::new();
        for (id, handle) in handles {
            let snapshot = handle.lock().await.snapshot();
            snapshots.insert(id, snapshot);
        }
        snapshots
    }
}
