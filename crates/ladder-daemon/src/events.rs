//! Change notifications.
//!
//! Events are pushed from the daemon to subscribed RPC connections as
//! JSON-RPC notifications. Each subscriber has an independent buffer; a
//! subscriber that falls behind by more than the capacity loses the oldest
//! events and is told how many it missed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::clock;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "SnapshotChanged", "DaemonStarted").
    pub event_type: String,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Build an event stamped with the current time.
    pub fn now(event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            timestamp: clock::unix_now(),
            payload,
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "ledger", "income", "admin", "system".
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Only events whose payload names one of these users.
    #[serde(default)]
    pub user_ids: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref categories) = self.categories {
            let event_category = categorize_event(&event.event_type);
            if !categories.iter().any(|c| c == event_category) {
                return false;
            }
        }

        // Events without a user_id are not user-specific and always pass
        if let Some(ref user_ids) = self.user_ids {
            if let Some(uid) = event.payload.get("user_id").and_then(|v| v.as_str()) {
                if !user_ids.iter().any(|id| id == uid) {
                    return false;
                }
            }
        }

        true
    }
}

/// Categorize an event type into a category.
fn categorize_event(event_type: &str) -> &'static str {
    match event_type {
        s if s.starts_with("Snapshot") => "ledger",
        s if s.starts_with("Accrual") || s.starts_with("Income") => "income",
        s if s.starts_with("Reversal") || s.starts_with("User") || s.starts_with("Admin") => {
            "admin"
        }
        _ => "system",
    }
}
