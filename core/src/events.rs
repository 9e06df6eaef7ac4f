//! Typed router events
//!
//! Events are published on a broadcast channel in commit order. Every queued
//! transition produces exactly one [`RouterEvent::Transitioned`], whether it
//! ran, was cancelled, was declined or failed.

use crate::history::HistoryUpdate;
use crate::state::StateId;
use crate::tree::Direction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default capacity of the event channel
const DEFAULT_CAPACITY: usize = 64;

/// Events published by a navigator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouterEvent {
    /// A router committed a new state
    StateChanged {
        router: String,
        from: Option<StateId>,
        to: Option<StateId>,
        direction: Option<Direction>,
    },
    /// The session history was written
    UrlChanged { url: String, update: HistoryUpdate },
    /// A queued transition settled
    Transitioned {
        transition_id: Uuid,
        has_changed: bool,
        at: DateTime<Utc>,
    },
    /// The navigator was disposed
    Disposed,
}

/// Broadcast bus carrying [`RouterEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RouterEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn emit(&self, event: RouterEvent) {
        tracing::trace!(?event, "router event");
        let _ = self.sender.send(event);
    }

    /// Publish the post-transition signal
    pub fn transitioned(&self, transition_id: Uuid, has_changed: bool) {
        self.emit(RouterEvent::Transitioned {
            transition_id,
            has_changed,
            at: Utc::now(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
