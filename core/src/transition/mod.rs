//! Transition requests and their outcome
//!
//! A [`Transition`] is created for every state-change request and flows
//! through the [`queue`] into the [`executor`].

pub(crate) mod change;
pub(crate) mod executor;
pub(crate) mod queue;

pub use change::Change;

use crate::error::Result;
use crate::history::HistoryUpdate;
use crate::tree::RouterId;
use futures::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Where a transition request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Requested by application code
    Direct,
    /// Synchronization of the router tree with the current URL
    Sync,
    /// Browser back/forward navigation
    PopState,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Origin::Direct => "direct",
            Origin::Sync => "sync",
            Origin::PopState => "pop_state",
        };
        f.write_str(name)
    }
}

/// What the transition navigates to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// State identifiers joined by `/`; absolute when starting with `/`,
    /// otherwise relative to the originating router
    Path(String),
    /// A URL to be decoded by the configured adapter
    Url(String),
}

/// A queued state-change request
#[derive(Debug, Clone)]
pub struct Transition {
    pub id: Uuid,
    pub router: RouterId,
    pub target: Target,
    pub origin: Origin,
    /// Replays a path that could not be resolved when first requested
    pub deferred: bool,
    pub history_update: HistoryUpdate,
    cancelled: Arc<AtomicBool>,
}

impl Transition {
    fn new(router: RouterId, target: Target, origin: Origin, history_update: HistoryUpdate) -> Self {
        Self {
            id: Uuid::new_v4(),
            router,
            target,
            origin,
            deferred: false,
            history_update,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Transition requested by application code
    pub fn direct(router: RouterId, path: impl Into<String>, history_update: HistoryUpdate) -> Self {
        Self::new(router, Target::Path(path.into()), Origin::Direct, history_update)
    }

    /// Replay of a deferred path below `router`
    pub fn deferred(router: RouterId, path: impl Into<String>) -> Self {
        let mut transition = Self::new(
            router,
            Target::Path(path.into()),
            Origin::Direct,
            HistoryUpdate::Replace,
        );
        transition.deferred = true;
        transition
    }

    /// Synchronization with the URL of the current history entry
    pub fn sync(router: RouterId, url: impl Into<String>) -> Self {
        Self::new(router, Target::Url(url.into()), Origin::Sync, HistoryUpdate::Replace)
    }

    /// Back/forward navigation to `url`; the history already holds it
    pub fn pop_state(router: RouterId, url: impl Into<String>) -> Self {
        Self::new(router, Target::Url(url.into()), Origin::PopState, HistoryUpdate::Skip)
    }

    /// Whether a later request may supersede this one
    pub fn is_cancellable(&self) -> bool {
        !self.deferred && self.origin != Origin::PopState
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Future returned when a transition is requested; the request is queued
/// before the future is first polled
pub type TransitionFuture = BoxFuture<'static, Result<Outcome>>;

/// Result of a settled transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Outcome {
    /// Whether at least one router changed state
    pub has_changed: bool,
}

impl Outcome {
    pub fn changed() -> Self {
        Self { has_changed: true }
    }

    pub fn unchanged() -> Self {
        Self { has_changed: false }
    }
}
