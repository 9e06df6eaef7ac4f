//! Serialized transition queue
//!
//! Requests are appended to a FIFO. The front ticket is the one in flight and
//! stays in the queue until it settles, so a request enqueued while another
//! one is waiting or running can mark its predecessor cancelled. A single
//! drain task, spawned when the queue goes from empty to non-empty, executes
//! tickets one at a time.

use super::executor;
use super::{Outcome, Transition, TransitionFuture};
use crate::error::{Result, RouterError};
use crate::events::EventBus;
use crate::navigator::Shared;
use futures::FutureExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

struct Ticket {
    transition: Transition,
    reply: oneshot::Sender<Result<Outcome>>,
}

impl Ticket {
    /// Settle the ticket and publish the post-transition signal
    fn settle(self, events: &EventBus, result: Result<Outcome>) {
        let has_changed = matches!(result, Ok(outcome) if outcome.has_changed);
        events.transitioned(self.transition.id, has_changed);
        // the caller may have dropped its future
        let _ = self.reply.send(result);
    }
}

#[derive(Default)]
pub(crate) struct TransitionQueue {
    pending: Mutex<VecDeque<Ticket>>,
}

impl TransitionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, VecDeque<Ticket>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of queued requests, including the one in flight
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    /// Settle every waiting request with `error` and cancel the one in flight
    pub fn discard(&self, error: RouterError, events: &EventBus) {
        let mut pending = self.pending();
        if let Some(front) = pending.front() {
            front.transition.cancel();
        }
        let keep = pending.len().min(1);
        let waiting: Vec<Ticket> = pending.drain(keep..).collect();
        for ticket in waiting {
            debug!(transition_id = %ticket.transition.id, %error, "discarding queued transition");
            ticket.settle(events, Err(error.clone()));
        }
    }
}

/// Append a transition and return a future resolving once it settled
pub(crate) fn enqueue(shared: &Arc<Shared>, transition: Transition) -> TransitionFuture {
    if shared.is_disposed() {
        return futures::future::ready(Err(RouterError::Disposed)).boxed();
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        return futures::future::ready(Err(RouterError::Generic(
            "transitions require a tokio runtime".to_string(),
        )))
        .boxed();
    };

    let (reply, settled) = oneshot::channel();
    let start = {
        let mut pending = shared.queue.pending();
        if let Some(tail) = pending.back() {
            if tail.transition.is_cancellable() && !tail.transition.is_cancelled() {
                debug!(
                    transition_id = %tail.transition.id,
                    superseded_by = %transition.id,
                    "cancelling superseded transition"
                );
                tail.transition.cancel();
            }
        }
        debug!(
            transition_id = %transition.id,
            origin = %transition.origin,
            target = ?transition.target,
            "transition enqueued"
        );
        pending.push_back(Ticket { transition, reply });
        pending.len() == 1
    };

    if start {
        runtime.spawn(drain(Arc::clone(shared)));
    }

    async move { settled.await.unwrap_or(Err(RouterError::QueueClosed)) }.boxed()
}

/// Execute queued transitions until the queue is empty
async fn drain(shared: Arc<Shared>) {
    loop {
        let Some(transition) = shared
            .queue
            .pending()
            .front()
            .map(|ticket| ticket.transition.clone())
        else {
            return;
        };

        let result = if shared.is_disposed() {
            Err(RouterError::Disposed)
        } else if transition.is_cancelled() {
            warn!(transition_id = %transition.id, "transition cancelled before it started");
            Ok(Outcome::unchanged())
        } else {
            executor::execute(&shared, &transition).await
        };

        let finished = {
            let mut pending = shared.queue.pending();
            let Some(ticket) = pending.pop_front() else {
                return;
            };

            match &result {
                Err(err @ RouterError::Hook { .. }) => {
                    error!(transition_id = %transition.id, error = %err, "lifecycle hook failed, clearing queue");
                    let discarded: Vec<Ticket> = pending.drain(..).collect();
                    ticket.settle(&shared.events, result.clone());
                    for other in discarded {
                        other.settle(&shared.events, Err(err.clone()));
                    }
                }
                Err(err) => {
                    warn!(transition_id = %transition.id, error = %err, "transition rejected");
                    ticket.settle(&shared.events, result.clone());
                }
                Ok(_) => ticket.settle(&shared.events, result.clone()),
            }
            pending.is_empty()
        };

        if finished {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RouterError;
    use crate::events::RouterEvent;
    use crate::hooks::{Action, Guard};
    use crate::navigator::Navigator;
    use crate::state::RouterState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn counting_state(id: &str, hits: &Arc<AtomicUsize>) -> RouterState {
        let enter_hits = Arc::clone(hits);
        let guard_hits = Arc::clone(hits);
        RouterState::new(id)
            .with_can_enter(Guard::new(move || {
                guard_hits.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))
            .with_enter(Action::new(move || {
                enter_hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
    }

    #[tokio::test]
    async fn test_superseded_transition_runs_no_hooks() {
        let navigator = Navigator::with_defaults().unwrap();
        let a_hits = Arc::new(AtomicUsize::new(0));
        let b_hits = Arc::new(AtomicUsize::new(0));
        navigator
            .root()
            .configure(vec![
                counting_state("a", &a_hits),
                counting_state("b", &b_hits),
            ])
            .unwrap();

        let first = navigator.go("/a");
        let second = navigator.go("/b");
        let (first, second) = tokio::join!(first, second);

        assert!(!first.unwrap().has_changed);
        assert!(second.unwrap().has_changed);
        assert_eq!(a_hits.load(Ordering::SeqCst), 0);
        assert_eq!(b_hits.load(Ordering::SeqCst), 2);
        assert_eq!(navigator.root().state_id().unwrap().as_str(), "b");
    }

    #[tokio::test]
    async fn test_hook_error_clears_queue() {
        let navigator = Navigator::with_defaults().unwrap();
        navigator
            .root()
            .configure(vec![
                RouterState::new("broken")
                    .with_can_enter(Guard::new(|| Err(RouterError::from("boom")))),
                RouterState::new("fine"),
            ])
            .unwrap();

        let mut events = navigator.subscribe();

        // pop-state requests are never superseded, so both stay queued
        let failing = navigator.handle_pop_state("/broken");
        let waiting = navigator.handle_pop_state("/fine");
        let (failing, waiting) = tokio::join!(failing, waiting);

        let expected = RouterError::Hook {
            state: "broken".into(),
            message: "boom".into(),
        };
        assert_eq!(failing.unwrap_err(), expected);
        assert_eq!(waiting.unwrap_err(), expected);
        assert_eq!(navigator.root().state_id(), None);

        let mut signals = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let RouterEvent::Transitioned { has_changed, .. } = event {
                signals.push(has_changed);
            }
        }
        assert_eq!(signals, vec![false, false]);
    }

    #[tokio::test]
    async fn test_running_transition_stops_at_next_checkpoint() {
        let navigator = Navigator::with_defaults().unwrap();
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Notify::new());
        let a_enters = Arc::new(AtomicUsize::new(0));

        let (guard_started, guard_gate) = (Arc::clone(&started), Arc::clone(&gate));
        let enters = Arc::clone(&a_enters);
        let slow = RouterState::new("a")
            .with_can_enter(Guard::from_async(move || {
                let started = Arc::clone(&guard_started);
                let gate = Arc::clone(&guard_gate);
                async move {
                    started.notify_one();
                    gate.notified().await;
                    Ok(true)
                }
            }))
            .with_enter(Action::new(move || {
                enters.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        navigator
            .root()
            .configure(vec![slow, RouterState::new("b")])
            .unwrap();

        let first = navigator.go("/a");
        started.notified().await;
        // the guard of /a is running; /b supersedes it
        let second = navigator.go("/b");
        gate.notify_one();

        let (first, second) = tokio::join!(first, second);
        assert!(!first.unwrap().has_changed);
        assert!(second.unwrap().has_changed);
        assert_eq!(a_enters.load(Ordering::SeqCst), 0);
        assert_eq!(navigator.root().state_id().unwrap().as_str(), "b");
    }

    #[tokio::test]
    async fn test_invalid_path_rejects_only_its_request() {
        let navigator = Navigator::with_defaults().unwrap();
        navigator
            .root()
            .configure(vec![RouterState::new("home")])
            .unwrap();

        let bad = navigator.root().go("/nowhere").await;
        assert!(matches!(bad, Err(RouterError::UnknownState { .. })));

        let good = navigator.root().go("/home").await.unwrap();
        assert!(good.has_changed);
    }

    #[tokio::test]
    async fn test_one_signal_per_request() {
        let navigator = Navigator::with_defaults().unwrap();
        navigator
            .root()
            .configure(vec![RouterState::new("a"), RouterState::new("b")])
            .unwrap();
        let mut events = navigator.subscribe();

        let first = navigator.go("/a");
        let second = navigator.go("/b");
        let _ = tokio::join!(first, second);
        let _ = navigator.go("/missing").await;

        let mut signals = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, RouterEvent::Transitioned { .. }) {
                signals += 1;
            }
        }
        assert_eq!(signals, 3);
    }
}
