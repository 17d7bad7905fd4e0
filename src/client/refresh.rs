//! Single-flight bookkeeping for access-token refreshes.
//!
//! The first caller to see a 401 becomes the leader of a refresh cycle; every
//! caller that sees a 401 while that cycle is open is queued as a subscriber
//! and handed the leader's outcome. The state lives behind a plain mutex that
//! is never held across an `.await`, so the "in flight" decision and the
//! enqueue happen atomically with respect to every other caller.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::RefreshError;

/// Outcome delivered to queued callers: the new access token or why there is none.
pub type RefreshOutcome = Result<String, RefreshError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    subscribers: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owns the process-wide refresh-cycle state of one [`super::AuthClient`].
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a caller that just saw a 401 should do next.
pub enum Ticket<'a> {
    /// No cycle was open; the caller must run the refresh and settle the cycle.
    Leader(RefreshCycle<'a>),
    /// A cycle is open; wait for its outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Join the open refresh cycle, or open one.
    pub fn join(&self) -> Ticket<'_> {
        let mut state = self.state();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.subscribers.push(tx);
            debug!(
                pending = state.subscribers.len(),
                "Refresh already in flight; queued caller"
            );
            Ticket::Follower(rx)
        } else {
            state.in_flight = true;
            Ticket::Leader(RefreshCycle {
                coordinator: self,
                settled: false,
            })
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.state().in_flight
    }

    pub fn pending_subscribers(&self) -> usize {
        self.state().subscribers.len()
    }

    /// Close the cycle: reset the flag, empty the queue, then notify every
    /// subscriber in the order it was queued.
    fn settle(&self, outcome: RefreshOutcome) {
        let subscribers = {
            let mut state = self.state();
            state.in_flight = false;
            std::mem::take(&mut state.subscribers)
        };
        for subscriber in subscribers {
            // A subscriber whose caller went away is simply skipped.
            let _ = subscriber.send(outcome.clone());
        }
    }
}

/// The leader's handle on an open refresh cycle.
///
/// Dropping it without calling [`RefreshCycle::succeed`] or
/// [`RefreshCycle::fail`] settles the cycle as [`RefreshError::Abandoned`],
/// so the in-flight flag can never outlive its leader.
pub struct RefreshCycle<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshCycle<'_> {
    pub fn succeed(mut self, token: &str) {
        self.settled = true;
        self.coordinator.settle(Ok(token.to_string()));
    }

    pub fn fail(mut self, error: RefreshError) {
        self.settled = true;
        self.coordinator.settle(Err(error));
    }
}

impl Drop for RefreshCycle<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(Err(RefreshError::Abandoned));
        }
    }
}
