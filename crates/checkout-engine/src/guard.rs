//! # Processing Guard
//!
//! Keeps a payment button disabled for a short, fixed time after each click.
//! This is a responsiveness guard, not a lock: submission idempotency belongs
//! to the purchase service.
//!
//! Only one release timer is ever armed. A new invocation aborts the previous
//! timer before arming its own, so a stale timer from an earlier click cannot
//! clear the busy flag of a later one. Each invocation gets a generation so
//! neither a timer that already woke up nor a slow attempt that fails late
//! can release a newer attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    busy: bool,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl GuardState {
    fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Identifies the invocation that set the busy flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardTicket(u64);

/// Busy flag with race-safe timer management. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProcessingGuard {
    state: Arc<Mutex<GuardState>>,
    release_after: Duration,
}

impl ProcessingGuard {
    pub fn new(release_after: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(GuardState::default())),
            release_after,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    /// Mark busy, run the handler, then arm a fresh release timer.
    ///
    /// The handler runs synchronously and receives the ticket that later
    /// releases this invocation. Must be called inside a tokio runtime.
    pub fn invoke<R>(&self, handler: impl FnOnce(GuardTicket) -> R) -> R {
        let generation = {
            let mut state = self.lock();
            state.disarm();
            state.busy = true;
            state.generation += 1;
            state.generation
        };

        let output = handler(GuardTicket(generation));
        self.arm(generation);
        output
    }

    /// Clear busy now, unless a later invocation has taken over
    pub fn release_attempt(&self, ticket: GuardTicket) {
        let mut state = self.lock();
        if state.generation != ticket.0 {
            debug!("Stale attempt left the processing guard untouched");
            return;
        }
        Self::clear(&mut state);
    }

    /// Hosting surface became invisible
    pub fn on_hidden(&self) {
        debug!("Surface hidden, releasing processing guard");
        Self::clear(&mut self.lock());
    }

    fn clear(state: &mut GuardState) {
        state.disarm();
        state.busy = false;
        state.generation += 1;
    }

    fn arm(&self, generation: u64) {
        let shared = Arc::clone(&self.state);
        let delay = self.release_after;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if state.generation == generation {
                state.busy = false;
                state.timer = None;
            }
        });

        let mut state = self.lock();
        if state.generation == generation {
            state.timer = Some(timer);
        } else {
            // released while the handler ran
            timer.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
