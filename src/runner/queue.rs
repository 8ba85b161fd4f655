//! Input handoff between turn producers and the session driver.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<String>,
    closed: bool,
}

/// Buffered handoff of session inputs.
///
/// Producers are the turn coordinator (caller inputs) and the driver itself
/// (synthetic follow-ups). The consumer is the driver loop. Waiting consumers
/// are parked on a [`Notify`] and served in arrival order.
#[derive(Debug, Default)]
pub struct InputQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input. Returns `false` (and drops the input) once closed.
    pub fn enqueue(&self, input: impl Into<String>) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.items.push_back(input.into());
        drop(state);
        self.notify.notify_one();
        true
    }

    /// Wait for the next input.
    ///
    /// Returns `None` once the queue is closed, including for consumers that
    /// were already waiting when [`close`](Self::close) ran.
    pub async fn take(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a concurrent enqueue or close
            // cannot slip between the check and the wait.
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
            }

            notified.await;
        }
    }

    /// Close the queue and wake every waiter. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of inputs not yet taken.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
