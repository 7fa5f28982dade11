// Keyflux Event Queue
// Producer/consumer FIFO between the ingestion and dispatch loops

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::input::SemanticEvent;

/// FIFO queue guarded by a mutex and a wait/notify condition. The only thing
/// shared between the two loops.
#[derive(Default)]
pub struct EventQueue {
    inner: Mutex<VecDeque<SemanticEvent>>,
    ready: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and wake one waiter.
    pub fn push(&self, event: SemanticEvent) {
        self.inner.lock().push_back(event);
        self.ready.notify_one();
    }

    /// Block up to `timeout` for an event. Returns None when the timeout
    /// elapses or the cancel token fires. The remaining timeout is recomputed
    /// across each wake-up, so spurious wakes cannot extend the wait.
    pub fn pop(&self, timeout: Duration, cancel: &CancelToken) -> Option<SemanticEvent> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.lock();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            if cancel.is_cancelled() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.ready.wait_for(&mut queue, deadline - now);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
