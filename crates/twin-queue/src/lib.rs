//! Blocking multi-producer single-consumer FIFO.
//!
//! One `Mutex` + `Condvar` pair guards an unbounded `VecDeque`. Producers
//! never block; the consumer parks in [`Consumer::pop`] until a value
//! arrives, the queue is closed, or every producer is gone. Closing is the
//! cancellation path: it wakes the consumer immediately, so there is no
//! need to peek at emptiness before waiting.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a pop returned without a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PopError {
    /// Shutdown was requested through a [`CloseHandle`].
    #[error("queue closed")]
    Closed,
    /// Every producer was dropped and the queue is drained.
    #[error("all producers disconnected")]
    Disconnected,
    /// A bounded wait elapsed with the queue still empty.
    #[error("timed out waiting for a value")]
    Timeout,
}

/// Push rejected because the queue was closed. Carries the value back.
#[derive(Clone, PartialEq, Eq, Error)]
pub enum PushError<T> {
    #[error("queue closed")]
    Closed(T),
}

impl<T> PushError<T> {
    /// Recover the value that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            PushError::Closed(value) => value,
        }
    }
}

impl<T> core::fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Closed(..)")
    }
}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    producers: usize,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> Shared<T> {
    // Every critical section is a single VecDeque call or flag write, so a
    // panic elsewhere cannot leave the state half-updated.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }
}

/// Create a queue and split it into its producer and consumer halves.
pub fn channel<T>() -> (Producer<T>, Consumer<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            items: VecDeque::new(),
            closed: false,
            producers: 1,
        }),
        available: Condvar::new(),
    });

    (
        Producer { shared: Arc::clone(&shared) },
        Consumer { shared },
    )
}

/// Write half. Clone it to add producers.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Append to the tail and wake one waiting consumer. Never blocks on
    /// capacity.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        let mut state = self.shared.lock();
        if state.closed {
            return Err(PushError::Closed(value));
        }
        state.items.push_back(value);
        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Snapshot only; may be stale by the time the caller looks at it.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().items.is_empty()
    }

    /// Whether the consumer side has requested shutdown.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        self.shared.lock().producers += 1;
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.producers -= 1;
        let last = state.producers == 0;
        drop(state);
        if last {
            self.shared.available.notify_all();
        }
    }
}

/// Read half. There is exactly one.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// Remove the head, parking the thread while the queue is empty.
    ///
    /// Returns [`PopError::Closed`] as soon as the queue is closed, even if
    /// values remain; those are discarded with the queue. Returns
    /// [`PopError::Disconnected`] once all producers are dropped and the
    /// remaining values have been drained.
    pub fn pop(&self) -> Result<T, PopError> {
        let mut state = self.shared.lock();
        loop {
            if let Some(value) = Self::take(&mut state)? {
                return Ok(value);
            }
            state = self
                .shared
                .available
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`pop`](Self::pop) but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, PopError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            if let Some(value) = Self::take(&mut state)? {
                return Ok(value);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PopError::Timeout);
            }
            let (guard, _) = self
                .shared
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    /// Remove the head if there is one. Never blocks.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.shared.lock();
        if state.closed {
            return None;
        }
        state.items.pop_front()
    }

    /// Snapshot only; do not use it to decide whether to call `pop`.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().items.is_empty()
    }

    /// Snapshot of the queue depth.
    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    /// Handle that can cancel a blocked [`pop`](Self::pop) from any thread.
    pub fn close_handle(&self) -> CloseHandle<T> {
        CloseHandle { shared: Arc::clone(&self.shared) }
    }

    /// Close the queue from the consumer side.
    pub fn close(&self) {
        self.shared.close();
    }

    #[inline]
    fn take(state: &mut State<T>) -> Result<Option<T>, PopError> {
        if state.closed {
            return Err(PopError::Closed);
        }
        match state.items.pop_front() {
            Some(value) => Ok(Some(value)),
            None if state.producers == 0 => Err(PopError::Disconnected),
            None => Ok(None),
        }
    }
}

/// Shutdown half of the queue.
pub struct CloseHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> CloseHandle<T> {
    /// Request shutdown. Idempotent; wakes every waiter.
    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Number of values that were still queued. Useful to report what a
    /// close discarded.
    pub fn pending(&self) -> usize {
        self.shared.lock().items.len()
    }
}

impl<T> Clone for CloseHandle<T> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}
