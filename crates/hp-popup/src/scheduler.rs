//! Trailing-edge debouncer
//!
//! [`Debouncer::schedule`] records the newest arguments and re-arms a
//! timer. When the timer fires after a quiet period, the callback runs
//! once with the last recorded arguments. [`Debouncer::flush`] cancels
//! the timer and runs the callback immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

type FireFn<T> = dyn Fn(T) + Send + Sync;

/// Coalesces bursts of calls into one delayed callback
pub struct Debouncer<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    delay: Duration,
    fire: Box<FireFn<T>>,
    armed: Mutex<Option<Armed<T>>>,
    next_id: AtomicU64,
}

struct Armed<T> {
    id: u64,
    args: T,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer that calls `fire` after `delay` of quiet
    ///
    /// `fire` runs synchronously on the timer task (or on the caller of
    /// [`flush`](Self::flush)) and must not block.
    pub fn new(delay: Duration, fire: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                fire: Box::new(fire),
                armed: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Record `args` and restart the quiet period
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, args: T) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let previous = self.inner.lock().replace(Armed {
            id,
            args,
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        tracing::trace!(id, delay = ?self.inner.delay, "debounce armed");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(inner.delay) => inner.fire_if_current(id),
            }
        });
    }

    /// Fire now if armed; returns whether the callback ran
    pub fn flush(&self) -> bool {
        match self.inner.take() {
            Some(armed) => {
                armed.cancel.cancel();
                (self.inner.fire)(armed.args);
                true
            }
            None => false,
        }
    }

    /// Drop the armed call without firing; returns whether one was armed
    pub fn cancel(&self) -> bool {
        match self.inner.take() {
            Some(armed) => {
                armed.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a call is waiting for its quiet period to end
    pub fn is_armed(&self) -> bool {
        self.inner.lock().is_some()
    }
}

impl<T> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Option<Armed<T>>> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<Armed<T>> {
        self.lock().take()
    }

    fn fire_if_current(&self, id: u64) {
        let armed = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(armed) if armed.id == id => slot.take(),
                _ => None,
            }
        };
        if let Some(armed) = armed {
            (self.fire)(armed.args);
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(armed) = self.inner.take() {
            armed.cancel.cancel();
        }
    }
}
