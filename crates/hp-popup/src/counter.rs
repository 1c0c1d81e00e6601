//! In-flight derivation counter
//!
//! Counts derivations that have been issued but not yet settled. The
//! count is only changed through [`InFlightGuard`], so every increment is
//! paired with exactly one decrement no matter how the guarded work ends:
//! success, error, panic or the future being dropped.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// Shared count of outstanding derivations
#[derive(Clone)]
pub struct InFlightCounter {
    tx: Arc<watch::Sender<usize>>,
}

impl InFlightCounter {
    /// Create a counter at zero
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Current number of outstanding derivations
    pub fn count(&self) -> usize {
        *self.tx.borrow()
    }

    /// Whether any derivation is outstanding
    pub fn is_updating(&self) -> bool {
        self.count() > 0
    }

    /// Increment now; the returned guard decrements when dropped
    pub fn acquire(&self) -> InFlightGuard {
        self.tx.send_modify(|count| *count += 1);
        InFlightGuard {
            counter: self.clone(),
        }
    }

    /// Run `fut` with the count held for its whole lifetime
    pub async fn run_scoped<F: Future>(&self, fut: F) -> F::Output {
        let _guard = self.acquire();
        fut.await
    }

    /// Observe count changes
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.tx.subscribe()
    }

    /// Resolve once the count is zero
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    fn release(&self) {
        self.tx.send_modify(|count| {
            debug_assert!(*count > 0, "in-flight count released below zero");
            *count = count.saturating_sub(1);
        });
    }
}

impl Default for InFlightCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds one unit of the in-flight count
#[must_use = "the count is released as soon as the guard is dropped"]
pub struct InFlightGuard {
    counter: InFlightCounter,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.counter.release();
    }
}
