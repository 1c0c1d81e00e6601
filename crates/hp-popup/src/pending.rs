//! Actions waiting on the latest derivation

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hp_core::types::PendingAction;

/// Set of queued actions, at most one of each kind
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingActions {
    copy: bool,
    fill_in: bool,
}

impl PendingActions {
    /// Queue `action`; queuing an already-queued kind is a no-op
    pub fn request(&mut self, action: PendingAction) {
        *self.flag(action) = true;
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        !self.copy && !self.fill_in
    }

    /// Dequeue everything, in priority order
    ///
    /// Flags are cleared before the caller performs anything, so a second
    /// idle transition while the actions run cannot fire them again.
    pub fn take_all(&mut self) -> Vec<PendingAction> {
        let mut actions = Vec::with_capacity(2);
        for action in [PendingAction::CopyToClipboard, PendingAction::AutofillAndClose] {
            let flag = self.flag(action);
            if std::mem::take(flag) {
                actions.push(action);
            }
        }
        actions
    }

    fn flag(&mut self, action: PendingAction) -> &mut bool {
        match action {
            PendingAction::CopyToClipboard => &mut self.copy,
            PendingAction::AutofillAndClose => &mut self.fill_in,
        }
    }
}

/// Transient "copied" indicator
///
/// Raising the indicator (re)starts its clear timer; at most one clear
/// timer is outstanding at a time.
#[derive(Clone, Default)]
pub struct CopyIndicator {
    inner: Arc<Mutex<IndicatorState>>,
}

#[derive(Default)]
struct IndicatorState {
    raised: bool,
    generation: u64,
    clear: Option<CancellationToken>,
}

impl CopyIndicator {
    /// Create a lowered indicator
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the indicator and lower it after `lifetime`
    ///
    /// Must be called from within a tokio runtime.
    pub fn raise(&self, lifetime: Duration) {
        let cancel = CancellationToken::new();
        let generation = {
            let mut state = self.lock();
            if let Some(previous) = state.clear.replace(cancel.clone()) {
                previous.cancel();
            }
            state.raised = true;
            state.generation += 1;
            state.generation
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(lifetime) => {
                    let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
                    if state.generation == generation {
                        state.raised = false;
                        state.clear = None;
                    }
                }
            }
        });
    }

    /// Whether the indicator is raised
    pub fn is_raised(&self) -> bool {
        self.lock().raised
    }

    /// Lower the indicator and stop its timer
    pub fn reset(&self) {
        let mut state = self.lock();
        if let Some(clear) = state.clear.take() {
            clear.cancel();
        }
        state.raised = false;
    }

    fn lock(&self) -> MutexGuard<'_, IndicatorState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
