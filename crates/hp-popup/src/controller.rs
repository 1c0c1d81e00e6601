//! Popup controller
//!
//! One `PopupController` exists per popup lifetime. It owns the edit
//! state and turns user intents into scheduled derivations, smart card
//! retrievals and pending copy/fill-in actions.
//!
//! # Ordering
//!
//! - Edits re-arm the debouncer; only the last edit of a burst is derived.
//! - Every issued derivation gets a generation number. A result is stored
//!   only if no newer derivation was issued after it, so a slow call that
//!   settles late can never overwrite a newer value.
//! - Copy and fill-in first flush the debouncer, then run once the
//!   in-flight count returns to zero, using the settled value.
//!
//! Must be created and driven from within a tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use hp_core::config::PopupConfig;
use hp_core::error::{CollaboratorError, PopupError, SmartCardError};
use hp_core::traits::{
    Autofill, Clipboard, Deriver, PinEntry, PinPrompt, PopupWindow, SmartCardPlatform,
};
use hp_core::types::{CardPin, PasswordField, PendingAction, UiState};
use hp_smartcard::SmartCardReader;

use crate::counter::InFlightCounter;
use crate::pending::CopyIndicator;
use crate::scheduler::Debouncer;
use crate::state::{DerivationRequest, PopupState};

/// External collaborators the controller drives
pub struct Collaborators {
    /// Password derivation function
    pub deriver: Arc<dyn Deriver>,
    /// Page autofill
    pub autofill: Arc<dyn Autofill>,
    /// Platform clipboard
    pub clipboard: Arc<dyn Clipboard>,
    /// The popup window
    pub window: Arc<dyn PopupWindow>,
    /// Smart card capability
    pub smart_card: Arc<dyn SmartCardPlatform>,
}

/// Handle to the popup's orchestration state
///
/// Cloning is cheap; all clones drive the same popup.
#[derive(Clone)]
pub struct PopupController {
    shared: Arc<Shared>,
}

struct Shared {
    config: PopupConfig,
    state: Mutex<PopupState>,
    counter: InFlightCounter,
    // Action batches taken from `pending` but not yet finished
    actions: InFlightCounter,
    scheduler: Debouncer<DerivationRequest>,
    indicator: CopyIndicator,
    deriver: Arc<dyn Deriver>,
    autofill: Arc<dyn Autofill>,
    clipboard: Arc<dyn Clipboard>,
    window: Arc<dyn PopupWindow>,
    reader: SmartCardReader,
    can_fill_in: bool,
    shutdown: CancellationToken,
}

impl PopupController {
    /// Open the popup
    ///
    /// `initial_domain` is the host page's domain if already known, and
    /// `can_fill_in` whether the page has a password field to fill. A
    /// derivation for the initial state is scheduled immediately.
    pub fn new(
        config: PopupConfig,
        collaborators: Collaborators,
        initial_domain: Option<String>,
        can_fill_in: bool,
    ) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            let fire = move |request: DerivationRequest| {
                if let Some(shared) = weak.upgrade() {
                    shared.issue_derivation(request);
                }
            };
            let scheduler = Debouncer::new(config.debounce, fire);

            Shared {
                state: Mutex::new(PopupState::new(initial_domain)),
                counter: InFlightCounter::new(),
                actions: InFlightCounter::new(),
                scheduler,
                indicator: CopyIndicator::new(),
                deriver: collaborators.deriver,
                autofill: collaborators.autofill,
                clipboard: collaborators.clipboard,
                window: collaborators.window,
                reader: SmartCardReader::new(collaborators.smart_card),
                can_fill_in,
                shutdown: CancellationToken::new(),
                config,
            }
        });

        shared.spawn_idle_watcher();
        shared.schedule_current();

        tracing::debug!(debounce = ?shared.config.debounce, "popup opened");
        Self { shared }
    }

    /// Supply the host page's domain after the popup was opened
    ///
    /// Only the first value is kept. If the domain field is still unknown
    /// it adopts the value and a derivation is scheduled. Returns whether
    /// the value was accepted.
    pub fn provide_initial_domain(&self, domain: impl Into<String>) -> bool {
        let domain = domain.into();
        let adopted = {
            let mut state = self.shared.lock();
            if state.initial_domain.is_some() {
                return false;
            }
            state.initial_domain = Some(domain.clone());
            if state.domain.is_none() {
                state.domain = Some(domain);
                true
            } else {
                false
            }
        };
        if adopted {
            self.shared.schedule_current();
        }
        true
    }

    /// Replace the domain text
    pub fn set_domain(&self, text: impl Into<String>) {
        self.shared.lock().domain = Some(text.into());
        self.shared.schedule_current();
    }

    /// Replace the universal password text
    pub fn set_universal_password(&self, text: impl Into<String>) {
        self.shared.set_universal_password(text.into());
    }

    /// Restore the initial domain; returns `false` if there is nothing to reset
    pub fn reset_domain(&self) -> bool {
        {
            let mut state = self.shared.lock();
            if !state.can_reset() {
                return false;
            }
            state.domain = state.initial_domain.clone();
        }
        self.shared.schedule_current();
        true
    }

    /// Flip a field between masked and visible; returns the new masked state
    pub fn toggle_visibility(&self, field: PasswordField) -> bool {
        let mut state = self.shared.lock();
        let hidden = match field {
            PasswordField::Universal => &mut state.universal_hidden,
            PasswordField::Derived => &mut state.derived_hidden,
        };
        *hidden = !*hidden;
        *hidden
    }

    /// Copy the derived password once the latest edit has been derived
    pub fn request_copy(&self) {
        self.shared.request(PendingAction::CopyToClipboard);
    }

    /// Fill in the derived password and close, once the latest edit has
    /// been derived
    pub fn request_submit(&self) {
        self.shared.request(PendingAction::AutofillAndClose);
    }

    /// Seed the universal password from the smart card
    ///
    /// Rejected with [`PopupError::SmartCardBusy`] while another retrieval
    /// runs. On failure the error's message is also kept in
    /// [`UiState::smart_card_error`]. The retrieval runs in its own task,
    /// so dropping the returned future does not abandon an open session.
    pub async fn use_smart_card(&self, pin: CardPin) -> Result<(), PopupError> {
        {
            let mut state = self.shared.lock();
            if state.smart_card_busy {
                return Err(PopupError::SmartCardBusy);
            }
            state.smart_card_busy = true;
            state.smart_card_error = None;
        }

        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let _busy = BusyGuard(Arc::clone(&shared));
            let result = shared.reader.retrieve_secret(&pin).await;
            shared.finish_smart_card(result)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "smart card task ended abnormally");
                let err = PopupError::RetrievalAborted;
                self.shared.lock().smart_card_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Ask `prompt` for a PIN, then run [`use_smart_card`](Self::use_smart_card)
    ///
    /// A cancelled prompt changes nothing and returns `Ok(())`.
    pub async fn use_smart_card_with_prompt(
        &self,
        prompt: &dyn PinPrompt,
    ) -> Result<(), PopupError> {
        if self.shared.lock().smart_card_busy {
            return Err(PopupError::SmartCardBusy);
        }
        if !self.shared.reader.is_supported() {
            return Err(self.shared.smart_card_failed(SmartCardError::UnsupportedPlatform));
        }

        match prompt.prompt_pin().await {
            PinEntry::Entered(pin) => self.use_smart_card(pin).await,
            PinEntry::Cancelled => {
                tracing::debug!("PIN prompt cancelled");
                Ok(())
            }
        }
    }

    /// Snapshot of everything the presentation layer renders
    pub fn snapshot(&self) -> UiState {
        let state = self.shared.lock();
        UiState {
            domain: state.domain.clone(),
            initial_domain: state.initial_domain.clone(),
            universal_password: state.universal_password.clone(),
            derived_password: state.derived_password.clone(),
            is_updating: self.shared.counter.is_updating(),
            can_reset: state.can_reset(),
            is_smart_card_busy: state.smart_card_busy,
            smart_card_available: self.shared.reader.is_supported(),
            smart_card_error: state.smart_card_error.clone(),
            copied: self.shared.indicator.is_raised(),
            universal_password_hidden: state.universal_hidden,
            derived_password_hidden: state.derived_hidden,
            can_fill_in: self.shared.can_fill_in,
            closed: state.closed,
        }
    }

    /// Number of derivations issued but not yet settled
    pub fn in_flight(&self) -> usize {
        self.shared.counter.count()
    }

    /// Observe the in-flight count (e.g. to re-render `is_updating`)
    pub fn subscribe_in_flight(&self) -> watch::Receiver<usize> {
        self.shared.counter.subscribe()
    }

    /// Resolve once no derivation is in flight
    pub async fn wait_idle(&self) {
        self.shared.counter.wait_idle().await;
    }

    /// Resolve once no derivation is in flight and every requested
    /// action has run
    ///
    /// An edit still inside its debounce window is not waited for.
    pub async fn wait_settled(&self) {
        loop {
            self.shared.counter.wait_idle().await;
            self.shared.resolve_pending();
            self.shared.actions.wait_idle().await;

            let drained =
                self.shared.lock().pending.is_empty() && !self.shared.counter.is_updating();
            if drained || self.shared.shutdown.is_cancelled() {
                return;
            }
        }
    }

    /// Stop timers and the idle watcher
    ///
    /// Derivations already in flight are left to settle.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PopupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_current(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let request = self.lock().derivation_request();
        self.scheduler.schedule(request);
    }

    fn set_universal_password(&self, text: String) {
        self.lock().universal_password = text;
        self.schedule_current();
    }

    /// Start one derivation; called by the debouncer
    fn issue_derivation(self: &Arc<Self>, request: DerivationRequest) {
        // Issue under the state lock so the idle check in
        // `resolve_pending` never sees a generation without its count.
        let (generation, guard) = {
            let mut state = self.lock();
            (state.begin_derivation(), self.counter.acquire())
        };
        tracing::debug!(generation, "derivation issued");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            let result = shared
                .deriver
                .derive(&request.domain, &request.universal_password)
                .await;
            shared.settle(generation, result);
        });
    }

    fn settle(&self, generation: u64, result: Result<String, CollaboratorError>) {
        match result {
            Ok(password) => {
                let mut state = self.lock();
                if !state.accept(generation, password) {
                    tracing::debug!(
                        generation,
                        latest = state.issued_generation,
                        "discarding stale derivation"
                    );
                }
            }
            Err(e) => {
                let err = PopupError::DerivationFailed(e);
                tracing::error!(error = %err, generation, "keeping previous derived password");
            }
        }
    }

    fn request(self: &Arc<Self>, action: PendingAction) {
        self.scheduler.flush();
        self.lock().pending.request(action);
        tracing::debug!(%action, in_flight = self.counter.count(), "action requested");
        self.resolve_pending();
    }

    fn spawn_idle_watcher(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut rx = self.counter.subscribe();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if *rx.borrow_and_update() != 0 {
                            continue;
                        }
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        shared.resolve_pending();
                    }
                }
            }
        });
    }

    /// Run queued actions if no derivation is in flight
    fn resolve_pending(self: &Arc<Self>) {
        let (actions, password, running) = {
            let mut state = self.lock();
            if self.counter.is_updating() || state.pending.is_empty() {
                return;
            }
            (
                state.pending.take_all(),
                state.derived_password.clone(),
                self.actions.acquire(),
            )
        };

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let _running = running;
            for action in actions {
                let result = match action {
                    PendingAction::CopyToClipboard => shared.copy_to_clipboard(&password).await,
                    PendingAction::AutofillAndClose => shared.fill_in_and_close(&password).await,
                };
                if let Err(err) = result {
                    tracing::error!(error = %err, %action, "pending action failed");
                }
            }
        });
    }

    async fn copy_to_clipboard(&self, password: &str) -> Result<(), PopupError> {
        self.clipboard
            .write_text(password)
            .await
            .map_err(PopupError::ClipboardWriteFailed)?;
        self.indicator.raise(self.config.copy_indicator);
        Ok(())
    }

    async fn fill_in_and_close(&self, password: &str) -> Result<(), PopupError> {
        self.autofill
            .fill_in(password)
            .await
            .map_err(PopupError::AutofillFailed)?;
        self.lock().closed = true;
        self.window.close();
        self.shutdown();
        Ok(())
    }

    fn finish_smart_card(&self, result: Result<String, SmartCardError>) -> Result<(), PopupError> {
        match result {
            Ok(secret) => {
                tracing::info!("universal password loaded from smart card");
                self.set_universal_password(secret);
                Ok(())
            }
            Err(err) => Err(self.smart_card_failed(err)),
        }
    }

    fn smart_card_failed(&self, err: SmartCardError) -> PopupError {
        self.lock().smart_card_error = Some(err.to_string());
        PopupError::SmartCard(err)
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
        self.scheduler.cancel();
        self.indicator.reset();
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Clears the smart card busy flag however the retrieval task ends
struct BusyGuard(Arc<Shared>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.lock().smart_card_busy = false;
    }
}
