//! Mock smart card for testing.
//!
//! This module provides a configurable mock implementation of
//! [`SmartCardPlatform`] that can be used in tests (and in the terminal
//! driver) without card hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hp_core::error::CollaboratorError;
use hp_core::traits::{AuthRequest, CardSession, SmartCardAccess, SmartCardPlatform};

/// A platform call recorded by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardCall {
    RequestAccess,
    OpenSession,
    Authenticate,
    GetSecretKey,
    Close,
}

/// How a step that yields a handle should behave
#[derive(Debug, Clone)]
enum StepOutcome {
    Grant,
    Withhold,
    Fail(String),
}

#[derive(Debug)]
struct MockState {
    supported: bool,
    access: StepOutcome,
    session: StepOutcome,
    expected_pin: Option<String>,
    auth_error: Option<String>,
    secret: Option<String>,
    read_error: Option<String>,
    close_error: Option<String>,
    panic_on_read: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<CardCall>>,
    closes: AtomicUsize,
}

impl MockState {
    async fn record(&self, call: CardCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// A mock smart card.
///
/// # Example
///
/// ```
/// use hp_smartcard::mock::MockSmartCard;
///
/// // A card that holds a secret and accepts PIN 1234
/// let card = MockSmartCard::with_secret("seed", "1234");
///
/// // A card whose session can never be opened
/// let broken = MockSmartCard::with_secret("seed", "1234").fail_session_open();
/// ```
#[derive(Debug, Clone)]
pub struct MockSmartCard {
    state: Arc<MockState>,
}

impl MockSmartCard {
    /// A card holding `secret` that accepts only `pin`.
    pub fn with_secret(secret: impl Into<String>, pin: impl Into<String>) -> Self {
        Self::from_state(MockState {
            supported: true,
            access: StepOutcome::Grant,
            session: StepOutcome::Grant,
            expected_pin: Some(pin.into()),
            auth_error: None,
            secret: Some(secret.into()),
            read_error: None,
            close_error: None,
            panic_on_read: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        })
    }

    /// A host without smart card support.
    pub fn unsupported() -> Self {
        Self::with_secret("", "").modify(|s| s.supported = false)
    }

    /// Access is granted but the platform returns no handle.
    pub fn withhold_access(self) -> Self {
        self.modify(|s| s.access = StepOutcome::Withhold)
    }

    /// The access request is rejected by the platform.
    pub fn reject_access(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.modify(|s| s.access = StepOutcome::Fail(message))
    }

    /// No session is returned when opening.
    pub fn fail_session_open(self) -> Self {
        self.modify(|s| s.session = StepOutcome::Withhold)
    }

    /// Opening a session is rejected by the platform.
    pub fn reject_session_open(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.modify(|s| s.session = StepOutcome::Fail(message))
    }

    /// Authentication itself errors (as opposed to rejecting the PIN).
    pub fn fail_authentication(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.modify(|s| s.auth_error = Some(message))
    }

    /// The card holds no secret.
    pub fn without_secret(self) -> Self {
        self.modify(|s| s.secret = None)
    }

    /// Reading the secret errors.
    pub fn fail_read(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.modify(|s| s.read_error = Some(message))
    }

    /// Closing the session errors.
    pub fn fail_close(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.modify(|s| s.close_error = Some(message))
    }

    /// Reading the secret panics.
    pub fn panic_on_read(self) -> Self {
        self.modify(|s| s.panic_on_read = true)
    }

    /// Every platform call suspends for `delay` before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.modify(|s| s.delay = Some(delay))
    }

    /// Platform calls made so far, in order.
    pub fn calls(&self) -> Vec<CardCall> {
        self.state
            .calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of sessions closed.
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Number of sessions opened.
    pub fn open_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == CardCall::OpenSession)
            .count()
    }

    fn from_state(state: MockState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    // Builders run before the card is shared, so the Arc is still unique.
    fn modify(self, f: impl FnOnce(&mut MockState)) -> Self {
        match Arc::try_unwrap(self.state) {
            Ok(mut state) => {
                f(&mut state);
                Self::from_state(state)
            }
            Err(state) => Self { state },
        }
    }
}

#[async_trait]
impl SmartCardPlatform for MockSmartCard {
    fn is_supported(&self) -> bool {
        self.state.supported
    }

    async fn request_access(&self) -> Result<Option<Box<dyn SmartCardAccess>>, CollaboratorError> {
        self.state.record(CardCall::RequestAccess).await;
        match &self.state.access {
            StepOutcome::Grant => Ok(Some(Box::new(MockAccess {
                state: Arc::clone(&self.state),
            }))),
            StepOutcome::Withhold => Ok(None),
            StepOutcome::Fail(message) => Err(CollaboratorError::new(message.clone())),
        }
    }
}

struct MockAccess {
    state: Arc<MockState>,
}

#[async_trait]
impl SmartCardAccess for MockAccess {
    async fn open_session(&self) -> Result<Option<Box<dyn CardSession>>, CollaboratorError> {
        self.state.record(CardCall::OpenSession).await;
        match &self.state.session {
            StepOutcome::Grant => Ok(Some(Box::new(MockSession {
                state: Arc::clone(&self.state),
            }))),
            StepOutcome::Withhold => Ok(None),
            StepOutcome::Fail(message) => Err(CollaboratorError::new(message.clone())),
        }
    }
}

struct MockSession {
    state: Arc<MockState>,
}

#[async_trait]
impl CardSession for MockSession {
    async fn authenticate(&self, request: AuthRequest<'_>) -> Result<bool, CollaboratorError> {
        self.state.record(CardCall::Authenticate).await;
        if let Some(message) = &self.state.auth_error {
            return Err(CollaboratorError::new(message.clone()));
        }
        Ok(match &self.state.expected_pin {
            Some(expected) => expected == request.pin.expose(),
            None => true,
        })
    }

    async fn get_secret_key(&self) -> Result<Option<String>, CollaboratorError> {
        self.state.record(CardCall::GetSecretKey).await;
        if self.state.panic_on_read {
            panic!("mock card failed while reading the secret");
        }
        if let Some(message) = &self.state.read_error {
            return Err(CollaboratorError::new(message.clone()));
        }
        Ok(self.state.secret.clone())
    }

    async fn close(&self) -> Result<(), CollaboratorError> {
        self.state.record(CardCall::Close).await;
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        match &self.state.close_error {
            Some(message) => Err(CollaboratorError::new(message.clone())),
            None => Ok(()),
        }
    }
}
