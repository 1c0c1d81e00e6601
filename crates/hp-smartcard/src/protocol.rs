//! Smart card credential session protocol
//!
//! A retrieval attempt walks the card through a fixed sequence:
//!
//! 1. capability check (no platform call is made if it fails)
//! 2. request access
//! 3. open session
//! 4. authenticate with the caller's PIN
//! 5. read the secret key
//! 6. close the session
//!
//! Step 6 runs whenever step 3 succeeded, on every exit path of steps
//! 4-5 including a panic inside the platform. A close failure is logged
//! and never replaces the outcome of steps 4-5.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use hp_core::error::SmartCardError;
use hp_core::traits::{AuthMethod, AuthRequest, CardSession, SmartCardPlatform};
use hp_core::types::{CardPin, SessionPhase};

/// Retrieves the universal password seed from a smart card
///
/// Every call is a fresh attempt; nothing is retried automatically and
/// no session outlives the call that opened it.
#[derive(Clone)]
pub struct SmartCardReader {
    platform: Arc<dyn SmartCardPlatform>,
}

impl SmartCardReader {
    /// Create a reader over a platform
    pub fn new(platform: Arc<dyn SmartCardPlatform>) -> Self {
        Self { platform }
    }

    /// Whether the host exposes smart card support
    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    /// Run the full protocol and return the card's secret
    pub async fn retrieve_secret(&self, pin: &CardPin) -> Result<String, SmartCardError> {
        let mut phase = PhaseTracker::default();
        let result = self.run(pin, &mut phase).await;

        if let Err(err) = &result {
            tracing::warn!(error = %err, phase = %phase.current, "smart card retrieval failed");
        }
        result
    }

    async fn run(&self, pin: &CardPin, phase: &mut PhaseTracker) -> Result<String, SmartCardError> {
        if !self.platform.is_supported() {
            phase.advance(SessionPhase::Failed);
            return Err(SmartCardError::UnsupportedPlatform);
        }

        let access = match self.platform.request_access().await {
            Ok(Some(access)) => access,
            Ok(None) => {
                phase.advance(SessionPhase::Failed);
                return Err(SmartCardError::AccessDenied);
            }
            Err(e) => {
                tracing::warn!(error = %e, "smart card access request rejected");
                phase.advance(SessionPhase::Failed);
                return Err(SmartCardError::AccessDenied);
            }
        };
        phase.advance(SessionPhase::AccessRequested);

        let session = match access.open_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                phase.advance(SessionPhase::Failed);
                return Err(SmartCardError::SessionOpenFailed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "smart card session open rejected");
                phase.advance(SessionPhase::Failed);
                return Err(SmartCardError::SessionOpenFailed);
            }
        };
        phase.advance(SessionPhase::SessionOpen);

        let outcome = AssertUnwindSafe(read_secret(session.as_ref(), pin, phase))
            .catch_unwind()
            .await;

        match session.close().await {
            Ok(()) => phase.advance(SessionPhase::Closed),
            Err(e) => {
                let err = SmartCardError::SessionCloseFailed(e);
                tracing::warn!(error = %err, "ignoring smart card close failure");
                phase.advance(SessionPhase::Failed);
            }
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Steps 4-5, run while the session is held open
async fn read_secret(
    session: &dyn CardSession,
    pin: &CardPin,
    phase: &mut PhaseTracker,
) -> Result<String, SmartCardError> {
    let request = AuthRequest {
        method: AuthMethod::Pin,
        pin,
    };
    match session.authenticate(request).await {
        Ok(true) => {}
        Ok(false) => {
            phase.advance(SessionPhase::Failed);
            return Err(SmartCardError::AuthenticationFailed);
        }
        Err(e) => {
            tracing::warn!(error = %e, "smart card authentication error");
            phase.advance(SessionPhase::Failed);
            return Err(SmartCardError::AuthenticationFailed);
        }
    }
    phase.advance(SessionPhase::Authenticated);

    match session.get_secret_key().await {
        Ok(Some(secret)) if !secret.is_empty() => {
            phase.advance(SessionPhase::KeyRetrieved);
            Ok(secret)
        }
        Ok(_) => {
            phase.advance(SessionPhase::Failed);
            Err(SmartCardError::NoSecretFound)
        }
        Err(e) => {
            tracing::warn!(error = %e, "smart card secret read failed");
            phase.advance(SessionPhase::Failed);
            Err(SmartCardError::NoSecretFound)
        }
    }
}

#[derive(Debug)]
struct PhaseTracker {
    current: SessionPhase,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            current: SessionPhase::Idle,
        }
    }
}

impl PhaseTracker {
    fn advance(&mut self, next: SessionPhase) {
        tracing::debug!(from = %self.current, to = %next, "smart card session phase");
        self.current = next;
    }
}
