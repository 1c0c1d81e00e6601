//! Core domain types

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::error::PinError;

/// Smart card PIN collected from the user
///
/// A `CardPin` is never empty: construction rejects empty and
/// whitespace-only input.
#[derive(Debug)]
pub struct CardPin(SecretString);

impl CardPin {
    /// Validate and wrap a PIN
    pub fn new(pin: impl Into<String>) -> Result<Self, PinError> {
        let pin = pin.into();
        if pin.trim().is_empty() {
            return Err(PinError::Empty);
        }
        Ok(Self(SecretString::from(pin)))
    }

    /// Expose the PIN for submission to the card
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Password fields whose visibility can be toggled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordField {
    /// The user's universal password
    Universal,
    /// The derived, per-domain password
    Derived,
}

impl fmt::Display for PasswordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordField::Universal => write!(f, "universal"),
            PasswordField::Derived => write!(f, "derived"),
        }
    }
}

/// Actions that depend on the latest derivation result
///
/// Variants are declared in resolution priority order: copying is
/// non-destructive, so it runs before fill-in closes the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PendingAction {
    /// Write the derived password to the clipboard
    CopyToClipboard,
    /// Fill the derived password into the page and close the popup
    AutofillAndClose,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingAction::CopyToClipboard => write!(f, "copy-to-clipboard"),
            PendingAction::AutofillAndClose => write!(f, "autofill-and-close"),
        }
    }
}

/// Lifecycle of one smart card retrieval attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing requested yet
    Idle,
    /// Access handle obtained
    AccessRequested,
    /// Session opened on the access handle
    SessionOpen,
    /// PIN accepted
    Authenticated,
    /// Secret read from the card
    KeyRetrieved,
    /// Session closed
    Closed,
    /// A step failed
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::AccessRequested => "access-requested",
            SessionPhase::SessionOpen => "session-open",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::KeyRetrieved => "key-retrieved",
            SessionPhase::Closed => "closed",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Read-only snapshot of the popup for the presentation layer
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Current domain text (`None` until known)
    pub domain: Option<String>,
    /// Domain supplied by the host page
    pub initial_domain: Option<String>,
    /// Universal password text
    pub universal_password: String,
    /// Last accepted derivation result
    pub derived_password: String,
    /// A derivation is in flight
    pub is_updating: bool,
    /// The domain diverges from the initial domain
    pub can_reset: bool,
    /// A smart card retrieval is running
    pub is_smart_card_busy: bool,
    /// The platform exposes a smart card capability
    pub smart_card_available: bool,
    /// Message from the last failed smart card retrieval
    pub smart_card_error: Option<String>,
    /// The "copied" indicator is raised
    pub copied: bool,
    /// Universal password is masked
    pub universal_password_hidden: bool,
    /// Derived password is masked
    pub derived_password_hidden: bool,
    /// The page has a password field to fill
    pub can_fill_in: bool,
    /// The popup has been closed after a fill-in
    pub closed: bool,
}

impl UiState {
    /// Whether `field` is currently masked
    pub fn is_hidden(&self, field: PasswordField) -> bool {
        match field {
            PasswordField::Universal => self.universal_password_hidden,
            PasswordField::Derived => self.derived_password_hidden,
        }
    }
}

impl fmt::Debug for UiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiState")
            .field("domain", &self.domain)
            .field("initial_domain", &self.initial_domain)
            .field("universal_password", &"[REDACTED]")
            .field("derived_password", &"[REDACTED]")
            .field("is_updating", &self.is_updating)
            .field("can_reset", &self.can_reset)
            .field("is_smart_card_busy", &self.is_smart_card_busy)
            .field("smart_card_available", &self.smart_card_available)
            .field("smart_card_error", &self.smart_card_error)
            .field("copied", &self.copied)
            .field("can_fill_in", &self.can_fill_in)
            .field("closed", &self.closed)
            .finish()
    }
}
