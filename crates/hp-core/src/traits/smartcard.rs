//! Smart card platform traits

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::types::CardPin;

/// Authentication method requested from the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// PIN verification
    Pin,
}

/// Authentication request submitted to an open session
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// Method to authenticate with
    pub method: AuthMethod,
    /// PIN to verify
    pub pin: &'a CardPin,
}

/// Host capability for talking to smart cards
#[async_trait]
pub trait SmartCardPlatform: Send + Sync {
    /// Whether the host exposes smart card support at all
    fn is_supported(&self) -> bool;

    /// Ask for access to the card
    ///
    /// Returns `None` if the platform yields no access handle.
    async fn request_access(&self) -> Result<Option<Box<dyn SmartCardAccess>>, CollaboratorError>;
}

/// Access handle granted by the platform
#[async_trait]
pub trait SmartCardAccess: Send + Sync {
    /// Open a session on the card
    ///
    /// Returns `None` if no session could be opened.
    async fn open_session(&self) -> Result<Option<Box<dyn CardSession>>, CollaboratorError>;
}

/// An open session with the card
#[async_trait]
pub trait CardSession: Send + Sync {
    /// Verify the user; `Ok(false)` means the card rejected the credential
    async fn authenticate(&self, request: AuthRequest<'_>) -> Result<bool, CollaboratorError>;

    /// Read the stored secret key, `None` if the card holds none
    async fn get_secret_key(&self) -> Result<Option<String>, CollaboratorError>;

    /// Close the session
    async fn close(&self) -> Result<(), CollaboratorError>;
}

/// Outcome of asking the user for a PIN
#[derive(Debug)]
pub enum PinEntry {
    /// The user entered a (non-empty) PIN
    Entered(CardPin),
    /// The user dismissed the prompt
    Cancelled,
}

/// Collects a PIN from the user (e.g. a modal dialog)
#[async_trait]
pub trait PinPrompt: Send + Sync {
    /// Ask for a PIN
    async fn prompt_pin(&self) -> PinEntry;
}
