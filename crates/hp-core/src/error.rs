//! Core error types for the Hashpass popup

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by an external collaborator (derivation worker,
/// clipboard, autofill, smart card platform).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CollaboratorError {
    message: String,
}

impl CollaboratorError {
    /// Create a new collaborator error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The collaborator's failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for the popup orchestrator
#[derive(Error, Debug)]
pub enum PopupError {
    /// The derivation function rejected
    #[error("Failed to derive password: {0}")]
    DerivationFailed(#[source] CollaboratorError),

    /// Writing to the clipboard failed
    #[error("Failed to copy to clipboard: {0}")]
    ClipboardWriteFailed(#[source] CollaboratorError),

    /// Filling in the page's password field failed
    #[error("Failed to fill in password: {0}")]
    AutofillFailed(#[source] CollaboratorError),

    /// Smart card retrieval failed
    #[error(transparent)]
    SmartCard(#[from] SmartCardError),

    /// A smart card retrieval is already running
    #[error("A smart card request is already in progress.")]
    SmartCardBusy,

    /// The retrieval task ended without producing a result
    #[error("Smart card request was aborted.")]
    RetrievalAborted,
}

/// Smart card protocol errors
///
/// The display text of each variant is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmartCardError {
    /// The host exposes no smart card capability
    #[error("Smart Card API is not supported in this browser.")]
    UnsupportedPlatform,

    /// Access to the card was refused or yielded no handle
    #[error("Unable to access the smart card.")]
    AccessDenied,

    /// No session could be opened on the access handle
    #[error("Failed to open a smart card session.")]
    SessionOpenFailed,

    /// The card rejected the PIN
    #[error("Failed to authenticate with the smart card.")]
    AuthenticationFailed,

    /// The card holds no secret key
    #[error("No secret key found on the smart card.")]
    NoSecretFound,

    /// Closing the session failed (logged only, never surfaced)
    #[error("Failed to close the smart card session: {0}")]
    SessionCloseFailed(#[source] CollaboratorError),
}

/// PIN validation errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// The PIN was empty or whitespace only
    #[error("PIN cannot be empty.")]
    Empty,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
