//! Popup collaborator traits
//!
//! The orchestrator never touches the platform directly. Everything it
//! needs from the outside world comes through these traits, which keeps
//! the ordering logic testable with mocks.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// Deterministic password derivation
///
/// Implementations must be pure: the same `(domain, universal_password)`
/// pair always yields the same output.
#[async_trait]
pub trait Deriver: Send + Sync {
    /// Derive the per-domain password
    async fn derive(&self, domain: &str, universal_password: &str)
        -> Result<String, CollaboratorError>;
}

/// Writes a password into the host page's form field
#[async_trait]
pub trait Autofill: Send + Sync {
    /// Fill in `password`
    async fn fill_in(&self, password: &str) -> Result<(), CollaboratorError>;
}

/// Platform clipboard
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`
    async fn write_text(&self, text: &str) -> Result<(), CollaboratorError>;
}

/// The popup window itself
pub trait PopupWindow: Send + Sync {
    /// Close the popup
    fn close(&self);
}
