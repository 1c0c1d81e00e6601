//! Terminal stand-ins for the popup's host collaborators

use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use hp_core::error::CollaboratorError;
use hp_core::traits::{Autofill, Clipboard, PopupWindow, SmartCardAccess, SmartCardPlatform};

/// Clipboard that prints what would have been copied
#[derive(Debug, Default)]
pub struct ConsoleClipboard {
    last: Mutex<Option<String>>,
}

impl ConsoleClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent clipboard contents
    pub fn contents(&self) -> Option<String> {
        self.last.lock().ok().and_then(|last| last.clone())
    }
}

#[async_trait]
impl Clipboard for ConsoleClipboard {
    async fn write_text(&self, text: &str) -> Result<(), CollaboratorError> {
        let mut last = self
            .last
            .lock()
            .map_err(|_| CollaboratorError::new("clipboard is unavailable"))?;
        *last = Some(text.to_owned());
        println!("copied: {}", text);
        Ok(())
    }
}

/// Autofill that prints the filled-in password
///
/// Fails when the host page has no password field.
#[derive(Debug)]
pub struct ConsoleAutofill {
    field_active: bool,
}

impl ConsoleAutofill {
    pub fn new(field_active: bool) -> Self {
        Self { field_active }
    }
}

#[async_trait]
impl Autofill for ConsoleAutofill {
    async fn fill_in(&self, password: &str) -> Result<(), CollaboratorError> {
        if !self.field_active {
            return Err(CollaboratorError::new("no password field is focused"));
        }
        println!("filled in: {}", password);
        Ok(())
    }
}

/// Closing the window stops the driver loop
#[derive(Debug)]
pub struct ConsoleWindow {
    closed: CancellationToken,
}

impl ConsoleWindow {
    pub fn new(closed: CancellationToken) -> Self {
        Self { closed }
    }
}

impl PopupWindow for ConsoleWindow {
    fn close(&self) {
        println!("popup closed");
        self.closed.cancel();
    }
}

/// Host without smart card support
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSmartCard;

#[async_trait]
impl SmartCardPlatform for NoSmartCard {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request_access(&self) -> Result<Option<Box<dyn SmartCardAccess>>, CollaboratorError> {
        Ok(None)
    }
}
