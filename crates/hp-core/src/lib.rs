//! hp-core: Core abstractions and configuration for the Hashpass popup
//!
//! This crate provides the shared types, error taxonomy, configuration
//! structures and collaborator traits used by the smart card protocol,
//! the popup orchestrator and the terminal driver.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{CollaboratorError, PopupError, SmartCardError};
pub use types::{CardPin, PasswordField, PendingAction, SessionPhase, UiState};
