//! hp-smartcard: Smart card credential retrieval
//!
//! Drives the card through request access, open session, PIN
//! authentication and secret retrieval, and always closes a session it
//! opened before returning.

pub mod mock;
mod protocol;

pub use protocol::SmartCardReader;
