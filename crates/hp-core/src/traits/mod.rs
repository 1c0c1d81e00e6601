//! Core trait definitions

mod collaborators;
mod smartcard;

pub use collaborators::{Autofill, Clipboard, Deriver, PopupWindow};
pub use smartcard::{
    AuthMethod, AuthRequest, CardSession, PinEntry, PinPrompt, SmartCardAccess, SmartCardPlatform,
};
