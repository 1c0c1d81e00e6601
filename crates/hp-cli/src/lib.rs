//! hashpass: terminal driver for the Hashpass popup
//!
//! Wires a [`hp_popup::PopupController`] to console collaborators and the
//! reference Hashpass derivation, and drives it from line commands.

pub mod commands;
pub mod console;
pub mod derive;
pub mod driver;
pub mod output;
