//! hp-popup: Derivation orchestration for the Hashpass popup
//!
//! The popup recomputes the derived password as the user types. This
//! crate owns the ordering rules around that recomputation: edits are
//! debounced into single derivations, in-flight derivations are counted,
//! stale results are discarded, and copy/fill-in requests wait for the
//! latest result before acting.

pub mod controller;
pub mod counter;
pub mod pending;
pub mod scheduler;
mod state;

pub use controller::{Collaborators, PopupController};
pub use counter::{InFlightCounter, InFlightGuard};
pub use pending::{CopyIndicator, PendingActions};
pub use scheduler::Debouncer;
