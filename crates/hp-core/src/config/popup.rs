//! Popup timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_millis;

/// Default quiet window before a derivation is issued
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Default lifetime of the "copied" indicator
pub const DEFAULT_COPY_INDICATOR: Duration = Duration::from_millis(1000);

/// Configuration for the popup orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Quiet period that edits must observe before a derivation is issued
    #[serde(with = "duration_millis")]
    pub debounce: Duration,

    /// How long the "copied" indicator stays raised after a copy
    #[serde(with = "duration_millis")]
    pub copy_indicator: Duration,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            copy_indicator: DEFAULT_COPY_INDICATOR,
        }
    }
}

impl PopupConfig {
    /// Override the debounce window
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
