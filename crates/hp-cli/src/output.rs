//! Rendering of the popup state for the terminal

use hp_core::types::{PasswordField, UiState};

const MASK: &str = "********";

/// Format a popup snapshot as aligned `label: value` lines
///
/// Password fields honour their visibility toggles; an empty field is
/// shown as `(empty)` whether masked or not.
pub fn format_state(state: &UiState) -> String {
    let mut domain = state.domain.clone().unwrap_or_else(|| "(unknown)".into());
    if state.can_reset {
        if let Some(initial) = &state.initial_domain {
            domain.push_str(&format!("  [reset to {}]", initial));
        }
    }

    let mut derived = field(state, PasswordField::Derived, &state.derived_password);
    if state.is_updating {
        derived.push_str("  [updating]");
    }
    if state.copied {
        derived.push_str("  [copied]");
    }

    let card = if state.is_smart_card_busy {
        "busy".to_string()
    } else if let Some(error) = &state.smart_card_error {
        format!("error: {}", error)
    } else if state.smart_card_available {
        "available".to_string()
    } else {
        "unavailable".to_string()
    };

    let lines = [
        ("domain", domain),
        (
            "universal",
            field(state, PasswordField::Universal, &state.universal_password),
        ),
        ("derived", derived),
        ("smart card", card),
        (
            "fill in",
            if state.can_fill_in { "yes" } else { "no" }.to_string(),
        ),
    ];

    lines
        .iter()
        .map(|(label, value)| format!("{:<11} {}", format!("{}:", label), value))
        .collect::<Vec<_>>()
        .join("\n")
}

fn field(state: &UiState, which: PasswordField, value: &str) -> String {
    if value.is_empty() {
        "(empty)".to_string()
    } else if state.is_hidden(which) {
        MASK.to_string()
    } else {
        value.to_string()
    }
}
