//! Mutable popup state owned by the controller

use crate::pending::PendingActions;

/// Arguments for one derivation
pub(crate) struct DerivationRequest {
    pub domain: String,
    pub universal_password: String,
}

/// Everything the controller mutates, guarded by one lock
pub(crate) struct PopupState {
    pub domain: Option<String>,
    pub initial_domain: Option<String>,
    pub universal_password: String,
    pub derived_password: String,
    /// Generation of the most recently issued derivation
    pub issued_generation: u64,
    pub pending: PendingActions,
    pub universal_hidden: bool,
    pub derived_hidden: bool,
    pub smart_card_busy: bool,
    pub smart_card_error: Option<String>,
    pub closed: bool,
}

impl PopupState {
    pub fn new(initial_domain: Option<String>) -> Self {
        Self {
            domain: initial_domain.clone(),
            initial_domain,
            universal_password: String::new(),
            derived_password: String::new(),
            issued_generation: 0,
            pending: PendingActions::default(),
            universal_hidden: true,
            derived_hidden: true,
            smart_card_busy: false,
            smart_card_error: None,
            closed: false,
        }
    }

    pub fn can_reset(&self) -> bool {
        match &self.initial_domain {
            Some(initial) => self.domain.as_deref() != Some(initial.as_str()),
            None => false,
        }
    }

    pub fn derivation_request(&self) -> DerivationRequest {
        DerivationRequest {
            domain: self.domain.clone().unwrap_or_default(),
            universal_password: self.universal_password.clone(),
        }
    }

    /// Record a newly issued derivation and return its generation
    pub fn begin_derivation(&mut self) -> u64 {
        self.issued_generation += 1;
        self.issued_generation
    }

    /// Store `password` if `generation` is still the latest issued
    pub fn accept(&mut self, generation: u64, password: String) -> bool {
        if generation != self.issued_generation {
            return false;
        }
        self.derived_password = password;
        true
    }
}
