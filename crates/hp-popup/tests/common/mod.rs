//! Mock collaborators shared by the popup integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hp_core::config::PopupConfig;
use hp_core::error::CollaboratorError;
use hp_core::traits::{Autofill, Clipboard, Deriver, PinEntry, PinPrompt, PopupWindow};
use hp_core::types::CardPin;
use hp_popup::{Collaborators, PopupController};
use hp_smartcard::mock::MockSmartCard;

/// Ordered record of side effects across collaborators
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Deriver that records calls and answers after a per-domain latency
#[derive(Default)]
pub struct MockDeriver {
    calls: Mutex<Vec<(String, String)>>,
    latencies: Mutex<HashMap<String, Duration>>,
    outputs: Mutex<HashMap<(String, String), String>>,
    failing: Mutex<Vec<String>>,
}

impl MockDeriver {
    pub fn expected(domain: &str, universal_password: &str) -> String {
        format!("derived({},{})", domain, universal_password)
    }

    pub fn set_latency(&self, domain: &str, latency: Duration) {
        self.latencies.lock().unwrap().insert(domain.into(), latency);
    }

    pub fn set_output(&self, domain: &str, universal_password: &str, output: &str) {
        self.outputs
            .lock()
            .unwrap()
            .insert((domain.into(), universal_password.into()), output.into());
    }

    pub fn fail_for(&self, domain: &str) {
        self.failing.lock().unwrap().push(domain.into());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Deriver for MockDeriver {
    async fn derive(
        &self,
        domain: &str,
        universal_password: &str,
    ) -> Result<String, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((domain.into(), universal_password.into()));

        let latency = self.latencies.lock().unwrap().get(domain).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().iter().any(|d| d == domain) {
            return Err(CollaboratorError::new("worker crashed"));
        }

        let key = (domain.to_string(), universal_password.to_string());
        Ok(self
            .outputs
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Self::expected(domain, universal_password)))
    }
}

pub struct MockClipboard {
    log: EventLog,
    writes: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockClipboard {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Clipboard for MockClipboard {
    async fn write_text(&self, text: &str) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("clipboard permission denied"));
        }
        self.writes.lock().unwrap().push(text.into());
        self.log.push(format!("copy:{}", text));
        Ok(())
    }
}

pub struct MockAutofill {
    log: EventLog,
    fills: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockAutofill {
    pub fn fills(&self) -> Vec<String> {
        self.fills.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Autofill for MockAutofill {
    async fn fill_in(&self, password: &str) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("no password field"));
        }
        self.fills.lock().unwrap().push(password.into());
        self.log.push(format!("fill:{}", password));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockWindow {
    closes: AtomicUsize,
}

impl MockWindow {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl PopupWindow for MockWindow {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// PIN prompt that answers with a scripted entry
pub struct ScriptedPrompt {
    pin: Option<String>,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    pub fn entering(pin: &str) -> Self {
        Self {
            pin: Some(pin.into()),
            asked: AtomicUsize::new(0),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            pin: None,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PinPrompt for ScriptedPrompt {
    async fn prompt_pin(&self) -> PinEntry {
        self.asked.fetch_add(1, Ordering::SeqCst);
        match &self.pin {
            Some(pin) => PinEntry::Entered(CardPin::new(pin.clone()).unwrap()),
            None => PinEntry::Cancelled,
        }
    }
}

pub struct Harness {
    pub popup: PopupController,
    pub deriver: Arc<MockDeriver>,
    pub clipboard: Arc<MockClipboard>,
    pub autofill: Arc<MockAutofill>,
    pub window: Arc<MockWindow>,
    pub card: MockSmartCard,
    pub log: EventLog,
}

pub const CARD_SECRET: &str = "card-seed";
pub const CARD_PIN: &str = "1234";

impl Harness {
    pub fn open(initial_domain: Option<&str>) -> Self {
        Self::open_with_card(
            initial_domain,
            MockSmartCard::with_secret(CARD_SECRET, CARD_PIN),
        )
    }

    pub fn open_with_card(initial_domain: Option<&str>, card: MockSmartCard) -> Self {
        let log = EventLog::default();
        let deriver = Arc::new(MockDeriver::default());
        let clipboard = Arc::new(MockClipboard {
            log: log.clone(),
            writes: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        });
        let autofill = Arc::new(MockAutofill {
            log: log.clone(),
            fills: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        });
        let window = Arc::new(MockWindow::default());

        let popup = PopupController::new(
            PopupConfig::default(),
            Collaborators {
                deriver: deriver.clone(),
                autofill: autofill.clone(),
                clipboard: clipboard.clone(),
                window: window.clone(),
                smart_card: Arc::new(card.clone()),
            },
            initial_domain.map(String::from),
            true,
        );

        Self {
            popup,
            deriver,
            clipboard,
            autofill,
            window,
            card,
            log,
        }
    }
}

pub fn pin(value: &str) -> CardPin {
    CardPin::new(value).unwrap()
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
