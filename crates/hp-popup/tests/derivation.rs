//! Derivation scheduling tests
//!
//! Time is paused, so debounce windows and derivation latencies are exact.

mod common;

use std::time::Duration;

use common::{sleep_ms, Harness, MockDeriver};
use hp_core::types::PasswordField;

#[tokio::test(start_paused = true)]
async fn test_single_edit_derives_once() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_output("example.com", "seed", "p4ssw0rd");

    h.popup.set_universal_password("seed");
    sleep_ms(250).await;

    assert_eq!(
        h.deriver.calls(),
        vec![("example.com".to_string(), "seed".to_string())]
    );
    let state = h.popup.snapshot();
    assert_eq!(state.derived_password, "p4ssw0rd");
    assert!(!state.is_updating);
    assert_eq!(h.popup.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_issues_one_derivation_with_last_args() {
    let h = Harness::open(None);

    for (i, partial) in ["e", "ex", "exa", "example.com"].iter().enumerate() {
        h.popup.set_domain(*partial);
        sleep_ms(50 + i as u64 * 10).await;
    }
    h.popup.set_universal_password("s");
    sleep_ms(100).await;
    h.popup.set_universal_password("seed");

    sleep_ms(199).await;
    assert!(h.deriver.calls().is_empty());

    sleep_ms(2).await;
    assert_eq!(
        h.deriver.calls(),
        vec![("example.com".to_string(), "seed".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_popup_open_derives_initial_state() {
    let h = Harness::open(Some("example.com"));

    sleep_ms(250).await;

    assert_eq!(
        h.deriver.calls(),
        vec![("example.com".to_string(), String::new())]
    );
    assert_eq!(
        h.popup.snapshot().derived_password,
        MockDeriver::expected("example.com", "")
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_result_never_overwrites_newer_one() {
    let h = Harness::open(None);
    h.deriver.set_latency("slow.com", Duration::from_millis(500));
    h.deriver.set_latency("fast.com", Duration::from_millis(50));

    // Issued at 200ms, settles at 700ms.
    h.popup.set_domain("slow.com");
    sleep_ms(250).await;
    // Issued at 450ms, settles at 500ms.
    h.popup.set_domain("fast.com");

    sleep_ms(350).await;
    assert_eq!(h.popup.in_flight(), 1);
    assert_eq!(
        h.popup.snapshot().derived_password,
        MockDeriver::expected("fast.com", "")
    );

    sleep_ms(200).await;
    assert_eq!(h.popup.in_flight(), 0);
    assert_eq!(
        h.popup.snapshot().derived_password,
        MockDeriver::expected("fast.com", "")
    );
    assert_eq!(h.deriver.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_derivation_keeps_previous_value() {
    let h = Harness::open(Some("example.com"));
    h.deriver.fail_for("broken.com");

    h.popup.set_universal_password("seed");
    sleep_ms(250).await;
    let before = h.popup.snapshot().derived_password;
    assert_eq!(before, MockDeriver::expected("example.com", "seed"));

    h.popup.set_domain("broken.com");
    sleep_ms(250).await;

    assert_eq!(h.popup.snapshot().derived_password, before);
    assert_eq!(h.popup.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_count_returns_to_zero_with_mixed_outcomes() {
    let h = Harness::open(None);
    h.deriver.set_latency("a.com", Duration::from_millis(400));
    h.deriver.set_latency("b.com", Duration::from_millis(300));
    h.deriver.set_latency("c.com", Duration::from_millis(100));
    h.deriver.fail_for("b.com");

    let mut rx = h.popup.subscribe_in_flight();
    for domain in ["a.com", "b.com", "c.com"] {
        h.popup.set_domain(domain);
        sleep_ms(210).await;
    }
    assert!(h.popup.in_flight() > 1);

    sleep_ms(1000).await;
    assert_eq!(h.popup.in_flight(), 0);
    assert_eq!(*rx.borrow_and_update(), 0);
    assert_eq!(
        h.popup.snapshot().derived_password,
        MockDeriver::expected("c.com", "")
    );
}

#[tokio::test(start_paused = true)]
async fn test_wait_idle_resolves_after_settle() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_latency("example.com", Duration::from_millis(300));

    sleep_ms(201).await;
    assert!(h.popup.snapshot().is_updating);

    h.popup.wait_idle().await;
    assert!(!h.popup.snapshot().is_updating);
    assert_eq!(
        h.popup.snapshot().derived_password,
        MockDeriver::expected("example.com", "")
    );
}

#[tokio::test(start_paused = true)]
async fn test_reset_domain_restores_initial_and_rederives() {
    let h = Harness::open(Some("example.com"));
    assert!(!h.popup.reset_domain());

    h.popup.set_domain("other.org");
    assert!(h.popup.snapshot().can_reset);
    sleep_ms(250).await;

    assert!(h.popup.reset_domain());
    let state = h.popup.snapshot();
    assert_eq!(state.domain.as_deref(), Some("example.com"));
    assert!(!state.can_reset);

    sleep_ms(250).await;
    assert_eq!(
        h.deriver.calls().last(),
        Some(&("example.com".to_string(), String::new()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_initial_domain_supplied_late_is_adopted_once() {
    let h = Harness::open(None);
    assert_eq!(h.popup.snapshot().domain, None);

    assert!(h.popup.provide_initial_domain("example.com"));
    assert!(!h.popup.provide_initial_domain("evil.com"));

    let state = h.popup.snapshot();
    assert_eq!(state.domain.as_deref(), Some("example.com"));
    assert_eq!(state.initial_domain.as_deref(), Some("example.com"));

    sleep_ms(250).await;
    assert_eq!(
        h.deriver.calls(),
        vec![("example.com".to_string(), String::new())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_late_initial_domain_does_not_clobber_typed_domain() {
    let h = Harness::open(None);
    h.popup.set_domain("typed.org");

    assert!(h.popup.provide_initial_domain("example.com"));

    let state = h.popup.snapshot();
    assert_eq!(state.domain.as_deref(), Some("typed.org"));
    assert!(state.can_reset);
}

#[tokio::test(start_paused = true)]
async fn test_visibility_toggles_are_independent() {
    let h = Harness::open(None);
    let state = h.popup.snapshot();
    assert!(state.is_hidden(PasswordField::Universal));
    assert!(state.is_hidden(PasswordField::Derived));

    assert!(!h.popup.toggle_visibility(PasswordField::Universal));

    let state = h.popup.snapshot();
    assert!(!state.is_hidden(PasswordField::Universal));
    assert!(state.is_hidden(PasswordField::Derived));

    sleep_ms(250).await;
    assert_eq!(h.deriver.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_armed_derivation() {
    let h = Harness::open(Some("example.com"));

    h.popup.set_universal_password("seed");
    h.popup.shutdown();
    sleep_ms(500).await;

    assert!(h.deriver.calls().is_empty());
}
