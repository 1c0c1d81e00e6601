//! Copy and fill-in tests
//!
//! Both actions must wait for the in-flight count to reach zero and act
//! on the value derived from the latest edit.

mod common;

use std::time::Duration;

use common::{sleep_ms, Harness, MockDeriver};

#[tokio::test(start_paused = true)]
async fn test_copy_waits_for_flushed_derivation() {
    let h = Harness::open(None);
    h.deriver.set_latency("example.com", Duration::from_millis(300));

    h.popup.set_domain("example.com");
    h.popup.set_universal_password("seed");
    // Flushes the armed edit: the derivation starts now, not in 200ms.
    h.popup.request_copy();
    assert_eq!(h.popup.in_flight(), 1);

    sleep_ms(299).await;
    assert!(h.clipboard.writes().is_empty());
    assert!(h.popup.snapshot().is_updating);

    sleep_ms(2).await;
    assert_eq!(
        h.clipboard.writes(),
        vec![MockDeriver::expected("example.com", "seed")]
    );
    assert!(h.popup.snapshot().copied);
    assert_eq!(h.deriver.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_copy_when_idle_is_immediate() {
    let h = Harness::open(Some("example.com"));
    h.popup.set_universal_password("seed");
    sleep_ms(250).await;

    h.popup.request_copy();
    sleep_ms(1).await;

    assert_eq!(
        h.clipboard.writes(),
        vec![MockDeriver::expected("example.com", "seed")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_copied_indicator_clears_after_fixed_duration() {
    let h = Harness::open(Some("example.com"));
    sleep_ms(250).await;

    h.popup.request_copy();
    sleep_ms(1).await;
    assert!(h.popup.snapshot().copied);

    sleep_ms(998).await;
    assert!(h.popup.snapshot().copied);

    sleep_ms(2).await;
    assert!(!h.popup.snapshot().copied);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_copy_restarts_single_clear_timer() {
    let h = Harness::open(Some("example.com"));
    sleep_ms(250).await;

    h.popup.request_copy();
    sleep_ms(600).await;
    h.popup.request_copy();

    // The first copy's timer would have cleared the indicator by now.
    sleep_ms(500).await;
    assert!(h.popup.snapshot().copied);

    sleep_ms(501).await;
    assert!(!h.popup.snapshot().copied);
    assert_eq!(h.clipboard.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_copy_failure_shows_no_indicator() {
    let h = Harness::open(Some("example.com"));
    h.clipboard.set_failing(true);
    sleep_ms(250).await;

    h.popup.request_copy();
    sleep_ms(10).await;

    assert!(h.clipboard.writes().is_empty());
    assert!(!h.popup.snapshot().copied);
}

#[tokio::test(start_paused = true)]
async fn test_pending_copy_fires_once() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_latency("example.com", Duration::from_millis(300));

    h.popup.request_copy();
    sleep_ms(100).await;
    h.popup.request_copy();

    sleep_ms(500).await;
    assert_eq!(h.clipboard.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_uses_settled_value_then_closes() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_latency("example.com", Duration::from_millis(300));
    sleep_ms(250).await;
    assert!(h.popup.snapshot().is_updating);

    h.popup.set_universal_password("seed");
    h.popup.request_submit();

    // The first derivation settles at 500ms, the flushed one at 550ms.
    sleep_ms(260).await;
    assert!(h.autofill.fills().is_empty());

    sleep_ms(50).await;
    assert_eq!(
        h.autofill.fills(),
        vec![MockDeriver::expected("example.com", "seed")]
    );
    assert_eq!(h.window.close_count(), 1);
    assert!(h.popup.snapshot().closed);
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_keeps_popup_open() {
    let h = Harness::open(Some("example.com"));
    h.autofill.set_failing(true);
    h.popup.set_universal_password("seed");

    h.popup.request_submit();
    sleep_ms(10).await;

    assert_eq!(h.window.close_count(), 0);
    let state = h.popup.snapshot();
    assert!(!state.closed);
    assert_eq!(
        state.derived_password,
        MockDeriver::expected("example.com", "seed")
    );
}

#[tokio::test(start_paused = true)]
async fn test_copy_runs_before_fill_in() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_latency("example.com", Duration::from_millis(100));
    h.popup.set_universal_password("seed");

    h.popup.request_submit();
    h.popup.request_copy();
    sleep_ms(150).await;

    let value = MockDeriver::expected("example.com", "seed");
    assert_eq!(
        h.log.events(),
        vec![format!("copy:{}", value), format!("fill:{}", value)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_wait_settled_drains_requested_actions() {
    let h = Harness::open(Some("example.com"));
    h.deriver.set_latency("example.com", Duration::from_millis(300));
    h.popup.set_universal_password("seed");

    h.popup.request_copy();
    h.popup.wait_settled().await;

    assert_eq!(
        h.clipboard.writes(),
        vec![MockDeriver::expected("example.com", "seed")]
    );
    assert_eq!(h.popup.in_flight(), 0);
}
