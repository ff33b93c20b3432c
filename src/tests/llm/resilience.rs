use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::CallOptions;
use crate::llm::resilience::{backoff_delay, ResilienceClient};
use crate::llm::telemetry::SinkHandle;
use crate::tests::llm::support::{capture_sink, test_config, ScriptedAdapter};

fn connection_error() -> ProviderError {
    ProviderError::Connection("connection reset".to_string())
}

fn auth_error() -> ProviderError {
    ProviderError::Auth {
        status: 401,
        message: "bad key".to_string(),
    }
}

#[tokio::test]
async fn retryable_failures_consume_the_full_attempt_budget() {
    let adapter = ScriptedAdapter::new("mock").then_fail_times(3, connection_error);
    let calls = adapter.call_counter();
    let (sink, events) = capture_sink();
    let handle = SinkHandle::default();
    handle.set(sink);

    let client = ResilienceClient::new(adapter, test_config("mock", 2), handle);
    let err = client
        .call("p", &CallOptions::default())
        .await
        .expect_err("should exhaust retries");

    assert_eq!(err.kind_name(), "ConnectionError");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let events = events.lock().expect("events");
    assert_eq!(events.len(), 1);
    assert!(!events[0].success);
    assert_eq!(events[0].attempts, 3);
    assert!(events[0]
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("connection reset")));
}

#[tokio::test]
async fn success_on_a_later_attempt_reports_attempt_count() {
    let adapter = ScriptedAdapter::new("mock")
        .then_fail(connection_error())
        .then_ok("patched");
    let calls = adapter.call_counter();
    let (sink, events) = capture_sink();
    let handle = SinkHandle::default();
    handle.set(sink);

    let client = ResilienceClient::new(adapter, test_config("mock", 3), handle);
    let response = client
        .call("p", &CallOptions::default())
        .await
        .expect("should recover");

    assert_eq!(response.text, "patched");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let events = events.lock().expect("events");
    assert_eq!(events.len(), 1);
    assert!(events[0].success);
    assert_eq!(events[0].attempts, 2);
    assert!(events[0].duration_seconds.is_some());
}

#[tokio::test]
async fn fatal_error_propagates_without_consuming_budget() {
    let adapter = ScriptedAdapter::new("mock").then_fail(auth_error());
    let calls = adapter.call_counter();
    let (sink, events) = capture_sink();
    let handle = SinkHandle::default();
    handle.set(sink);

    let client = ResilienceClient::new(adapter, test_config("mock", 5), handle);
    let err = client
        .call("p", &CallOptions::default())
        .await
        .expect_err("should fail fast");

    assert_eq!(err.kind_name(), "AuthError");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let events = events.lock().expect("events");
    assert_eq!(events[0].attempts, 1);
    assert!(!events[0].success);
}

#[tokio::test]
async fn transient_errors_then_success_uses_three_attempts() {
    // maxRetries=2, backoffBase=0, timeoutSeconds=1, two transient failures
    let adapter = ScriptedAdapter::new("mock")
        .then_fail(connection_error())
        .then_fail(connection_error())
        .then_ok("ok");
    let calls = adapter.call_counter();
    let (sink, events) = capture_sink();
    let handle = SinkHandle::default();
    handle.set(sink);

    let mut config = test_config("mock", 2);
    config.timeout_seconds = 1.0;

    let client = ResilienceClient::new(adapter, config, handle);
    let response = client
        .call("p", &CallOptions::default())
        .await
        .expect("should succeed on third attempt");

    assert_eq!(response.text, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let events = events.lock().expect("events");
    assert!(events[0].success);
    assert_eq!(events[0].attempts, 3);
}

#[tokio::test]
async fn slow_adapter_times_out_and_retries() {
    // 200ms adapter against a 50ms deadline: both attempts time out
    let adapter = ScriptedAdapter::new("mock")
        .with_delay(Duration::from_millis(200))
        .then_ok("too late")
        .then_ok("too late");
    let calls = adapter.call_counter();
    let (sink, events) = capture_sink();
    let handle = SinkHandle::default();
    handle.set(sink);

    let mut config = test_config("mock", 1);
    config.timeout_seconds = 0.05;

    let client = ResilienceClient::new(adapter, config, handle);
    let err = client
        .call("p", &CallOptions::default())
        .await
        .expect_err("should time out");

    assert_eq!(err.kind_name(), "TimeoutError");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let events = events.lock().expect("events");
    assert_eq!(events[0].attempts, 2);
    assert!(!events[0].success);
}

#[tokio::test]
async fn timeouts_are_retryable_even_with_an_empty_retry_set() {
    let adapter = ScriptedAdapter::new("mock")
        .with_delay(Duration::from_millis(200))
        .then_ok("too late")
        .then_ok("too late");
    let calls = adapter.call_counter();

    let mut config = test_config("mock", 1);
    config.timeout_seconds = 0.05;
    config.retryable_errors.clear();

    let client = ResilienceClient::new(adapter, config, SinkHandle::default());
    let err = client
        .call("p", &CallOptions::default())
        .await
        .expect_err("should time out");

    assert_eq!(err.kind_name(), "TimeoutError");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn panicking_sink_does_not_change_call_outcome() {
    let adapter = ScriptedAdapter::new("mock").then_ok("fine");
    let handle = SinkHandle::default();
    handle.set(Arc::new(|_event: &crate::llm::telemetry::TelemetryEvent| {
        panic!("sink exploded")
    }));

    let client = ResilienceClient::new(adapter, test_config("mock", 0), handle);
    let response = client
        .call("p", &CallOptions::default())
        .await
        .expect("sink panic must not surface");
    assert_eq!(response.text, "fine");
}

#[test]
fn backoff_delays_double_and_stay_under_the_cap() {
    let config = test_config_with_backoff(0.5, 10.0, false);
    let expected = [0.5, 1.0, 2.0, 4.0, 8.0, 10.0, 10.0];
    let mut previous = 0.0f64;
    for (attempt, want) in expected.iter().enumerate() {
        let delay = backoff_delay(&config, attempt as u32).as_secs_f64();
        assert!((delay - want).abs() < 1e-9, "attempt {}: {}", attempt, delay);
        assert!(delay >= previous);
        assert!(delay <= config.max_backoff_seconds);
        previous = delay;
    }
}

#[test]
fn jittered_backoff_stays_within_one_base_of_the_exponential() {
    let config = test_config_with_backoff(1.0, 100.0, true);
    for attempt in 0..5u32 {
        let exact = 2f64.powi(attempt as i32);
        let delay = backoff_delay(&config, attempt).as_secs_f64();
        assert!(delay >= exact, "attempt {}: {}", attempt, delay);
        assert!(delay < exact + 1.0, "attempt {}: {}", attempt, delay);
    }
}

#[test]
fn zero_base_backoff_never_sleeps() {
    let config = test_config_with_backoff(0.0, 10.0, true);
    for attempt in 0..4u32 {
        assert_eq!(backoff_delay(&config, attempt), Duration::ZERO);
    }
}

fn test_config_with_backoff(
    base: f64,
    max: f64,
    jitter: bool,
) -> crate::config::ResilienceConfig {
    let mut config = test_config("mock", 3);
    config.backoff_base_seconds = base;
    config.max_backoff_seconds = max;
    config.jitter_enabled = jitter;
    config
}
