use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{default_retryable_errors, ResilienceConfig};
use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};
use crate::llm::telemetry::{TelemetryEvent, TelemetrySink};

pub enum Outcome {
    Succeed(&'static str),
    Fail(ProviderError),
}

/// Adapter whose outcomes are scripted up front. Counts calls through a
/// shareable handle so tests can assert after moving the adapter into a
/// client or manager.
pub struct ScriptedAdapter {
    name: &'static str,
    script: Mutex<VecDeque<Outcome>>,
    calls: Arc<AtomicU32>,
    delay: Option<Duration>,
}

impl ScriptedAdapter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(VecDeque::new()),
            calls: Arc::new(AtomicU32::new(0)),
            delay: None,
        }
    }

    pub fn then_ok(self, text: &'static str) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Outcome::Succeed(text));
        self
    }

    pub fn then_fail(self, err: ProviderError) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .push_back(Outcome::Fail(err));
        self
    }

    pub fn then_fail_times(mut self, n: u32, make: impl Fn() -> ProviderError) -> Self {
        for _ in 0..n {
            self = self.then_fail(make());
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    async fn call(
        &self,
        _prompt: &str,
        _options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.script.lock().expect("script lock").pop_front();
        match outcome {
            Some(Outcome::Succeed(text)) => Ok(UnifiedResponse {
                text: text.to_string(),
                model: "test-model".to_string(),
                provider_name: self.name.to_string(),
                tokens_used: Some(7),
                metadata: Default::default(),
            }),
            Some(Outcome::Fail(err)) => Err(err),
            None => Err(ProviderError::Internal("script exhausted".to_string())),
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

pub fn test_config(name: &str, max_retries: u32) -> ResilienceConfig {
    ResilienceConfig {
        provider_name: name.to_string(),
        model_name: "test-model".to_string(),
        timeout_seconds: 5.0,
        max_retries,
        backoff_base_seconds: 0.0,
        max_backoff_seconds: 10.0,
        jitter_enabled: false,
        retryable_errors: default_retryable_errors(),
    }
}

/// Sink that records every event into a shared vec for assertions.
pub fn capture_sink() -> (TelemetrySink, Arc<Mutex<Vec<TelemetryEvent>>>) {
    let events: Arc<Mutex<Vec<TelemetryEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let sink: TelemetrySink = Arc::new(move |event: &TelemetryEvent| {
        recorded.lock().expect("events lock").push(event.clone());
    });
    (sink, events)
}
