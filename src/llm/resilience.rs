use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ResilienceConfig;
use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};
use crate::llm::telemetry::{SinkHandle, TelemetryEvent};

/// Wraps one adapter with timeout enforcement, classified retries and
/// exponential backoff. Attempts are strictly sequential; exactly one
/// telemetry event is emitted per top-level `call`.
pub struct ResilienceClient<A: ProviderAdapter + 'static> {
    adapter: Arc<A>,
    config: ResilienceConfig,
    sink: SinkHandle,
}

impl<A: ProviderAdapter + 'static> ResilienceClient<A> {
    pub fn new(adapter: A, config: ResilienceConfig, sink: SinkHandle) -> Self {
        Self {
            adapter: Arc::new(adapter),
            config,
            sink,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.adapter.provider_name()
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = backoff_delay(&self.config, attempt - 1);
                log::debug!(
                    "provider {} attempt {}/{} after {:.3}s backoff",
                    self.config.provider_name,
                    attempt + 1,
                    max_attempts,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            let started = Instant::now();
            match self.run_attempt(prompt, options).await {
                Ok(response) => {
                    let attempts = attempt + 1;
                    log::info!(
                        "provider {} call succeeded on attempt {}/{}",
                        self.config.provider_name,
                        attempts,
                        max_attempts
                    );
                    self.sink.emit(&TelemetryEvent::success(
                        &self.config,
                        attempts,
                        started.elapsed().as_secs_f64(),
                    ));
                    return Ok(response);
                }
                Err(err) => {
                    let attempts = attempt + 1;
                    let retryable = is_retryable(&err, &self.config);
                    if !retryable || attempts == max_attempts {
                        log::error!(
                            "provider {} call failed after {} attempt(s): {}",
                            self.config.provider_name,
                            attempts,
                            err
                        );
                        self.sink
                            .emit(&TelemetryEvent::failure(&self.config, attempts, &err));
                        return Err(err);
                    }
                    log::warn!(
                        "provider {} attempt {}/{} failed with retryable {}: {}",
                        self.config.provider_name,
                        attempts,
                        max_attempts,
                        err.kind_name(),
                        err
                    );
                    attempt += 1;
                }
            }
        }
    }

    /// One attempt on an isolated worker task, bounded by the configured
    /// deadline. On expiry the worker is abandoned, not interrupted; its
    /// lifetime is capped by the adapter's own HTTP client timeout.
    async fn run_attempt(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        let adapter = Arc::clone(&self.adapter);
        let prompt = prompt.to_string();
        let options = options.clone();
        let worker = tokio::spawn(async move { adapter.call(&prompt, &options).await });

        let deadline = Duration::from_secs_f64(self.config.timeout_seconds.max(0.001));
        match tokio::time::timeout(deadline, worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ProviderError::Internal(format!(
                "adapter worker failed: {}",
                join_err
            ))),
            Err(_) => Err(ProviderError::Timeout),
        }
    }
}

/// Timeouts are unconditionally retryable; everything else only when its kind
/// name is in the configured set.
pub(crate) fn is_retryable(err: &ProviderError, config: &ResilienceConfig) -> bool {
    matches!(err, ProviderError::Timeout) || config.retryable_errors.contains(err.kind_name())
}

/// Delay slept after failed attempt `failed_attempt` (0-indexed):
/// `min(base * 2^n + jitter, max_backoff)` with `jitter` uniform in
/// `[0, base)` when enabled. No delay precedes the first attempt.
pub(crate) fn backoff_delay(config: &ResilienceConfig, failed_attempt: u32) -> Duration {
    let base = config.backoff_base_seconds;
    let exp = 2f64.powi(failed_attempt.min(62) as i32);
    let jitter = if config.jitter_enabled && base > 0.0 {
        rand::thread_rng().gen_range(0.0..base)
    } else {
        0.0
    };
    let delay = (base * exp + jitter).min(config.max_backoff_seconds);
    Duration::from_secs_f64(delay.max(0.0))
}
