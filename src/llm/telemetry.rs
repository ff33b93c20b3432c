use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use crate::config::ResilienceConfig;
use crate::llm::error::ProviderError;

/// Outcome record for one top-level resilience-client call. Forwarded to the
/// metrics subsystem, never retained here.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub event: &'static str,
    pub success: bool,
    pub attempts: u32,
    pub duration_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub provider_name: String,
    pub model_name: String,
}

impl TelemetryEvent {
    pub(crate) fn success(config: &ResilienceConfig, attempts: u32, duration_seconds: f64) -> Self {
        Self {
            event: "llm_call",
            success: true,
            attempts,
            duration_seconds: Some(duration_seconds),
            error_message: None,
            provider_name: config.provider_name.clone(),
            model_name: config.model_name.clone(),
        }
    }

    pub(crate) fn failure(config: &ResilienceConfig, attempts: u32, error: &ProviderError) -> Self {
        Self {
            event: "llm_call",
            success: false,
            attempts,
            duration_seconds: None,
            error_message: Some(error.to_string()),
            provider_name: config.provider_name.clone(),
            model_name: config.model_name.clone(),
        }
    }
}

pub type TelemetrySink = Arc<dyn Fn(&TelemetryEvent) + Send + Sync>;

/// Shared handle to the installed sink. One handle is cloned into every
/// resilience client so `set_telemetry_sink` on the manager reaches all of
/// them.
#[derive(Clone, Default)]
pub struct SinkHandle {
    inner: Arc<Mutex<Option<TelemetrySink>>>,
}

impl SinkHandle {
    pub fn set(&self, sink: TelemetrySink) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(sink);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
    }

    /// Synchronous, best-effort dispatch. A panicking sink must never change
    /// the outcome of the call that produced the event.
    pub(crate) fn emit(&self, event: &TelemetryEvent) {
        let Ok(guard) = self.inner.lock() else {
            log::warn!("telemetry sink lock poisoned; dropping event");
            return;
        };
        if let Some(sink) = guard.as_ref() {
            if catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
                log::warn!(
                    "telemetry sink panicked; dropping event for provider {}",
                    event.provider_name
                );
            }
        }
    }
}
