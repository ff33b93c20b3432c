use lazy_static::lazy_static;

use crate::config::{LlmSettings, ResilienceConfig};
use crate::cons::provider_cons::LLMProvider;
use crate::llm::error::{ManagerError, ProviderError};
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};
use crate::llm::models::provider_handle::{create_client, AnyProviderClient};
use crate::llm::resilience::ResilienceClient;
use crate::llm::telemetry::{SinkHandle, TelemetrySink};

/// Owns one resilience-wrapped adapter per available backend and falls back
/// across them in registration order. Calls are strictly sequential; no two
/// candidates ever run concurrently.
pub struct ProviderManager<A: ProviderAdapter + 'static = AnyProviderClient> {
    preferred: String,
    clients: Vec<ResilienceClient<A>>,
    sink: SinkHandle,
}

impl ProviderManager<AnyProviderClient> {
    /// Probes every known provider kind in fixed order and registers the
    /// available ones. An empty registry is not an error here; `generate`
    /// reports it per call.
    pub fn from_env() -> Self {
        let settings = LlmSettings::from_env();
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        let preferred = settings
            .preferred_provider
            .as_deref()
            .and_then(LLMProvider::from_name)
            .unwrap_or(LLMProvider::Claude);

        let mut entries = Vec::new();
        for provider in LLMProvider::ALL {
            let config = settings.resilience_for(provider);
            let adapter = create_client(provider, settings, &config);
            if !adapter.is_available() {
                log::info!("provider {} has no credential, skipping registration", provider);
                continue;
            }
            entries.push((adapter, config));
        }

        let manager = Self::new(preferred.provider_name(), entries);
        log::info!(
            "provider manager ready: preferred={}, registered={:?}",
            manager.preferred,
            manager.list_available_providers()
        );
        manager
    }
}

impl<A: ProviderAdapter + 'static> ProviderManager<A> {
    /// Wraps each adapter in its own resilience client sharing one telemetry
    /// sink handle. Registration order is the iteration order of `entries`.
    pub fn new(preferred: &str, entries: Vec<(A, ResilienceConfig)>) -> Self {
        let sink = SinkHandle::default();
        let clients = entries
            .into_iter()
            .map(|(adapter, config)| ResilienceClient::new(adapter, config, sink.clone()))
            .collect();
        Self {
            preferred: preferred.to_string(),
            clients,
            sink,
        }
    }

    pub fn set_telemetry_sink(&self, sink: TelemetrySink) {
        self.sink.set(sink);
    }

    /// Registration-ordered names of the providers currently usable.
    pub fn list_available_providers(&self) -> Vec<String> {
        self.clients
            .iter()
            .map(|c| c.provider_name().to_string())
            .collect()
    }

    pub fn is_any_available(&self) -> bool {
        !self.clients.is_empty()
    }

    /// Resolves the target provider, runs its full retry budget, and on
    /// failure falls back across the remaining registered providers in
    /// registration order (each with its own full budget).
    pub async fn generate(
        &self,
        prompt: &str,
        provider_override: Option<&str>,
        fallback_enabled: bool,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ManagerError> {
        if self.clients.is_empty() {
            return Err(ManagerError::NoProviders);
        }

        let target = provider_override.unwrap_or(&self.preferred);
        let mut failures: Vec<(String, ProviderError)> = Vec::new();

        match self.find_client(target) {
            Some(client) => match client.call(prompt, options).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if !fallback_enabled {
                        return Err(ManagerError::Provider(err));
                    }
                    log::warn!("provider {} exhausted, falling back: {}", target, err);
                    failures.push((client.provider_name().to_string(), err));
                }
            },
            None => {
                if !fallback_enabled {
                    return Err(ManagerError::Provider(ProviderError::Unavailable(format!(
                        "provider not registered: {}",
                        target
                    ))));
                }
                log::warn!("requested provider {} is not registered, trying fallbacks", target);
            }
        }

        for client in &self.clients {
            if client.provider_name().eq_ignore_ascii_case(target) {
                continue;
            }
            match client.call(prompt, options).await {
                Ok(response) => {
                    log::info!("fallback provider {} succeeded", client.provider_name());
                    return Ok(response);
                }
                Err(err) => {
                    log::warn!("fallback provider {} failed: {}", client.provider_name(), err);
                    failures.push((client.provider_name().to_string(), err));
                }
            }
        }

        Err(ManagerError::AllProvidersFailed { failures })
    }

    fn find_client(&self, name: &str) -> Option<&ResilienceClient<A>> {
        self.clients
            .iter()
            .find(|c| c.provider_name().eq_ignore_ascii_case(name))
    }
}

lazy_static! {
    static ref SHARED_MANAGER: ProviderManager = ProviderManager::from_env();
}

/// Memoized process-wide manager. Prefer constructing a `ProviderManager` and
/// passing it in; this exists for call sites that want the shared instance.
pub fn shared_manager() -> &'static ProviderManager {
    &SHARED_MANAGER
}
