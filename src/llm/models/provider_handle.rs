use async_trait::async_trait;
use std::time::Duration;

use crate::config::{LlmSettings, ResilienceConfig};
use crate::cons::provider_cons::LLMProvider;
use crate::llm::error::ProviderError;

use super::claude::ClaudeClient;
use super::gemini::GeminiClient;
use super::openai::OpenAiClient;
pub use super::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};

/// Grace added to each adapter's HTTP timeout beyond the per-attempt deadline,
/// so abandoned workers cannot outlive the deadline by more than this.
const REQUEST_TIMEOUT_GRACE_SECONDS: f64 = 5.0;

pub enum AnyProviderClient {
    Claude(ClaudeClient),
    OpenAI(OpenAiClient),
    Gemini(GeminiClient),
}

#[async_trait]
impl ProviderAdapter for AnyProviderClient {
    async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        match self {
            AnyProviderClient::Claude(c) => c.call(prompt, options).await,
            AnyProviderClient::OpenAI(c) => c.call(prompt, options).await,
            AnyProviderClient::Gemini(c) => c.call(prompt, options).await,
        }
    }

    fn is_available(&self) -> bool {
        match self {
            AnyProviderClient::Claude(c) => c.is_available(),
            AnyProviderClient::OpenAI(c) => c.is_available(),
            AnyProviderClient::Gemini(c) => c.is_available(),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            AnyProviderClient::Claude(c) => c.provider_name(),
            AnyProviderClient::OpenAI(c) => c.provider_name(),
            AnyProviderClient::Gemini(c) => c.provider_name(),
        }
    }
}

/// Builds the concrete adapter for one provider kind. The credential is read
/// here, once; a missing credential yields an adapter whose `is_available()`
/// is false, which the manager skips at registration.
pub fn create_client(
    provider: LLMProvider,
    settings: &LlmSettings,
    config: &ResilienceConfig,
) -> AnyProviderClient {
    let api_key = resolve_api_key(provider, settings).unwrap_or_default();
    let base_url = provider.default_base_url().to_string();
    let model = config.model_name.clone();
    let request_timeout =
        Duration::from_secs_f64(config.timeout_seconds + REQUEST_TIMEOUT_GRACE_SECONDS);

    match provider {
        LLMProvider::Claude => {
            AnyProviderClient::Claude(ClaudeClient::new(base_url, api_key, model, request_timeout))
        }
        LLMProvider::OpenAI => {
            AnyProviderClient::OpenAI(OpenAiClient::new(base_url, api_key, model, request_timeout))
        }
        LLMProvider::Gemini => {
            AnyProviderClient::Gemini(GeminiClient::new(base_url, api_key, model, request_timeout))
        }
    }
}

/// Capability probe: configured credential env override first, then the
/// provider's default variable. Never a network call.
fn resolve_api_key(provider: LLMProvider, settings: &LlmSettings) -> Option<String> {
    if let Some(env_name) = &settings.api_key_env {
        if let Ok(key) = std::env::var(env_name) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
    }
    std::env::var(provider.api_key_env())
        .ok()
        .filter(|k| !k.trim().is_empty())
}
