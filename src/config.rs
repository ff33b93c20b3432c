use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::cons::provider_cons::LLMProvider;

pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_SECONDS: f64 = 0.5;
pub const DEFAULT_MAX_BACKOFF_SECONDS: f64 = 10.0;

/// Error kinds retried when `LLM_RETRYABLE_ERRORS` is not set. Timeouts are
/// always retryable and never need to appear here.
pub const DEFAULT_RETRYABLE_ERRORS: [&str; 3] =
    ["ConnectionError", "RateLimitError", "ServerError"];

/// Retry/backoff/timeout policy for one provider's resilience client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub provider_name: String,
    pub model_name: String,
    pub timeout_seconds: f64,
    pub max_retries: u32,
    pub backoff_base_seconds: f64,
    pub max_backoff_seconds: f64,
    pub jitter_enabled: bool,
    pub retryable_errors: HashSet<String>,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            provider_name: String::new(),
            model_name: String::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_seconds: DEFAULT_BACKOFF_BASE_SECONDS,
            max_backoff_seconds: DEFAULT_MAX_BACKOFF_SECONDS,
            jitter_enabled: true,
            retryable_errors: default_retryable_errors(),
        }
    }
}

pub fn default_retryable_errors() -> HashSet<String> {
    DEFAULT_RETRYABLE_ERRORS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Process-level settings for the provider manager: preferred provider,
/// model override, credential env override and the shared retry policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSettings {
    pub preferred_provider: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub resilience: ResilienceConfig,
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment access goes through `lookup` so tests can feed values
    /// without mutating process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let timeout_seconds = parse_or(lookup("LLM_TIMEOUT_SECONDS"), DEFAULT_TIMEOUT_SECONDS);
        let backoff_base =
            parse_or(lookup("LLM_BACKOFF_BASE_SECONDS"), DEFAULT_BACKOFF_BASE_SECONDS);
        let max_backoff =
            parse_or(lookup("LLM_MAX_BACKOFF_SECONDS"), DEFAULT_MAX_BACKOFF_SECONDS);

        let resilience = ResilienceConfig {
            provider_name: String::new(),
            model_name: String::new(),
            // A non-positive deadline would make every attempt fail before it
            // starts, so it falls back to the default.
            timeout_seconds: if timeout_seconds > 0.0 {
                timeout_seconds
            } else {
                DEFAULT_TIMEOUT_SECONDS
            },
            max_retries: parse_or(lookup("LLM_MAX_RETRIES"), DEFAULT_MAX_RETRIES),
            backoff_base_seconds: backoff_base.max(0.0),
            max_backoff_seconds: max_backoff.max(0.0),
            jitter_enabled: parse_bool_or(lookup("LLM_JITTER"), true),
            retryable_errors: lookup("LLM_RETRYABLE_ERRORS")
                .map(|raw| parse_retryable_errors(&raw))
                .unwrap_or_else(default_retryable_errors),
        };

        Self {
            preferred_provider: non_empty(lookup("LLM_PROVIDER")),
            model: non_empty(lookup("LLM_MODEL")),
            api_key_env: non_empty(lookup("LLM_API_KEY_ENV")),
            resilience,
        }
    }

    /// The shared policy specialized for one provider: the provider's name and
    /// the resolved model name filled in.
    pub fn resilience_for(&self, provider: LLMProvider) -> ResilienceConfig {
        let mut config = self.resilience.clone();
        config.provider_name = provider.provider_name().to_string();
        config.model_name = self
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        config
    }
}

pub fn parse_retryable_errors(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_bool_or(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        Some(v) if ["1", "true", "yes", "on"].contains(&v.as_str()) => true,
        Some(v) if ["0", "false", "no", "off"].contains(&v.as_str()) => false,
        _ => default,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
