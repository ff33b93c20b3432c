use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::llm::error::ProviderError;

/// One successful generation. Only ever constructed from a successful adapter
/// call; failures are raised as `ProviderError`, never encoded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub text: String,
    pub model: String,
    pub provider_name: String,
    pub tokens_used: Option<u32>,
    pub metadata: HashMap<String, Value>,
}

/// Per-call knobs forwarded to the adapter. `extra` entries are merged into
/// the provider request body as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOptions {
    pub max_tokens: u32,
    pub extra: HashMap<String, Value>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            extra: HashMap::new(),
        }
    }
}

/// Uniform contract over one external text-generation backend.
///
/// `call` performs exactly one request; all retry policy lives in the
/// resilience client. `is_available` is a cheap credential/construction probe
/// and must never touch the network.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn call(&self, prompt: &str, options: &CallOptions)
        -> Result<UnifiedResponse, ProviderError>;

    fn is_available(&self) -> bool;

    fn provider_name(&self) -> &'static str;
}
