use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};

const PROVIDER_NAME: &str = "claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    http_client: reqwest::Client,
}

impl ClaudeClient {
    /// `request_timeout` bounds the underlying HTTP call and thereby any
    /// worker the resilience client abandons on deadline expiry.
    pub fn new(base_url: String, api_key: String, model: String, request_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            api_key,
            model,
            http_client,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ClaudeClient {
    async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let request_body = build_messages_request_body(&self.model, prompt, options);

        log::debug!("claude request to {} (model: {})", url, self.model);
        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, error_text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        unified_response_from_messages(&json, &self.model)
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn build_messages_request_body(model: &str, prompt: &str, options: &CallOptions) -> Value {
    let mut body = json!({
        "model": model,
        "max_tokens": options.max_tokens,
        "messages": [{ "role": "user", "content": prompt }],
    });
    for (key, value) in &options.extra {
        body[key] = value.clone();
    }
    body
}

fn unified_response_from_messages(
    json: &Value,
    model: &str,
) -> Result<UnifiedResponse, ProviderError> {
    let text = json
        .pointer("/content/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            ProviderError::Parse("no text block in Anthropic response".to_string())
        })?;

    let input_tokens = json.pointer("/usage/input_tokens").and_then(|v| v.as_u64());
    let output_tokens = json.pointer("/usage/output_tokens").and_then(|v| v.as_u64());
    let tokens_used = match (input_tokens, output_tokens) {
        (None, None) => None,
        (i, o) => Some((i.unwrap_or(0) + o.unwrap_or(0)) as u32),
    };

    let mut metadata = std::collections::HashMap::new();
    if let Some(stop_reason) = json.get("stop_reason") {
        metadata.insert("stop_reason".to_string(), stop_reason.clone());
    }

    Ok(UnifiedResponse {
        text: text.to_string(),
        model: model.to_string(),
        provider_name: PROVIDER_NAME.to_string(),
        tokens_used,
        metadata,
    })
}
