use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};

const PROVIDER_NAME: &str = "openai";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
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
impl ProviderAdapter for OpenAiClient {
    async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let request_body = build_chat_completions_request_body(&self.model, prompt, options);

        log::debug!("openai request to {} (model: {})", url, self.model);
        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
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
        unified_response_from_chat_completions(&json, &self.model)
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn build_chat_completions_request_body(model: &str, prompt: &str, options: &CallOptions) -> Value {
    let mut body = json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "max_tokens": options.max_tokens,
    });
    for (key, value) in &options.extra {
        body[key] = value.clone();
    }
    body
}

fn unified_response_from_chat_completions(
    json: &Value,
    model: &str,
) -> Result<UnifiedResponse, ProviderError> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ProviderError::Parse("no choices in OpenAI response".to_string()))?;

    let tokens_used = json
        .pointer("/usage/total_tokens")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32);

    let mut metadata = std::collections::HashMap::new();
    if let Some(finish_reason) = json.pointer("/choices/0/finish_reason") {
        metadata.insert("finish_reason".to_string(), finish_reason.clone());
    }

    Ok(UnifiedResponse {
        text: text.to_string(),
        model: model.to_string(),
        provider_name: PROVIDER_NAME.to_string(),
        tokens_used,
        metadata,
    })
}
