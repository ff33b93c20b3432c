use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::llm::error::ProviderError;
use crate::llm::models::provider_base::{CallOptions, ProviderAdapter, UnifiedResponse};

const PROVIDER_NAME: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        model_name: String,
        request_timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url,
            api_key,
            model_name,
            http_client,
        }
    }
}

#[async_trait]
impl ProviderAdapter for GeminiClient {
    async fn call(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<UnifiedResponse, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model_name,
            self.api_key
        );
        let request_body = build_generate_content_request_body(prompt, options);

        log::debug!("gemini request (model: {})", self.model_name);
        let response = self
            .http_client
            .post(&url)
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
        unified_response_from_generate_content(&json, &self.model_name)
    }

    fn is_available(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

fn build_generate_content_request_body(prompt: &str, options: &CallOptions) -> Value {
    let mut generation_config = json!({ "maxOutputTokens": options.max_tokens });
    for (key, value) in &options.extra {
        generation_config[key] = value.clone();
    }
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": generation_config,
    })
}

fn unified_response_from_generate_content(
    json: &Value,
    model: &str,
) -> Result<UnifiedResponse, ProviderError> {
    let text = json
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ProviderError::Parse("no candidates in Gemini response".to_string()))?;

    let tokens_used = json
        .pointer("/usageMetadata/totalTokenCount")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32);

    let mut metadata = std::collections::HashMap::new();
    if let Some(finish_reason) = json.pointer("/candidates/0/finishReason") {
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
