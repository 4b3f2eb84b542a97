use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::ProviderError;
use crate::types::Message;
use crate::util::http;

use super::LlmProvider;

/// OpenAI-compatible chat-completions provider. Works with the official
/// API and any endpoint speaking the same protocol.
pub struct OpenAiProvider {
    api_key: String,
    api_base: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, api_base: Option<String>, default_model: String) -> Self {
        let base = api_base.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        Self {
            api_key,
            api_base: base.trim_end_matches('/').to_string(),
            default_model,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = format!("{}/chat/completions", self.api_base);

        // Single candidate, no stop sequences; everything else is config.
        let body = json!({
            "model": model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "n": 1,
        });

        debug!("Completion request to {} with model {}", url, model);

        let response = http::client()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let data: serde_json::Value = response.json().await?;
        parse_completion(&data)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

/// Extract the single reply text from an OpenAI-format response.
pub fn parse_completion(data: &serde_json::Value) -> Result<String, ProviderError> {
    let message = data
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

    message
        .get("content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::Parse("No content in message".to_string()))
}
