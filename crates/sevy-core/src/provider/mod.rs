pub mod openai;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::Message;

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the raw reply text.
    async fn chat(
        &self,
        messages: &[Message],
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, ProviderError>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}
