use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::ProviderError;
use crate::provider::LlmProvider;
use crate::store::{Counter, CounterStore};
use crate::types::Message;

/// Assembles persona + conversation window, calls the provider, and
/// post-processes the reply. Incrementing the answered-questions counter
/// is a best-effort side effect of success, never part of the result.
pub struct ChatEngine {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn CounterStore>,
    model: String,
    max_tokens: u32,
    temperature: f64,
    persona: String,
    strip_markdown_bold: bool,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn CounterStore>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            store,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            persona: config.persona.clone(),
            strip_markdown_bold: config.strip_markdown_bold,
        }
    }

    /// Generate a reply for an already-normalized conversation window.
    pub async fn reply(&self, window: Vec<Message>) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(window.len() + 1);
        messages.push(Message::system(&self.persona));
        messages.extend(window);

        let text = self
            .provider
            .chat(&messages, &self.model, self.max_tokens, self.temperature)
            .await?;

        let text = text.trim();
        let reply = if self.strip_markdown_bold {
            strip_bold_markers(text)
        } else {
            text.to_string()
        };

        info!("Generated reply ({} chars)", reply.len());

        if let Err(e) = self.store.increment(Counter::AiAnswers).await {
            warn!("Failed to increment {}: {e}", Counter::AiAnswers);
        }

        Ok(reply)
    }
}

/// Remove the literal `**` emphasis marker the upstream model likes to
/// emit; the widget renders plain text.
fn strip_bold_markers(text: &str) -> String {
    text.replace("**", "")
}
