//! Anthropic messages API over reqwest.

use super::{from_reqwest, truncate_body, GenerationProvider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl AnthropicProvider {
    /// Creates the provider, resolving its key.
    #[instrument(skip(config), fields(name = %config.name(), model = %config.model()))]
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.resolve_api_key()?;
        let endpoint = config
            .resolved_endpoint()
            .ok_or_else(|| ProviderError::Configuration("no Anthropic endpoint".to_string()))?;
        debug!("Creating Anthropic client");
        Ok(Self {
            name: config.name().clone(),
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model: config.model().clone(),
            max_tokens: *config.max_tokens(),
            temperature: *config.temperature(),
            timeout: config.timeout(),
        })
    }
}

/// Text of the first content block.
fn extract_text(body: &serde_json::Value) -> Option<String> {
    body["content"][0]["text"].as_str().map(str::to_string)
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = %self.name, model = %self.model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": prompt.system(),
            "messages": [
                {
                    "role": "user",
                    "content": prompt.user()
                }
            ]
        });

        debug!("Sending request to Anthropic");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Anthropic API request failed");
                from_reqwest(e)
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!(error = ?e, "Failed to read Anthropic response");
            from_reqwest(e)
        })?;

        if !status.is_success() {
            error!(status = %status, response = %response_text, "Anthropic API error");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate_body(&response_text),
            });
        }

        debug!(response_length = response_text.len(), "Parsing Anthropic response");
        let response_json: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
            error!(error = ?e, "Failed to parse Anthropic response");
            ProviderError::Malformed(format!("failed to parse response: {e}"))
        })?;

        let content = extract_text(&response_json).ok_or_else(|| {
            error!(response = %response_json, "No text content in Anthropic response");
            ProviderError::Malformed("no text content in Anthropic response".to_string())
        })?;

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_text_block() {
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "I trust Fern."}],
            "stop_reason": "end_turn"
        });
        assert_eq!(extract_text(&body).as_deref(), Some("I trust Fern."));
        assert_eq!(extract_text(&serde_json::json!({"content": []})), None);
    }
}
