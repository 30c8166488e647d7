//! Servers that expose an OpenAI-style `/v1/chat/completions` route.

use super::{from_reqwest, truncate_body, GenerationProvider};
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Provider for self-hosted or third-party OpenAI-compatible servers.
#[derive(Debug, Clone)]
pub struct CompatibleProvider {
    name: String,
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

/// Full completions URL for a configured base.
fn completions_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

/// Reply text, or the server's own error message.
fn extract_content(body: &serde_json::Value) -> Result<String, ProviderError> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown API error");
        return Err(ProviderError::Http {
            status: 500,
            body: message.to_string(),
        });
    }
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Malformed("no content in response".to_string()))
}

impl CompatibleProvider {
    /// Creates the provider. An endpoint is required; the key may be empty.
    #[instrument(skip(config), fields(name = %config.name(), model = %config.model()))]
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base = config.resolved_endpoint().ok_or_else(|| {
            ProviderError::Configuration(format!("provider {} has no endpoint", config.name()))
        })?;
        let api_key = config.resolve_api_key()?;
        Ok(Self {
            name: config.name().clone(),
            client: reqwest::Client::new(),
            url: completions_url(&base),
            api_key,
            model: config.model().clone(),
            max_tokens: *config.max_tokens(),
            temperature: *config.temperature(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl GenerationProvider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiCompatible
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = %self.name, url = %self.url))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": prompt.system()},
                {"role": "user", "content": prompt.user()}
            ]
        });

        let mut request = self.client.post(&self.url).json(&request_body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        debug!("Sending chat completion request");
        let response = request.send().await.map_err(|e| {
            error!(error = ?e, "Request failed");
            from_reqwest(e)
        })?;
        let status = response.status();
        let text = response.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            error!(status = %status, "Provider returned an error status");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("failed to parse response: {e}")))?;
        let content = extract_content(&body)?;
        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_variants() {
        assert_eq!(
            completions_url("http://localhost:11434"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://host/v1/chat/completions"),
            "https://host/v1/chat/completions"
        );
    }

    #[test]
    fn test_error_field_surfaces_message() {
        let body = serde_json::json!({"error": {"message": "model not loaded"}});
        let err = extract_content(&body).unwrap_err();
        assert_eq!(
            err,
            ProviderError::Http {
                status: 500,
                body: "model not loaded".to_string()
            }
        );
    }

    #[test]
    fn test_content_extracted() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Vote Ivy."}}]
        });
        assert_eq!(extract_content(&body).unwrap(), "Vote Ivy.");
    }
}
