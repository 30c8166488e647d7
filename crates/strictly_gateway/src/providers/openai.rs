//! OpenAI chat completions through async-openai.

use super::GenerationProvider;
use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::prompt::Prompt;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client as OpenAIClient,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    name: String,
    client: OpenAIClient<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates the provider, resolving its key. A configured endpoint
    /// replaces the default API base.
    #[instrument(skip(config), fields(name = %config.name(), model = %config.model()))]
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut openai = OpenAIConfig::new().with_api_key(config.resolve_api_key()?);
        if let Some(base) = config.endpoint() {
            openai = openai.with_api_base(base.clone());
        }
        debug!("Creating OpenAI client");
        Ok(Self {
            name: config.name().clone(),
            client: OpenAIClient::with_config(openai),
            model: config.model().clone(),
            max_tokens: *config.max_tokens(),
            temperature: *config.temperature(),
            timeout: config.timeout(),
        })
    }

    fn build_request(
        &self,
        prompt: &Prompt,
    ) -> Result<CreateChatCompletionRequest, ProviderError> {
        let invalid = |e: OpenAIError| {
            error!(error = ?e, "Failed to build request");
            ProviderError::Configuration(format!("failed to build request: {e}"))
        };
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(prompt.system().as_str())
                    .build()
                    .map_err(invalid)?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.user().as_str())
                    .build()
                    .map_err(invalid)?,
            ),
        ];
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build()
            .map_err(invalid)
    }
}

/// Sorts an async-openai error into the provider taxonomy.
fn classify(error: OpenAIError) -> ProviderError {
    match error {
        OpenAIError::ApiError(api) => {
            let body = api.to_string();
            let status = if body.contains("invalid_api_key") {
                401
            } else if body.contains("invalid_request_error") {
                400
            } else if body.contains("rate_limit") {
                429
            } else {
                500
            };
            ProviderError::Http { status, body }
        }
        OpenAIError::Reqwest(e) => match e.status() {
            Some(status) => ProviderError::Http {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => ProviderError::Network(e.to_string()),
        },
        other => ProviderError::Malformed(other.to_string()),
    }
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, prompt), fields(provider = %self.name, model = %self.model))]
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request = self.build_request(prompt)?;

        debug!("Sending request to OpenAI");
        let response = self.client.chat().create(request).await.map_err(|e| {
            error!(error = ?e, "OpenAI API error");
            classify(e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                error!("No content in OpenAI response");
                ProviderError::Malformed("no content in OpenAI response".to_string())
            })?;

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }
}
