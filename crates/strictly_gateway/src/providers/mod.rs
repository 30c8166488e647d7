//! Provider adapters behind one capability: prompt in, text out.

mod anthropic;
mod compatible;
mod local;
mod openai;
mod realtime;

pub use anthropic::AnthropicProvider;
pub use compatible::CompatibleProvider;
pub use local::LocalFallback;
pub use openai::OpenAiProvider;
pub use realtime::{ClientEvent, RealtimeProvider, RealtimeTranscript, ServerEvent};

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::ProviderError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// A text generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync + std::fmt::Debug {
    /// Unique name, used for breaker state and telemetry.
    fn name(&self) -> &str;

    /// Protocol this provider speaks.
    fn kind(&self) -> ProviderKind;

    /// Time budget for a single call.
    fn timeout(&self) -> Duration {
        Duration::from_secs(20)
    }

    /// Whether this provider holds a persistent streaming session.
    fn is_realtime(&self) -> bool {
        self.kind() == ProviderKind::Realtime
    }

    /// Produces text for `prompt`.
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

/// Builds the adapter for `config`.
///
/// Fails with [`ProviderError::Configuration`] when a required key or
/// endpoint is missing.
#[instrument(skip(config), fields(name = %config.name(), kind = %config.kind()))]
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    let provider: Arc<dyn GenerationProvider> = match config.kind() {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderKind::OpenAiCompatible => Arc::new(CompatibleProvider::new(config)?),
        ProviderKind::Realtime => Arc::new(RealtimeProvider::new(config)?),
        ProviderKind::Local => Arc::new(LocalFallback::named(config.name())),
    };
    info!("Provider ready");
    Ok(provider)
}

/// Keeps at most this many bytes of an error body.
pub(crate) fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 512;
    if body.len() <= LIMIT {
        return body.to_string();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Maps a transport error from reqwest.
pub(crate) fn from_reqwest(error: reqwest::Error) -> ProviderError {
    if let Some(status) = error.status() {
        ProviderError::Http {
            status: status.as_u16(),
            body: error.to_string(),
        }
    } else if error.is_timeout() {
        ProviderError::Network(format!("request timed out: {error}"))
    } else if error.is_decode() {
        ProviderError::Malformed(error.to_string())
    } else {
        ProviderError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(400);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 515);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn test_build_local_needs_nothing() {
        let provider = build_provider(&ProviderConfig::local()).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Local);
        assert!(!provider.is_realtime());
    }

    #[test]
    fn test_compatible_requires_endpoint() {
        let config = ProviderConfig::new("ollama", ProviderKind::OpenAiCompatible);
        let err = build_provider(&config).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
