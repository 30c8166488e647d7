//! Provider configuration.

use crate::error::ProviderError;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Wire protocol a provider speaks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI chat completions.
    #[display("openai")]
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API.
    #[display("anthropic")]
    Anthropic,
    /// Any server exposing `/v1/chat/completions`.
    #[display("openai_compatible")]
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    /// Persistent websocket session with streamed responses.
    #[display("realtime")]
    Realtime,
    /// Offline templated lines.
    #[display("local")]
    Local,
}

impl ProviderKind {
    /// Environment variable holding the key when none is configured.
    pub fn default_key_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi | ProviderKind::Realtime => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::OpenAiCompatible | ProviderKind::Local => None,
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderKind::Anthropic => Some("https://api.anthropic.com/v1/messages"),
            ProviderKind::Realtime => Some("wss://api.openai.com/v1/realtime"),
            ProviderKind::OpenAi | ProviderKind::OpenAiCompatible | ProviderKind::Local => None,
        }
    }
}

/// How a caller wants text produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One request, one response.
    #[default]
    #[display("oneshot")]
    Oneshot,
    /// Prefer a persistent streaming session.
    #[display("streaming")]
    Streaming,
}

/// One configured provider. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ProviderConfig {
    /// Unique name used in logs and breaker state.
    #[setters(skip)]
    name: String,

    /// Protocol to speak.
    #[setters(skip)]
    kind: ProviderKind,

    /// Base URL or full endpoint; the kind's default when absent.
    #[serde(default)]
    #[setters(strip_option, into)]
    endpoint: Option<String>,

    /// Name of the environment variable holding the key.
    #[serde(default)]
    #[setters(strip_option, into)]
    api_key_env: Option<String>,

    /// Key given directly; never written back out.
    #[serde(default, skip_serializing)]
    #[setters(strip_option, into)]
    api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    #[setters(into)]
    model: String,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    temperature: f32,

    /// Per-call time budget in seconds.
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.8
}

fn default_timeout_secs() -> u64 {
    20
}

impl ProviderConfig {
    /// Creates a provider configuration with default limits.
    #[instrument(skip(name), fields(name = %name.as_ref()))]
    pub fn new(name: impl AsRef<str>, kind: ProviderKind) -> Self {
        debug!(%kind, "Creating provider config");
        Self {
            name: name.as_ref().to_string(),
            kind,
            endpoint: None,
            api_key_env: None,
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Offline provider that always answers.
    pub fn local() -> Self {
        Self::new("local", ProviderKind::Local)
    }

    /// Per-call time budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Whether this provider holds a persistent streaming session.
    pub fn is_realtime(&self) -> bool {
        self.kind == ProviderKind::Realtime
    }

    /// Configured endpoint, falling back to the kind's default.
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.kind.default_endpoint().map(str::to_string))
    }

    /// API key from the config, the named variable or the kind's default
    /// variable, in that order.
    #[instrument(skip(self), fields(name = %self.name, kind = %self.kind))]
    pub fn resolve_api_key(&self) -> Result<String, ProviderError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        let var = self
            .api_key_env
            .as_deref()
            .or_else(|| self.kind.default_key_env());
        match (var, self.kind) {
            (Some(var), _) => std::env::var(var).map_err(|_| {
                ProviderError::Configuration(format!("{var} environment variable not set"))
            }),
            // compatible servers are often local and keyless
            (None, ProviderKind::OpenAiCompatible | ProviderKind::Local) => Ok(String::new()),
            (None, kind) => Err(ProviderError::Configuration(format!(
                "no API key configured for {kind}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "name": "primary",
            "kind": "anthropic",
            "model": "claude-3-5-haiku-20241022"
        }))
        .unwrap();
        assert_eq!(*config.max_tokens(), 150);
        assert_eq!(config.timeout(), Duration::from_secs(20));
        assert_eq!(
            config.resolved_endpoint().as_deref(),
            Some("https://api.anthropic.com/v1/messages")
        );
        assert!(!config.is_realtime());
    }

    #[test]
    fn test_explicit_key_wins_and_is_not_serialized() {
        let config = ProviderConfig::new("p", ProviderKind::OpenAi).with_api_key("sk-test");
        assert_eq!(config.resolve_api_key().unwrap(), "sk-test");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-test"));
    }

    #[test]
    fn test_missing_named_variable_is_configuration_error() {
        let config = ProviderConfig::new("p", ProviderKind::Anthropic)
            .with_api_key_env("STRICTLY_WEREWOLF_TEST_KEY_THAT_IS_NOT_SET");
        let err = config.resolve_api_key().unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_local_needs_no_key() {
        assert_eq!(ProviderConfig::local().resolve_api_key().unwrap(), "");
    }
}
