//! Provider and gateway errors.

use derive_more::{Display, Error};
use std::time::Duration;
use tracing::{error, instrument};

/// Failure of a single provider call.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ProviderError {
    /// The request never got a response.
    #[display("network error: {_0}")]
    Network(String),
    /// The call exceeded its time budget.
    #[display("timed out after {_0:?}")]
    Timeout(Duration),
    /// The provider answered with an error status.
    #[display("HTTP {status}: {body}")]
    Http {
        /// Status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },
    /// The response could not be understood.
    #[display("malformed response: {_0}")]
    Malformed(String),
    /// The provider is misconfigured (missing key, bad endpoint).
    #[display("configuration error: {_0}")]
    Configuration(String),
    /// The provider's circuit breaker rejected the call.
    #[display("circuit open, retry after {_0:?}")]
    CircuitOpen(Duration),
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Whether another attempt against the same provider could succeed.
    ///
    /// Bad requests and authentication failures are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::Malformed(_) => {
                true
            }
            ProviderError::Http { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            ProviderError::Configuration(_) | ProviderError::CircuitOpen(_) => false,
        }
    }

    /// Short tag for telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Network(_) => "network",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Http { .. } => "http",
            ProviderError::Malformed(_) => "malformed",
            ProviderError::Configuration(_) => "configuration",
            ProviderError::CircuitOpen(_) => "circuit_open",
        }
    }
}

/// Gateway error: the whole chain, local fallback included, failed.
#[derive(Debug, Clone, Display, Error)]
#[display("Gateway error: {} at {}:{}", message, file, line)]
pub struct GatewayError {
    /// Error message.
    pub message: String,
    /// Line number where the error occurred.
    pub line: u32,
    /// Source file where the error occurred.
    pub file: &'static str,
}

impl GatewayError {
    /// Creates a new gateway error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "Gateway error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
