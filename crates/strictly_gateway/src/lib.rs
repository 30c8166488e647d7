//! Strictly Gateway - resilient text generation for AI seats
//!
//! Every AI utterance goes through one [`GenerationGateway`]. The gateway
//! hides which backend answered and keeps the match moving when backends
//! misbehave.
//!
//! # Architecture
//!
//! - **Providers**: OpenAI, Anthropic, OpenAI-compatible servers, realtime
//!   websocket sessions and an offline [`LocalFallback`]
//! - **Retry**: exponential backoff per provider, skipped for errors that
//!   cannot succeed on a second try
//! - **Breaker**: a [`CircuitBreaker`] per provider stops hammering a dead
//!   backend until its cool-down passes
//! - **Telemetry**: an [`AttemptRecord`] per attempt, fanned out to
//!   [`AttemptObserver`]s
//!
//! # Example
//!
//! ```
//! use strictly_gateway::{
//!     BreakerSettings, FallbackHint, GenerationGateway, IntentTag, Prompt, RetryPolicy,
//!     SessionMode,
//! };
//!
//! # tokio_test_block(async {
//! let gateway = GenerationGateway::new(vec![], RetryPolicy::default(), BreakerSettings::default());
//! let hint = FallbackHint::new(IntentTag::Defense, "Ash".to_string(), None, None);
//! let line = gateway
//!     .generate(&Prompt::new("", "", hint), SessionMode::Oneshot)
//!     .await?;
//! assert!(!line.is_empty());
//! # Ok::<(), strictly_gateway::GatewayError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod breaker;
mod config;
mod error;
mod gateway;
mod prompt;
mod providers;
mod retry;
mod telemetry;

// Crate-level exports - Configuration
pub use config::{ProviderConfig, ProviderKind, SessionMode};

// Crate-level exports - Errors
pub use error::{GatewayError, ProviderError};

// Crate-level exports - Gateway
pub use breaker::{BreakerSettings, CircuitBreaker, CircuitState, Permit};
pub use gateway::{GenerationGateway, ProbeReport};
pub use retry::RetryPolicy;
pub use telemetry::{AttemptLog, AttemptObserver, AttemptOutcome, AttemptRecord, TracingObserver};

// Crate-level exports - Prompts
pub use prompt::{FallbackHint, IntentTag, Prompt};

// Crate-level exports - Providers
pub use providers::{
    build_provider, AnthropicProvider, ClientEvent, CompatibleProvider, GenerationProvider,
    LocalFallback, OpenAiProvider, RealtimeProvider, RealtimeTranscript, ServerEvent,
};
