//! The generation gateway: ordered providers, each behind a retry policy and
//! a circuit breaker, ending in a local fallback.

use crate::breaker::{BreakerSettings, CircuitBreaker, CircuitState};
use crate::config::{ProviderConfig, ProviderKind, SessionMode};
use crate::error::{GatewayError, ProviderError};
use crate::prompt::{FallbackHint, Prompt};
use crate::providers::{GenerationProvider, LocalFallback, build_provider};
use crate::retry::RetryPolicy;
use crate::telemetry::{AttemptObserver, AttemptOutcome, AttemptRecord, TracingObserver};
use derive_getters::Getters;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

struct Slot {
    provider: Arc<dyn GenerationProvider>,
    breaker: CircuitBreaker,
}

/// Result of probing one provider.
#[derive(Debug, Clone, Getters)]
pub struct ProbeReport {
    /// Provider name.
    provider: String,
    /// Provider kind.
    kind: ProviderKind,
    /// Wall time of the probe.
    latency: Duration,
    /// Why the probe failed, if it did.
    error: Option<ProviderError>,
}

impl ProbeReport {
    /// Whether the provider answered.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resilient text generation across several providers.
///
/// `Oneshot` requests walk the batch providers in order. `Streaming` requests
/// try realtime providers first, then the batch providers. The local
/// fallback ends both chains, so a request only fails when the fallback
/// itself fails.
pub struct GenerationGateway {
    slots: Vec<Slot>,
    local: Arc<dyn GenerationProvider>,
    retry: RetryPolicy,
    observers: Vec<Arc<dyn AttemptObserver>>,
}

impl std::fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationGateway")
            .field("providers", &self.provider_names())
            .field("local", &self.local.name())
            .field("retry", &self.retry)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl GenerationGateway {
    /// Gateway over `providers` in priority order, with the built-in local
    /// fallback and tracing telemetry.
    #[instrument(skip(providers), fields(count = providers.len()))]
    pub fn new(
        providers: Vec<Arc<dyn GenerationProvider>>,
        retry: RetryPolicy,
        breaker: BreakerSettings,
    ) -> Self {
        let slots = providers
            .into_iter()
            .map(|provider| Slot {
                breaker: CircuitBreaker::new(provider.name(), breaker),
                provider,
            })
            .collect();
        info!("Generation gateway ready");
        Self {
            slots,
            local: Arc::new(LocalFallback::default()),
            retry,
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    /// Builds every configured provider.
    ///
    /// Providers that cannot be built (missing key, missing endpoint) are
    /// skipped with a warning. A `local` entry replaces the built-in
    /// fallback. Duplicate names are an error.
    #[instrument(skip_all, fields(count = configs.len()))]
    pub fn from_configs(
        configs: &[ProviderConfig],
        retry: RetryPolicy,
        breaker: BreakerSettings,
    ) -> Result<Self, GatewayError> {
        let mut seen = HashSet::new();
        let mut providers = Vec::new();
        let mut local = None;
        for config in configs {
            if !seen.insert(config.name().as_str()) {
                return Err(GatewayError::new(format!(
                    "duplicate provider name: {}",
                    config.name()
                )));
            }
            match build_provider(config) {
                Ok(provider) if *config.kind() == ProviderKind::Local => local = Some(provider),
                Ok(provider) => providers.push(provider),
                Err(e) => warn!(
                    provider = %config.name(),
                    error = %e,
                    "Skipping provider that could not be built"
                ),
            }
        }
        let gateway = Self::new(providers, retry, breaker);
        Ok(match local {
            Some(local) => gateway.with_local_fallback(local),
            None => gateway,
        })
    }

    /// Adds an attempt observer.
    pub fn with_observer(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replaces the local fallback.
    pub fn with_local_fallback(mut self, local: Arc<dyn GenerationProvider>) -> Self {
        self.local = local;
        self
    }

    /// The retry policy in force.
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Remote provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.provider.name()).collect()
    }

    /// Breaker state of the named provider.
    pub fn breaker_state(&self, name: &str) -> Option<CircuitState> {
        self.slot(name).map(|slot| slot.breaker.state())
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.provider.name() == name)
    }

    fn chain(&self, mode: SessionMode) -> Vec<&Slot> {
        let batch = self.slots.iter().filter(|slot| !slot.provider.is_realtime());
        match mode {
            SessionMode::Oneshot => batch.collect(),
            SessionMode::Streaming => self
                .slots
                .iter()
                .filter(|slot| slot.provider.is_realtime())
                .chain(batch)
                .collect(),
        }
    }

    fn notify(&self, record: AttemptRecord) {
        for observer in &self.observers {
            observer.record(&record);
        }
    }

    /// Produces text for `prompt`, walking the chain for `mode`.
    #[instrument(skip_all, fields(mode = %mode, intent = %prompt.hint().intent()))]
    pub async fn generate(&self, prompt: &Prompt, mode: SessionMode) -> Result<String, GatewayError> {
        for slot in self.chain(mode) {
            match self.try_provider(slot, prompt, mode).await {
                Ok(text) => return Ok(text),
                Err(e) => debug!(provider = %slot.provider.name(), error = %e, "Falling over"),
            }
        }

        info!(local = %self.local.name(), "Using local fallback");
        let started = Instant::now();
        let result = call(self.local.as_ref(), prompt).await;
        self.notify(AttemptRecord::new(
            self.local.name().to_string(),
            1,
            if result.is_ok() {
                AttemptOutcome::Success
            } else {
                AttemptOutcome::Failure
            },
            started.elapsed(),
            result.as_ref().err().map(ToString::to_string),
            mode,
        ));
        result.map_err(|e| GatewayError::new(format!("every provider failed, local fallback: {e}")))
    }

    async fn try_provider(
        &self,
        slot: &Slot,
        prompt: &Prompt,
        mode: SessionMode,
    ) -> Result<String, ProviderError> {
        let name = slot.provider.name();
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            let permit = match slot.breaker.try_acquire() {
                Ok(permit) => permit,
                Err(wait) => {
                    let err = ProviderError::CircuitOpen(wait);
                    self.notify(AttemptRecord::new(
                        name.to_string(),
                        attempt,
                        AttemptOutcome::Skipped,
                        Duration::ZERO,
                        Some(err.to_string()),
                        mode,
                    ));
                    return Err(err);
                }
            };

            let started = Instant::now();
            let result = call(slot.provider.as_ref(), prompt).await;
            let latency = started.elapsed();

            match result {
                Ok(text) => {
                    permit.succeed();
                    self.notify(AttemptRecord::new(
                        name.to_string(),
                        attempt,
                        AttemptOutcome::Success,
                        latency,
                        None,
                        mode,
                    ));
                    return Ok(text);
                }
                Err(err) => {
                    permit.fail();
                    self.notify(AttemptRecord::new(
                        name.to_string(),
                        attempt,
                        AttemptOutcome::Failure,
                        latency,
                        Some(err.to_string()),
                        mode,
                    ));
                    if !err.is_retryable() {
                        warn!(provider = %name, error = %err, "Not retrying");
                        return Err(err);
                    }
                    if attempt >= attempts {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for(attempt);
                    debug!(provider = %name, attempt, delay_ms = delay.as_millis() as u64, "Retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Sends a tiny prompt to every provider, local fallback included,
    /// bypassing retries and breakers.
    #[instrument(skip(self))]
    pub async fn probe_all(&self) -> Vec<ProbeReport> {
        let prompt = Prompt::new(
            "You are checking a connection.",
            "Reply with the single word: ready",
            FallbackHint::default(),
        );
        let mut reports = Vec::with_capacity(self.slots.len() + 1);
        let providers = self
            .slots
            .iter()
            .map(|slot| &slot.provider)
            .chain(std::iter::once(&self.local));
        for provider in providers {
            let started = Instant::now();
            let result = call(provider.as_ref(), &prompt).await;
            let report = ProbeReport {
                provider: provider.name().to_string(),
                kind: provider.kind(),
                latency: started.elapsed(),
                error: result.err(),
            };
            info!(provider = %report.provider, ok = report.is_ok(), "Probed provider");
            reports.push(report);
        }
        reports
    }
}

/// One call under the provider's time budget. Blank replies count as
/// malformed.
async fn call(provider: &dyn GenerationProvider, prompt: &Prompt) -> Result<String, ProviderError> {
    let budget = provider.timeout();
    match tokio::time::timeout(budget, provider.generate(prompt)).await {
        Ok(Ok(text)) if text.trim().is_empty() => {
            Err(ProviderError::Malformed("empty reply".to_string()))
        }
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(budget)),
    }
}
