//! Per-provider circuit breaker.
//!
//! - **Closed**: calls pass through
//! - **Open**: calls are rejected until the cool-down elapses
//! - **HalfOpen**: a single trial call decides between Closed and Open
//!
//! Calls go through a [`Permit`]. Only the permit that holds the half-open
//! trial may free the trial slot. A trial permit dropped without a verdict
//! (the caller was cancelled) frees the slot without counting as a failure.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    failure_threshold: u32,
    /// Seconds the circuit stays open.
    #[serde(default = "default_cool_down_secs")]
    cool_down_secs: u64,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cool_down_secs() -> u64 {
    30
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cool_down_secs: default_cool_down_secs(),
        }
    }
}

impl BreakerSettings {
    /// How long an open circuit rejects calls.
    pub fn cool_down(&self) -> Duration {
        Duration::from_secs(self.cool_down_secs)
    }
}

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation.
    #[display("closed")]
    Closed,
    /// Rejecting calls.
    #[display("open")]
    Open,
    /// Waiting on a trial call.
    #[display("half-open")]
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Thread-safe breaker for one provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    cool_down: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Closed breaker for the provider `name`.
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            failure_threshold: settings.failure_threshold.max(1),
            cool_down: settings.cool_down(),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// State right now, moving Open to HalfOpen once the cool-down elapsed.
    pub fn state(&self) -> CircuitState {
        self.state_at(Instant::now())
    }

    /// State at `now`.
    pub fn state_at(&self, now: Instant) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        inner.state
    }

    /// Consecutive failures recorded since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) {
        if inner.state == CircuitState::Open
            && let Some(opened_at) = inner.opened_at
            && now.saturating_duration_since(opened_at) >= self.cool_down
        {
            info!(provider = %self.name, "Circuit breaker half-open");
            inner.state = CircuitState::HalfOpen;
            inner.trial_in_flight = false;
        }
    }

    /// Asks to make a call. Rejected calls get the time left until a trial
    /// may run.
    pub fn try_acquire(&self) -> Result<Permit<'_>, Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// [`try_acquire`](Self::try_acquire) at `now`.
    pub fn try_acquire_at(&self, now: Instant) -> Result<Permit<'_>, Duration> {
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        match inner.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                return Err(self.cool_down.saturating_sub(elapsed));
            }
            CircuitState::HalfOpen if inner.trial_in_flight => return Err(Duration::ZERO),
            CircuitState::HalfOpen => inner.trial_in_flight = true,
        }
        Ok(Permit {
            breaker: self,
            trial: inner.state == CircuitState::HalfOpen,
            settled: false,
        })
    }

    fn record_success(&self, trial: bool) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if trial {
            inner.trial_in_flight = false;
        }
        if inner.state != CircuitState::Closed {
            info!(provider = %self.name, "Circuit breaker closed");
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
        }
    }

    fn record_failure(&self, now: Instant, trial: bool) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if trial {
            inner.trial_in_flight = false;
        }
        let trip = match inner.state {
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };
        if trip {
            warn!(
                provider = %self.name,
                consecutive_failures = inner.consecutive_failures,
                cool_down_secs = self.cool_down.as_secs(),
                "Circuit breaker opened"
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
        }
    }

    fn release_trial(&self) {
        self.lock().trial_in_flight = false;
    }
}

/// Right to make one call. Settle it with [`succeed`](Self::succeed) or
/// [`fail`](Self::fail).
#[derive(Debug)]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl Permit<'_> {
    /// Whether this permit is the half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// The call succeeded.
    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(self.trial);
    }

    /// The call failed now.
    pub fn fail(self) {
        self.fail_at(Instant::now());
    }

    /// The call failed at `now`.
    pub fn fail_at(mut self, now: Instant) {
        self.settled = true;
        self.breaker.record_failure(now, self.trial);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerSettings::default()
                .with_failure_threshold(3)
                .with_cool_down_secs(30),
        )
    }

    #[test]
    fn test_opens_after_exactly_threshold_failures() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..2 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
            assert_eq!(b.state_at(t0), CircuitState::Closed);
        }
        b.try_acquire_at(t0).unwrap().fail_at(t0);
        assert_eq!(b.state_at(t0), CircuitState::Open);
    }

    #[test]
    fn test_success_resets_count() {
        let b = breaker();
        let t0 = Instant::now();
        b.try_acquire_at(t0).unwrap().fail_at(t0);
        b.try_acquire_at(t0).unwrap().fail_at(t0);
        b.try_acquire_at(t0).unwrap().succeed();
        b.try_acquire_at(t0).unwrap().fail_at(t0);
        assert_eq!(b.state_at(t0), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 1);
    }

    #[test]
    fn test_open_rejects_until_cool_down() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..3 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
        }
        let wait = b.try_acquire_at(t0 + Duration::from_secs(10)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(20));
        assert_eq!(
            b.state_at(t0 + Duration::from_secs(30)),
            CircuitState::HalfOpen
        );
    }

    #[test]
    fn test_half_open_allows_single_trial() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..3 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
        }
        let later = t0 + Duration::from_secs(31);
        let trial = b.try_acquire_at(later).unwrap();
        assert!(b.try_acquire_at(later).is_err());
        trial.succeed();
        assert_eq!(b.state_at(later), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..3 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
        }
        let later = t0 + Duration::from_secs(31);
        b.try_acquire_at(later).unwrap().fail_at(later);
        assert_eq!(b.state_at(later), CircuitState::Open);
        assert!(b.try_acquire_at(later + Duration::from_secs(29)).is_err());
    }

    #[test]
    fn test_dropped_trial_frees_slot() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..3 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
        }
        let later = t0 + Duration::from_secs(31);
        drop(b.try_acquire_at(later).unwrap());
        assert_eq!(b.state_at(later), CircuitState::HalfOpen);
        assert!(b.try_acquire_at(later).is_ok());
    }

    #[test]
    fn test_stale_permit_cannot_free_trial_slot() {
        let b = breaker();
        let t0 = Instant::now();
        let stale = b.try_acquire_at(t0).unwrap();
        assert!(!stale.is_trial());
        for _ in 0..3 {
            b.try_acquire_at(t0).unwrap().fail_at(t0);
        }
        let later = t0 + Duration::from_secs(31);
        let trial = b.try_acquire_at(later).unwrap();
        assert!(trial.is_trial());

        drop(stale);
        assert_eq!(b.try_acquire_at(later).unwrap_err(), Duration::ZERO);
        trial.succeed();
        assert_eq!(b.state_at(later), CircuitState::Closed);
    }
}
