//! Per-attempt telemetry.

use crate::config::SessionMode;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// How an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The provider returned text.
    #[display("success")]
    Success,
    /// The provider failed.
    #[display("failure")]
    Failure,
    /// The breaker rejected the call before it was made.
    #[display("skipped")]
    Skipped,
}

/// One provider attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct AttemptRecord {
    /// Provider name.
    provider: String,
    /// Attempt number against this provider, starting at 1.
    attempt: u32,
    /// How the attempt ended.
    outcome: AttemptOutcome,
    /// Wall time spent.
    latency: Duration,
    /// Error text for failures and skips.
    error: Option<String>,
    /// Session mode of the request.
    mode: SessionMode,
}

/// Receives every attempt the gateway makes.
pub trait AttemptObserver: Send + Sync {
    /// Called once per attempt, after it settles.
    fn record(&self, record: &AttemptRecord);
}

/// Writes attempts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AttemptObserver for TracingObserver {
    fn record(&self, record: &AttemptRecord) {
        match record.outcome {
            AttemptOutcome::Success => debug!(
                provider = %record.provider,
                attempt = record.attempt,
                latency_ms = record.latency.as_millis() as u64,
                mode = %record.mode,
                "Provider attempt succeeded"
            ),
            AttemptOutcome::Failure | AttemptOutcome::Skipped => warn!(
                provider = %record.provider,
                attempt = record.attempt,
                outcome = %record.outcome,
                latency_ms = record.latency.as_millis() as u64,
                error = record.error.as_deref().unwrap_or(""),
                mode = %record.mode,
                "Provider attempt did not succeed"
            ),
        }
    }
}

/// Keeps attempts in memory.
#[derive(Debug, Default)]
pub struct AttemptLog {
    records: Mutex<Vec<AttemptRecord>>,
}

impl AttemptLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AttemptObserver for AttemptLog {
    fn record(&self, record: &AttemptRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
