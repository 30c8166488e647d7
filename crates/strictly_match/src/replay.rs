//! Replay stream: every engine event, rejected human input and gateway
//! attempt as a timestamped record.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strictly_gateway::{AttemptObserver, AttemptRecord};
use strictly_werewolf::{Audience, EngineEvent, Phase, SeatId, SeatView};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// One replay record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ReplayEvent {
    /// Snake-case event name.
    kind: String,
    /// Seat the event is about.
    seat: Option<SeatId>,
    /// Day it happened on.
    day: u32,
    /// Phase it happened in.
    phase: Phase,
    /// Event details.
    payload: serde_json::Value,
    /// Seats allowed to see it; public when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    private_to: Option<Vec<SeatId>>,
    /// Wall-clock time.
    timestamp: DateTime<Utc>,
}

impl ReplayEvent {
    /// Record of an engine event.
    pub fn from_engine(event: &EngineEvent) -> Self {
        let payload = serde_json::to_value(&event.kind).unwrap_or(serde_json::Value::Null);
        let private_to = match &event.audience {
            Audience::Public => None,
            Audience::Seats(seats) => Some(seats.clone()),
        };
        Self {
            kind: event.name().to_string(),
            seat: event.seat,
            day: event.day,
            phase: event.phase,
            payload,
            private_to,
            timestamp: event.timestamp,
        }
    }

    /// Record of human input the engine or the parser refused.
    pub fn rejection(seat: SeatId, day: u32, phase: Phase, input: &str, reason: &str) -> Self {
        Self {
            kind: "human_rejected".to_string(),
            seat: Some(seat),
            day,
            phase,
            payload: serde_json::json!({ "input": input, "reason": reason }),
            private_to: Some(vec![seat]),
            timestamp: Utc::now(),
        }
    }

    /// Private note telling a seat its role, and for wolves the pack.
    pub fn briefing(view: &SeatView) -> Self {
        Self {
            kind: "briefing".to_string(),
            seat: Some(view.seat),
            day: view.day,
            phase: view.phase,
            payload: serde_json::json!({
                "role": view.role,
                "briefing": view.role.briefing(),
                "allies": view.allies,
            }),
            private_to: Some(vec![view.seat]),
            timestamp: Utc::now(),
        }
    }

    /// Private note that the match is waiting on `seat`.
    pub fn turn(seat: SeatId, day: u32, phase: Phase, expected: &str, budget: Duration) -> Self {
        Self {
            kind: "human_turn".to_string(),
            seat: Some(seat),
            day,
            phase,
            payload: serde_json::json!({
                "expected": expected,
                "seconds": budget.as_secs_f64(),
            }),
            private_to: Some(vec![seat]),
            timestamp: Utc::now(),
        }
    }

    /// Record of one gateway attempt.
    pub fn attempt(record: &AttemptRecord, day: u32, phase: Phase) -> Self {
        Self {
            kind: "generation_attempt".to_string(),
            seat: None,
            day,
            phase,
            payload: serde_json::json!({
                "provider": record.provider(),
                "attempt": record.attempt(),
                "outcome": record.outcome(),
                "latency_ms": record.latency().as_millis() as u64,
                "error": record.error(),
                "mode": record.mode(),
            }),
            private_to: Some(Vec::new()),
            timestamp: Utc::now(),
        }
    }

    /// Whether `seat` may see this record. Gateway attempts are hidden from
    /// every seat.
    pub fn visible_to(&self, seat: SeatId) -> bool {
        match &self.private_to {
            None => true,
            Some(seats) => seats.contains(&seat),
        }
    }

    /// Whether every seat may see this record.
    pub fn is_public(&self) -> bool {
        self.private_to.is_none()
    }
}

/// Receives replay records.
pub trait ReplaySink: Send + Sync {
    /// Called once per record, in order.
    fn record(&self, event: &ReplayEvent);
}

/// Appends records as JSON lines.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Creates (or truncates) the file at `path`.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("Replay file opened");
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplaySink for JsonlSink {
    fn record(&self, event: &ReplayEvent) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let written = serde_json::to_writer(&mut *writer, event)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .and_then(|()| writer.flush());
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "Failed to write replay record");
        }
    }
}

/// Forwards records to a channel, for a live presenter.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ReplayEvent>,
}

impl ChannelSink {
    /// Sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReplayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReplaySink for ChannelSink {
    fn record(&self, event: &ReplayEvent) {
        // a closed receiver only means nobody is watching
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ReplayEvent>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<ReplayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReplaySink for MemorySink {
    fn record(&self, event: &ReplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Fans records out to every sink and stamps gateway attempts with the
/// match position.
pub struct ReplayHub {
    sinks: Vec<Arc<dyn ReplaySink>>,
    position: Mutex<(u32, Phase)>,
}

impl std::fmt::Debug for ReplayHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayHub")
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl Default for ReplayHub {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReplayHub {
    /// Hub over `sinks`.
    pub fn new(sinks: Vec<Arc<dyn ReplaySink>>) -> Self {
        Self {
            sinks,
            position: Mutex::new((0, Phase::Preparation)),
        }
    }

    /// Sends `event` to every sink.
    pub fn emit(&self, event: &ReplayEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }

    /// Records where the match is, for attempts made from here on.
    pub fn set_position(&self, day: u32, phase: Phase) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = (day, phase);
    }

    fn position(&self) -> (u32, Phase) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttemptObserver for ReplayHub {
    fn record(&self, record: &AttemptRecord) {
        let (day, phase) = self.position();
        self.emit(&ReplayEvent::attempt(record, day, phase));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gateway::{AttemptOutcome, SessionMode};
    use strictly_werewolf::EngineEventKind;

    fn vote_event() -> EngineEvent {
        EngineEvent {
            day: 2,
            phase: Phase::Voting,
            seat: Some(SeatId(1)),
            kind: EngineEventKind::VoteCast { target: SeatId(4) },
            audience: Audience::Public,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_engine_event_maps_fields() {
        let record = ReplayEvent::from_engine(&vote_event());
        assert_eq!(record.kind(), "vote_cast");
        assert_eq!(*record.seat(), Some(SeatId(1)));
        assert_eq!(*record.day(), 2);
        assert_eq!(record.payload()["type"], "vote_cast");
        assert!(record.is_public());
    }

    #[test]
    fn test_private_event_hidden_from_others() {
        let mut event = vote_event();
        event.audience = Audience::Seats(vec![SeatId(3)]);
        let record = ReplayEvent::from_engine(&event);
        assert!(record.visible_to(SeatId(3)));
        assert!(!record.visible_to(SeatId(1)));
    }

    #[test]
    fn test_hub_stamps_attempts_with_position() {
        let memory = Arc::new(MemorySink::new());
        let hub = ReplayHub::new(vec![memory.clone()]);
        hub.set_position(3, Phase::Discussion);
        let attempt = AttemptRecord::new(
            "primary".to_string(),
            1,
            AttemptOutcome::Failure,
            Duration::from_millis(12),
            Some("timed out".to_string()),
            SessionMode::Oneshot,
        );
        AttemptObserver::record(&hub, &attempt);

        let events = memory.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "generation_attempt");
        assert_eq!(*events[0].day(), 3);
        assert_eq!(*events[0].phase(), Phase::Discussion);
        assert_eq!(events[0].payload()["provider"], "primary");
        assert!(!events[0].visible_to(SeatId(0)));
    }

    #[test]
    fn test_jsonl_sink_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.jsonl");
        let sink = JsonlSink::create(&path).unwrap();
        sink.record(&ReplayEvent::from_engine(&vote_event()));
        sink.record(&ReplayEvent::rejection(
            SeatId(0),
            1,
            Phase::Night,
            "vote 9",
            "unknown seat",
        ));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<ReplayEvent> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].kind(), "human_rejected");
    }
}
