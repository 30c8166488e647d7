//! The match loop: drives the engine through its phases, asks AI seats
//! and the human for actions, and keeps every seat's beliefs current.

use crate::human::parse_command;
use crate::replay::{ReplayEvent, ReplayHub};
use crate::seat::SeatAgent;
use crate::speech::{build_prompt, polish};
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use strictly_gateway::{GenerationGateway, LocalFallback, SessionMode};
use strictly_werewolf::{
    Action, Death, Faction, GamePhaseEngine, NightRound, Phase, RoleKind, SeatId, SeatView,
    Speech, Tick,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// One seat at the end of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct SeatSummary {
    /// Seat index.
    seat: SeatId,
    /// Display name.
    name: String,
    /// Role held.
    role: RoleKind,
    /// Alive at the end.
    alive: bool,
    /// Whether the human played it.
    human: bool,
}

/// Outcome of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct MatchSummary {
    /// Winning faction.
    winner: Option<Faction>,
    /// Day the match ended on.
    days: u32,
    /// Deaths in order.
    deaths: Vec<Death>,
    /// Every seat with its role.
    seats: Vec<SeatSummary>,
}

/// Match loop error.
#[derive(Debug, Clone, Display, Error)]
#[display("Match error: {} at {}:{}", message, file, line)]
pub struct MatchError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl MatchError {
    /// Creates a new match error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Runs one match from the deal to a winner.
#[derive(Debug)]
pub struct MatchRunner {
    engine: GamePhaseEngine,
    gateway: GenerationGateway,
    replay: Arc<ReplayHub>,
    agents: BTreeMap<SeatId, SeatAgent>,
    human: Option<mpsc::Receiver<String>>,
    mode: SessionMode,
    max_days: u32,
    seed: u64,
    last_tick: Instant,
}

impl MatchRunner {
    /// Runner over a fresh engine. AI seats speak through `gateway`.
    pub fn new(engine: GamePhaseEngine, gateway: GenerationGateway) -> Self {
        let seed = (*engine.state().settings().seed()).unwrap_or_else(rand::random);
        Self {
            engine,
            gateway,
            replay: Arc::new(ReplayHub::default()),
            agents: BTreeMap::new(),
            human: None,
            mode: SessionMode::default(),
            max_days: 30,
            seed,
            last_tick: Instant::now(),
        }
    }

    /// Sends every engine event, rejection and gateway attempt to `replay`.
    pub fn with_replay(mut self, replay: Arc<ReplayHub>) -> Self {
        self.gateway = self.gateway.with_observer(replay.clone());
        self.replay = replay;
        self
    }

    /// Lines typed by the human seat.
    pub fn with_human(mut self, lines: mpsc::Receiver<String>) -> Self {
        self.human = Some(lines);
        self
    }

    /// How AI speech is requested.
    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Day after which the match is abandoned.
    pub fn with_max_days(mut self, max_days: u32) -> Self {
        self.max_days = max_days;
        self
    }

    /// Current engine.
    pub fn engine(&self) -> &GamePhaseEngine {
        &self.engine
    }

    /// Plays until a faction wins. Deals the roles first unless the engine
    /// has already left preparation.
    #[instrument(skip(self), fields(mode = %self.mode, max_days = self.max_days))]
    pub async fn run(mut self) -> Result<MatchSummary, MatchError> {
        info!("Match starting");
        if self.engine.state().phase() == Phase::Preparation {
            self.engine.advance().map_err(|e| MatchError::new(e.to_string()))?;
        }
        self.seat_agents();
        self.flush();
        self.last_tick = Instant::now();
        loop {
            let position = self.position();
            let (day, phase) = position;
            if phase == Phase::Over {
                break;
            }
            if day > self.max_days {
                return Err(MatchError::new(format!(
                    "No winner after {} days",
                    self.max_days
                )));
            }

            match phase {
                Phase::Night => self.run_night().await,
                Phase::Discussion | Phase::LastWords => self.run_floor().await,
                Phase::Voting => self.run_voting().await,
                Phase::Preparation | Phase::Over => {}
            }

            self.clock();
            if self.position() == position {
                let closes = match phase {
                    Phase::Discussion | Phase::LastWords => self.engine.phase_complete(),
                    _ => true,
                };
                if closes {
                    self.engine.advance().map_err(|e| MatchError::new(e.to_string()))?;
                }
            }
            self.flush();
        }

        let summary = self.summary();
        info!(winner = ?summary.winner, days = summary.days, "Match over");
        Ok(summary)
    }

    fn summary(&self) -> MatchSummary {
        let state = self.engine.state();
        MatchSummary {
            winner: state.winner(),
            days: state.day(),
            deaths: state.dead().to_vec(),
            seats: state
                .players()
                .iter()
                .map(|p| SeatSummary {
                    seat: p.seat(),
                    name: p.name().to_string(),
                    role: p.role(),
                    alive: p.is_alive(),
                    human: p.is_human(),
                })
                .collect(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Bookkeeping
    // ─────────────────────────────────────────────────────────────

    fn position(&self) -> (u32, Phase) {
        (self.engine.state().day(), self.engine.state().phase())
    }

    fn is_human(&self, seat: SeatId) -> bool {
        self.engine
            .state()
            .player(seat)
            .is_some_and(|p| p.is_human())
    }

    fn seat_agents(&mut self) {
        let seats: Vec<SeatId> = self.engine.state().players().iter().map(|p| p.seat()).collect();
        for seat in seats {
            if let Some(agent) = SeatAgent::for_seat(&self.engine, seat, self.seed) {
                self.agents.insert(seat, agent);
            } else if let Some(view) = self.engine.view_for(seat) {
                self.replay.emit(&ReplayEvent::briefing(&view));
            }
        }
        info!(ai_seats = self.agents.len(), "Seats ready");
    }

    /// Moves the engine clock forward by the wall time since the last call.
    fn clock(&mut self) -> Tick {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        let tick = self.engine.tick(elapsed);
        match tick {
            Tick::SpeakerTimedOut(seat) => info!(%seat, "Speaker ran out of time"),
            Tick::Advanced(phase) => info!(%phase, "Phase timer expired"),
            Tick::Idle | Tick::Running => {}
        }
        tick
    }

    /// Publishes pending engine events and lets every AI seat observe them.
    fn flush(&mut self) {
        let events = self.engine.take_events();
        if events.is_empty() {
            return;
        }
        let (day, phase) = self.position();
        self.replay.set_position(day, phase);
        let views: BTreeMap<SeatId, SeatView> = self
            .agents
            .keys()
            .filter_map(|seat| self.engine.view_for(*seat).map(|view| (*seat, view)))
            .collect();
        for event in &events {
            self.replay.emit(&ReplayEvent::from_engine(event));
            for (seat, agent) in self.agents.iter_mut() {
                if let Some(view) = views.get(seat) {
                    agent.observe(view, event);
                }
            }
        }
        debug!(events = events.len(), "Flushed events");
    }

    /// Time the seat awaited now may take: the phase timer, capped by the
    /// speaker timer on the floor.
    fn turn_budget(&self) -> Duration {
        let state = self.engine.state();
        match (state.remaining_time(), state.speaker_remaining()) {
            (Some(phase), Some(speaker)) => phase.min(speaker),
            (Some(phase), None) => phase,
            (None, Some(speaker)) => speaker,
            (None, None) => Duration::ZERO,
        }
    }

    /// Applies an AI action, falling back to `fallback` if it is refused.
    fn apply_ai(&mut self, seat: SeatId, action: Action, fallback: Action) {
        if !self.engine.apply_ai_action(seat, action) {
            self.engine.apply_ai_action(seat, fallback);
        }
        self.flush();
    }

    // ─────────────────────────────────────────────────────────────
    //  Phases
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip(self))]
    async fn run_night(&mut self) {
        let position = self.position();
        for round in [NightRound::First, NightRound::Second] {
            let actors: Vec<SeatId> = self
                .engine
                .awaiting()
                .into_iter()
                .filter(|seat| {
                    self.engine
                        .state()
                        .player(*seat)
                        .is_some_and(|p| p.role().night_round() == Some(round))
                })
                .collect();
            for seat in actors {
                if self.position() != position {
                    return;
                }
                if self.is_human(seat) {
                    self.await_human(seat, "a night ability or pass").await;
                } else if let Some(view) = self.engine.view_for(seat)
                    && let Some(agent) = self.agents.get_mut(&seat)
                {
                    let action = agent.night_action(&view);
                    self.apply_ai(seat, action, Action::Pass);
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn run_voting(&mut self) {
        let position = self.position();
        let (humans, ais): (Vec<SeatId>, Vec<SeatId>) = self
            .engine
            .awaiting()
            .into_iter()
            .partition(|seat| self.is_human(*seat));
        for seat in ais {
            if let Some(view) = self.engine.view_for(seat)
                && let Some(agent) = self.agents.get_mut(&seat)
            {
                let action = agent.vote(&view);
                self.apply_ai(seat, action, Action::Pass);
            }
        }
        for seat in humans {
            if self.position() != position {
                return;
            }
            self.await_human(seat, "a vote or pass").await;
        }
    }

    /// One turn on the floor: a pending hunter shot first, then the
    /// current speaker.
    #[instrument(skip(self))]
    async fn run_floor(&mut self) {
        if let Some(hunter) = self.engine.state().pending_shot() {
            if self.is_human(hunter) {
                self.await_human(hunter, "shoot a seat or hold").await;
            } else if let Some(view) = self.engine.view_for(hunter)
                && let Some(agent) = self.agents.get_mut(&hunter)
            {
                let action = agent.hunter_shot(&view);
                self.apply_ai(hunter, action, Action::HoldFire);
            }
            self.settle_turn(hunter);
            return;
        }
        let Some(speaker) = self.engine.state().current_speaker() else {
            return;
        };
        if self.is_human(speaker) {
            self.await_human(speaker, "say something or pass").await;
        } else {
            self.ai_speak(speaker).await;
        }
        self.settle_turn(speaker);
    }

    /// Takes the floor from `seat` if it still holds it.
    fn settle_turn(&mut self, seat: SeatId) {
        self.clock();
        if self.engine.awaiting().first() == Some(&seat) {
            self.engine.time_out_speaker();
        }
        self.flush();
    }

    /// Generates and applies one AI speech within the speaker's time.
    #[instrument(skip(self))]
    async fn ai_speak(&mut self, seat: SeatId) {
        let position = self.position();
        let Some(view) = self.engine.view_for(seat) else {
            return;
        };
        let Some(agent) = self.agents.get_mut(&seat) else {
            return;
        };
        let intent = agent.speech_intent(&view);
        let prompt = build_prompt(&view, &intent);
        let speaker = view.name_of(seat).to_string();

        self.clock();
        let budget = self.turn_budget();
        let text = match tokio::time::timeout(budget, self.gateway.generate(&prompt, self.mode)).await
        {
            Ok(Ok(reply)) => {
                Some(polish(&reply, &speaker).unwrap_or_else(|| LocalFallback::compose(prompt.hint())))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Gateway failed, composing locally");
                Some(LocalFallback::compose(prompt.hint()))
            }
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "Speech not ready in time");
                None
            }
        };

        self.clock();
        if self.position() != position || self.engine.state().current_speaker() != Some(seat) {
            debug!("Floor moved on before the speech was ready");
            return;
        }
        if let Some(text) = text {
            let speech = Speech::new(text, intent.speech_kind());
            self.apply_ai(seat, Action::Speak(speech), Action::Pass);
        }
    }

    /// Waits for a valid command from the human seat until its turn runs
    /// out. Returns whether an action was applied.
    #[instrument(skip(self))]
    async fn await_human(&mut self, seat: SeatId, expected: &str) -> bool {
        let Some(mut lines) = self.human.take() else {
            return false;
        };
        self.clock();
        let position = self.position();
        let (day, phase) = position;
        let budget = self.turn_budget();
        self.replay
            .emit(&ReplayEvent::turn(seat, day, phase, expected, budget));
        let deadline = Instant::now() + budget;

        let acted = loop {
            let line = match tokio::time::timeout_at(deadline, lines.recv()).await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("Human input closed; the seat will time out from now on");
                    return false;
                }
                Err(_) => {
                    debug!("Human turn ran out");
                    break false;
                }
            };
            self.clock();
            if self.position() != position {
                break false;
            }
            let view = self.engine.view_for(seat);
            let applied = parse_command(&line, view.as_ref())
                .map_err(|e| e.to_string())
                .and_then(|action| {
                    self.engine
                        .apply_human_action(action)
                        .map_err(|e| e.to_string())
                });
            match applied {
                Ok(()) => {
                    self.flush();
                    break true;
                }
                Err(reason) => {
                    warn!(input = %line, %reason, "Human command rejected");
                    self.replay
                        .emit(&ReplayEvent::rejection(seat, day, phase, &line, &reason));
                }
            }
        };
        self.human = Some(lines);
        acted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gateway::{BreakerSettings, RetryPolicy};
    use strictly_werewolf::MatchSettings;

    fn offline() -> GenerationGateway {
        GenerationGateway::new(vec![], RetryPolicy::immediate(1), BreakerSettings::default())
    }

    #[tokio::test]
    async fn test_offline_match_reaches_a_winner() {
        let engine = GamePhaseEngine::new(MatchSettings::new(8).with_seed(21)).unwrap();
        let summary = MatchRunner::new(engine, offline()).run().await.unwrap();
        assert!(summary.winner().is_some());
        assert_eq!(summary.seats().len(), 8);
        assert!(!summary.deaths().is_empty());
    }

    #[tokio::test]
    async fn test_turn_budget_takes_the_tighter_timer() {
        let settings = MatchSettings::new(6).with_seed(2);
        let mut engine = GamePhaseEngine::new(settings).unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        let runner = MatchRunner::new(engine, offline());
        let state = runner.engine().state();
        assert_eq!(state.phase(), Phase::Discussion);
        let expected = state
            .remaining_time()
            .unwrap()
            .min(state.speaker_remaining().unwrap());
        assert_eq!(runner.turn_budget(), expected);
    }
}
