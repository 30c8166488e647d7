//! Phase engine: the single authority over game state.
//!
//! The engine owns the state, validates every action through the contracts
//! in [`crate::contracts`], resolves phase boundaries through the pure rules
//! in [`crate::rules`], and records what happened as [`EngineEvent`]s.

use crate::action::{Action, HumanAction, NightAbility, ValidationError};
use crate::contracts::{ActionContract, Contract, LegalAction};
use crate::events::{Audience, EngineEvent, EngineEventKind};
use crate::invariants::{InvariantSet, InvariantViolation, WerewolfInvariants};
use crate::roles::{AbilityKind, Faction, RoleKind};
use crate::rules::{check_winner, resolve_night, tally, NightLedger};
use crate::settings::{MatchSettings, RoleDistribution, StateInvariantError};
use crate::types::{
    Death, DeathCause, GameState, Personality, Phase, Player, SeatId, SpeechRecord, VoteRecord,
    WitchPotions,
};
use crate::view::SeatView;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const SEAT_NAMES: [&str; 16] = [
    "Ash", "Bramble", "Cinder", "Dusk", "Ember", "Fern", "Gale", "Hollow", "Ivy", "Juniper",
    "Kestrel", "Larch", "Moss", "Nettle", "Oriel", "Pike",
];

/// Result of advancing the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The phase has no timer.
    Idle,
    /// Time remains.
    Running,
    /// The seat holding the floor ran out of time and lost its turn.
    SpeakerTimedOut(SeatId),
    /// The phase timer expired and the engine moved to this phase.
    Advanced(Phase),
}

/// Drives a match through its phases.
#[derive(Debug, Clone)]
pub struct GamePhaseEngine {
    state: GameState,
    rng: StdRng,
    dealt: Option<Vec<RoleKind>>,
    events: Vec<EngineEvent>,
    next_sequence: u64,
}

impl GamePhaseEngine {
    /// Creates an engine in [`Phase::Preparation`]. Roles are shuffled from
    /// the configured distribution when the engine first advances.
    #[instrument(skip(settings), fields(seats = settings.seats(), seed = ?settings.seed()))]
    pub fn new(settings: MatchSettings) -> Result<Self, StateInvariantError> {
        settings.validate()?;
        let rng = match settings.seed() {
            Some(seed) => StdRng::seed_from_u64(*seed),
            None => StdRng::from_entropy(),
        };
        info!("Phase engine created");
        Ok(Self {
            state: GameState::new(settings),
            rng,
            dealt: None,
            events: Vec::new(),
            next_sequence: 0,
        })
    }

    /// Creates an engine that deals exactly `roles`, seat by seat.
    ///
    /// The seat count and distribution in `settings` are replaced by the
    /// ones implied by `roles`.
    #[instrument(skip(settings, roles), fields(seats = roles.len()))]
    pub fn with_roles(
        settings: MatchSettings,
        roles: Vec<RoleKind>,
    ) -> Result<Self, StateInvariantError> {
        let distribution: RoleDistribution = roles.iter().map(|role| (*role, 1)).collect();
        let settings = settings.with_seats(roles.len()).with_roles(distribution);
        let mut engine = Self::new(settings)?;
        engine.dealt = Some(roles);
        Ok(engine)
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Copy of the current state for presentation.
    pub fn snapshot(&self) -> GameState {
        self.state.clone()
    }

    /// What `seat` is allowed to know.
    pub fn view_for(&self, seat: SeatId) -> Option<SeatView> {
        SeatView::of(&self.state, seat)
    }

    /// Drains the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tonight's wolf victim so far. The witch acts on this in the second round.
    pub fn wolf_target(&self) -> Option<SeatId> {
        self.state.night.wolf_target()
    }

    /// Checks every game invariant against the current state.
    pub fn check_invariants(&self) -> Result<(), Vec<InvariantViolation>> {
        WerewolfInvariants::check_all(&self.state)
    }

    /// Seats that still owe an action before the phase can close early.
    pub fn awaiting(&self) -> Vec<SeatId> {
        let state = &self.state;
        match state.phase {
            Phase::Night => state
                .living()
                .filter(|p| p.role().acts_at_night() && !state.night.has_acted(p.seat()))
                .map(Player::seat)
                .collect(),
            Phase::Voting => state
                .living()
                .map(Player::seat)
                .filter(|s| {
                    !state.abstained.contains(s) && !state.votes.iter().any(|v| v.voter == *s)
                })
                .collect(),
            Phase::Discussion | Phase::LastWords => state
                .pending_shot
                .or_else(|| state.current_speaker())
                .into_iter()
                .collect(),
            Phase::Preparation | Phase::Over => Vec::new(),
        }
    }

    /// Whether every seat has acted and the phase may close early.
    pub fn phase_complete(&self) -> bool {
        match self.state.phase {
            Phase::Over => false,
            Phase::Preparation => true,
            _ => self.awaiting().is_empty(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Actions
    // ─────────────────────────────────────────────────────────────

    /// Applies an action from the human seat.
    #[instrument(skip(self, action), fields(action = action.label()))]
    pub fn apply_human_action(&mut self, action: HumanAction) -> Result<(), ValidationError> {
        let seat = self
            .state
            .settings
            .human_seat()
            .ok_or(ValidationError::NoHumanSeat)?;
        self.apply_action(seat, action)
    }

    /// Applies an action from an AI seat.
    ///
    /// AI actions are produced from the seat's own view, so a rejection is a
    /// bug in the seat. It is logged and the action becomes a no-op.
    #[instrument(skip(self, action), fields(%seat, action = action.label()))]
    pub fn apply_ai_action(&mut self, seat: SeatId, action: Action) -> bool {
        match self.apply_action(seat, action) {
            Ok(()) => true,
            Err(e) => {
                error!(%seat, error = %e, "AI action rejected");
                false
            }
        }
    }

    /// Validates and applies an action from any seat.
    #[instrument(skip(self, action), fields(%seat, action = action.label(), phase = %self.state.phase))]
    pub fn apply_action(&mut self, seat: SeatId, action: Action) -> Result<(), ValidationError> {
        LegalAction::check(&self.state, seat, &action)?;
        let before = cfg!(debug_assertions).then(|| self.state.clone());

        match action {
            Action::Vote(target) => self.cast_vote(seat, target),
            Action::NightAbility(ability) => self.record_ability(seat, ability),
            Action::Speak(speech) => {
                let record = SpeechRecord {
                    seat,
                    day: self.state.day,
                    phase: self.state.phase,
                    text: speech.text.clone(),
                    kind: speech.kind,
                };
                self.state.speeches.push(record);
                self.emit(
                    Some(seat),
                    EngineEventKind::Spoke {
                        text: speech.text,
                        speech: speech.kind,
                    },
                    Audience::Public,
                );
                self.yield_floor();
            }
            Action::Pass => match self.state.phase {
                Phase::Voting => {
                    self.state.abstained.insert(seat);
                    self.emit(Some(seat), EngineEventKind::Passed, Audience::Public);
                }
                Phase::Night => {
                    self.state.night.skip(seat);
                    self.emit(
                        Some(seat),
                        EngineEventKind::NightActionSkipped,
                        Audience::Seats(vec![seat]),
                    );
                }
                _ => {
                    self.emit(Some(seat), EngineEventKind::Passed, Audience::Public);
                    self.yield_floor();
                }
            },
            Action::Shoot(target) => self.resolve_shot(seat, Some(target)),
            Action::HoldFire => self.resolve_shot(seat, None),
        }

        if let Some(before) = before {
            self.verify(&before);
        }
        Ok(())
    }

    fn cast_vote(&mut self, voter: SeatId, target: SeatId) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.state.votes.push(VoteRecord::new(
            voter,
            target,
            self.state.day,
            self.state.phase,
            sequence,
            Utc::now(),
        ));
        debug!(%voter, %target, sequence, "Vote cast");
        self.emit(
            Some(voter),
            EngineEventKind::VoteCast { target },
            Audience::Public,
        );
    }

    fn record_ability(&mut self, seat: SeatId, ability: NightAbility) {
        if let Some(potions) = self.state.potions.get_mut(&seat) {
            match ability.kind {
                AbilityKind::Heal => potions.heal = false,
                AbilityKind::Poison => potions.poison = false,
                _ => {}
            }
        }
        self.state.night.record(seat, ability);

        let audience = if ability.kind == AbilityKind::Kill {
            Audience::Seats(self.living_wolves())
        } else {
            Audience::Seats(vec![seat])
        };
        debug!(%seat, %ability, "Night ability recorded");
        self.emit(
            Some(seat),
            EngineEventKind::NightActionAccepted {
                kind: ability.kind,
                target: ability.target,
            },
            audience,
        );
    }

    /// Moves the floor to the next speaker after a speech or pass.
    fn yield_floor(&mut self) {
        match self.state.phase {
            Phase::Discussion => {
                self.state.speaking_queue.pop_front();
            }
            Phase::LastWords => self.state.last_words_spoken = true,
            _ => {}
        }
        self.reset_speaker_timer();
    }

    fn resolve_shot(&mut self, hunter: SeatId, target: Option<SeatId>) {
        self.state.pending_shot = None;
        self.emit(
            Some(hunter),
            EngineEventKind::ShotResolved { target },
            Audience::Public,
        );
        self.reset_speaker_timer();
        if let Some(target) = target {
            info!(%hunter, %target, "Hunter fires");
            self.kill(target, DeathCause::Shot);
            self.check_win();
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Timers
    // ─────────────────────────────────────────────────────────────

    /// Advances the phase and speaker timers by `elapsed`.
    ///
    /// An expired speaker timer passes the floor on; an expired phase timer
    /// closes the phase exactly as [`Self::advance`] would.
    #[instrument(skip(self), fields(phase = %self.state.phase))]
    pub fn tick(&mut self, elapsed: Duration) -> Tick {
        if !self.state.phase.is_timed() {
            return Tick::Idle;
        }
        let remaining = self.state.remaining.map(|r| r.saturating_sub(elapsed));
        self.state.remaining = remaining;
        let speaker = self
            .state
            .speaker_remaining
            .map(|r| r.saturating_sub(elapsed));
        self.state.speaker_remaining = speaker;

        if remaining == Some(Duration::ZERO) {
            debug!("Phase timer expired");
            return match self.advance() {
                Ok(phase) => Tick::Advanced(phase),
                Err(_) => Tick::Idle,
            };
        }
        if speaker == Some(Duration::ZERO)
            && let Some(seat) = self.time_out_speaker()
        {
            return Tick::SpeakerTimedOut(seat);
        }
        Tick::Running
    }

    /// Takes the floor from whoever holds it: a pending hunter holds fire,
    /// a speaker loses the turn. Returns the seat that timed out.
    #[instrument(skip(self), fields(phase = %self.state.phase))]
    pub fn time_out_speaker(&mut self) -> Option<SeatId> {
        let seat = match self.state.phase {
            Phase::Discussion => match self.state.pending_shot {
                Some(hunter) => {
                    self.resolve_shot(hunter, None);
                    hunter
                }
                None => {
                    let seat = self.state.speaking_queue.pop_front()?;
                    self.emit(Some(seat), EngineEventKind::SpeakerTimedOut, Audience::Public);
                    seat
                }
            },
            Phase::LastWords if !self.state.last_words_spoken => {
                let seat = self.state.last_eliminated?;
                self.state.last_words_spoken = true;
                self.emit(Some(seat), EngineEventKind::SpeakerTimedOut, Audience::Public);
                seat
            }
            Phase::LastWords => {
                let hunter = self.state.pending_shot?;
                self.resolve_shot(hunter, None);
                hunter
            }
            _ => return None,
        };
        warn!(%seat, "Speaker timed out");
        self.reset_speaker_timer();
        Some(seat)
    }

    fn reset_speaker_timer(&mut self) {
        self.state.speaker_remaining = match self.state.phase {
            Phase::Discussion | Phase::LastWords => {
                Some(*self.state.settings.durations().per_speaker())
            }
            _ => None,
        };
    }

    // ─────────────────────────────────────────────────────────────
    //  Phase transitions
    // ─────────────────────────────────────────────────────────────

    /// Closes the current phase and enters the next one.
    ///
    /// Returns the phase entered, or [`ValidationError::GameOver`] once the
    /// match has ended.
    #[instrument(skip(self), fields(phase = %self.state.phase, day = self.state.day))]
    pub fn advance(&mut self) -> Result<Phase, ValidationError> {
        let before = cfg!(debug_assertions).then(|| self.state.clone());
        match self.state.phase {
            Phase::Preparation => self.prepare(),
            Phase::Night => self.close_night(),
            Phase::Discussion => {
                if let Some(hunter) = self.state.pending_shot {
                    self.resolve_shot(hunter, None);
                }
                self.state.speaking_queue.clear();
                self.enter(Phase::Voting);
            }
            Phase::Voting => self.close_vote(),
            Phase::LastWords => {
                if let Some(hunter) = self.state.pending_shot {
                    self.resolve_shot(hunter, None);
                }
                self.state.day += 1;
                self.enter(Phase::Night);
            }
            Phase::Over => return Err(ValidationError::GameOver),
        }
        if let Some(before) = before {
            self.verify(&before);
        }
        Ok(self.state.phase)
    }

    fn prepare(&mut self) {
        let roles = match self.dealt.take() {
            Some(roles) => roles,
            None => {
                let mut roles = self.state.settings.roles().expand();
                roles.shuffle(&mut self.rng);
                roles
            }
        };
        let human = *self.state.settings.human_seat();
        let human_name = self.state.settings.human_name().clone();

        self.state.players = roles
            .into_iter()
            .enumerate()
            .map(|(i, role)| {
                let seat = SeatId(i);
                if human == Some(seat) {
                    Player::new(seat, human_name.clone(), role, true, None)
                } else {
                    let personality = Personality::random(&mut self.rng);
                    Player::new(seat, SEAT_NAMES[i % SEAT_NAMES.len()], role, false, Some(personality))
                }
            })
            .collect();
        self.state.potions = self
            .state
            .players
            .iter()
            .filter(|p| p.role() == RoleKind::Witch)
            .map(|p| (p.seat(), WitchPotions::default()))
            .collect();

        info!(seats = self.state.players.len(), "Roles assigned");
        self.emit(
            None,
            EngineEventKind::RolesAssigned {
                seats: self.state.players.len(),
            },
            Audience::Public,
        );
        self.state.day = 1;
        self.enter(Phase::Night);
    }

    fn close_night(&mut self) {
        let report = resolve_night(&self.state.night, &self.state.players, self.state.day);
        info!(
            target = ?report.wolf_target,
            saved = ?report.saved,
            deaths = report.deaths.len(),
            "Night resolved"
        );

        for inspection in &report.inspections {
            self.state
                .inspections
                .entry(inspection.seer)
                .or_default()
                .push((inspection.target, inspection.faction));
            self.emit(
                Some(inspection.seer),
                EngineEventKind::InspectionDelivered {
                    target: inspection.target,
                    faction: inspection.faction,
                },
                Audience::Seats(vec![inspection.seer]),
            );
        }
        for death in &report.deaths {
            self.kill(death.seat, death.cause);
        }
        self.emit(
            None,
            EngineEventKind::NightResolved {
                deaths: report.deaths.iter().map(|d| d.seat).collect(),
            },
            Audience::Public,
        );

        if self.check_win() {
            return;
        }
        if let Some(hunter) = report.hunter_trigger {
            self.state.pending_shot = Some(hunter);
            self.emit(Some(hunter), EngineEventKind::ShotPending, Audience::Public);
        }
        self.enter(Phase::Discussion);
    }

    fn close_vote(&mut self) {
        let outcome = tally(&self.state.votes);
        let votes = std::mem::take(&mut self.state.votes);
        self.state.vote_history.extend(votes);
        self.state.abstained.clear();
        info!(eliminated = ?outcome.eliminated, "Vote closed");
        self.emit(
            outcome.eliminated,
            EngineEventKind::VoteClosed {
                eliminated: outcome.eliminated,
            },
            Audience::Public,
        );

        let Some(eliminated) = outcome.eliminated else {
            self.state.day += 1;
            self.enter(Phase::Night);
            return;
        };

        self.kill(eliminated, DeathCause::Vote);
        self.state.last_eliminated = Some(eliminated);
        if self.check_win() {
            return;
        }
        let is_hunter = self
            .state
            .player(eliminated)
            .is_some_and(|p| p.role() == RoleKind::Hunter);
        if is_hunter {
            self.state.pending_shot = Some(eliminated);
            self.emit(Some(eliminated), EngineEventKind::ShotPending, Audience::Public);
        }
        self.enter(Phase::LastWords);
    }

    fn enter(&mut self, to: Phase) {
        let from = self.state.phase;
        self.state.phase = to;
        let durations = *self.state.settings.durations();
        self.state.remaining = match to {
            Phase::Night => Some(*durations.night()),
            Phase::Discussion => Some(*durations.discussion()),
            Phase::Voting => Some(*durations.voting()),
            Phase::LastWords => Some(*durations.last_words()),
            Phase::Preparation | Phase::Over => None,
        };

        match to {
            Phase::Night => self.state.night = NightLedger::default(),
            Phase::Discussion => self.state.speaking_queue = self.speaking_order().into(),
            Phase::LastWords => self.state.last_words_spoken = false,
            Phase::Preparation | Phase::Voting | Phase::Over => {}
        }
        self.reset_speaker_timer();

        debug!(%from, %to, day = self.state.day, "Phase changed");
        self.emit(None, EngineEventKind::PhaseChanged { from, to }, Audience::Public);
    }

    /// Living seats in seat order, with the human moved to its configured slot.
    fn speaking_order(&self) -> Vec<SeatId> {
        let mut order: Vec<SeatId> = self.state.living().map(Player::seat).collect();
        let human = *self.state.settings.human_seat();
        let slot = *self.state.settings.human_speaking_slot();
        if let (Some(human), Some(slot)) = (human, slot)
            && let Some(position) = order.iter().position(|s| *s == human)
        {
            order.remove(position);
            order.insert(slot.min(order.len()), human);
        }
        order
    }

    fn kill(&mut self, seat: SeatId, cause: DeathCause) {
        let Some(player) = self.state.players.get_mut(seat.index()) else {
            return;
        };
        if !player.kill() {
            return;
        }
        let role = player.role();
        self.state.dead.push(Death { seat, cause });
        self.state.speaking_queue.retain(|s| *s != seat);
        info!(%seat, %cause, "Seat died");
        let revealed = (*self.state.settings.reveal_roles_on_death()).then_some(role);
        self.emit(
            Some(seat),
            EngineEventKind::Died {
                cause,
                role: revealed,
            },
            Audience::Public,
        );
    }

    /// Ends the match if a faction has won. Returns whether it ended.
    fn check_win(&mut self) -> bool {
        let Some(winner) = check_winner(&self.state.players, *self.state.settings.win_policy())
        else {
            return false;
        };
        info!(%winner, day = self.state.day, "Match over");
        self.state.winner = Some(winner);
        self.state.pending_shot = None;
        self.state.speaking_queue.clear();
        self.emit(None, EngineEventKind::GameOver { winner }, Audience::Public);
        self.enter(Phase::Over);
        true
    }

    fn living_wolves(&self) -> Vec<SeatId> {
        self.state
            .living()
            .filter(|p| p.faction() == Faction::Werewolf)
            .map(Player::seat)
            .collect()
    }

    fn emit(&mut self, seat: Option<SeatId>, kind: EngineEventKind, audience: Audience) {
        self.events.push(EngineEvent {
            day: self.state.day,
            phase: self.state.phase,
            seat,
            kind,
            audience,
            timestamp: Utc::now(),
        });
    }

    fn verify(&self, before: &GameState) {
        if let Err(violations) = ActionContract::post(before, &self.state) {
            for violation in violations {
                error!(%violation, "Invariant violated");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Speech;
    use crate::settings::PhaseDurations;

    fn eight_seats() -> Vec<RoleKind> {
        vec![
            RoleKind::Werewolf,
            RoleKind::Werewolf,
            RoleKind::Seer,
            RoleKind::Witch,
            RoleKind::Guard,
            RoleKind::Hunter,
            RoleKind::Villager,
            RoleKind::Villager,
        ]
    }

    fn started(settings: MatchSettings) -> GamePhaseEngine {
        let mut engine = GamePhaseEngine::with_roles(settings, eight_seats()).unwrap();
        assert_eq!(engine.advance().unwrap(), Phase::Night);
        engine
    }

    #[test]
    fn test_preparation_deals_and_enters_night() {
        let engine = started(MatchSettings::new(8).with_seed(1));
        assert_eq!(engine.state().day(), 1);
        assert_eq!(engine.state().players().len(), 8);
        assert!(engine.check_invariants().is_ok());
        assert_eq!(engine.state().potions(SeatId(3)), Some(WitchPotions::default()));
    }

    #[test]
    fn test_wolf_cannot_target_ally() {
        let mut engine = started(MatchSettings::new(8));
        let err = engine
            .apply_action(
                SeatId(0),
                Action::NightAbility(NightAbility::new(AbilityKind::Kill, SeatId(1))),
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::IllegalTarget { .. }));
    }

    #[test]
    fn test_one_ability_per_night() {
        let mut engine = started(MatchSettings::new(8));
        let inspect = |t| Action::NightAbility(NightAbility::new(AbilityKind::Inspect, SeatId(t)));
        engine.apply_action(SeatId(2), inspect(0)).unwrap();
        assert_eq!(
            engine.apply_action(SeatId(2), inspect(1)),
            Err(ValidationError::AlreadyActed(SeatId(2)))
        );
    }

    #[test]
    fn test_heal_requires_current_victim() {
        let mut engine = started(MatchSettings::new(8));
        let heal = Action::NightAbility(NightAbility::new(AbilityKind::Heal, SeatId(6)));
        assert!(matches!(
            engine.apply_action(SeatId(3), heal.clone()),
            Err(ValidationError::IllegalTarget { .. })
        ));
        engine
            .apply_action(
                SeatId(0),
                Action::NightAbility(NightAbility::new(AbilityKind::Kill, SeatId(6))),
            )
            .unwrap();
        assert_eq!(engine.wolf_target(), Some(SeatId(6)));
        engine.apply_action(SeatId(3), heal).unwrap();
        assert_eq!(engine.state().potions(SeatId(3)).map(|p| p.heal), Some(false));
        engine.advance().unwrap();
        assert!(engine.state().is_alive(SeatId(6)));
    }

    #[test]
    fn test_villager_cannot_act_at_night() {
        let mut engine = started(MatchSettings::new(8));
        assert!(matches!(
            engine.apply_action(SeatId(6), Action::Pass),
            Err(ValidationError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_discussion_queue_enforces_order() {
        let mut engine = started(MatchSettings::new(8));
        engine.advance().unwrap();
        assert_eq!(engine.state().phase(), Phase::Discussion);
        assert_eq!(engine.state().current_speaker(), Some(SeatId(0)));
        assert_eq!(
            engine.apply_action(SeatId(1), Action::Speak(Speech::new("hi", None))),
            Err(ValidationError::NotYourTurn(SeatId(1)))
        );
        engine
            .apply_action(SeatId(0), Action::Speak(Speech::new("hello", None)))
            .unwrap();
        assert_eq!(engine.state().current_speaker(), Some(SeatId(1)));
        engine.apply_action(SeatId(1), Action::Pass).unwrap();
        assert_eq!(engine.state().current_speaker(), Some(SeatId(2)));
    }

    #[test]
    fn test_human_speaking_slot_reorders_queue() {
        let settings = MatchSettings::new(8)
            .with_human_seat(SeatId(6))
            .with_human_speaking_slot(0);
        let mut engine = started(settings);
        engine.advance().unwrap();
        assert_eq!(engine.state().current_speaker(), Some(SeatId(6)));
        engine.apply_human_action(Action::Pass).unwrap();
        assert_eq!(engine.state().current_speaker(), Some(SeatId(0)));
    }

    #[test]
    fn test_speaker_timer_skips_speaker() {
        let durations = PhaseDurations::uniform(Duration::from_secs(60))
            .with_per_speaker(Duration::from_secs(10));
        let mut engine = started(MatchSettings::new(8).with_durations(durations));
        engine.advance().unwrap();
        assert_eq!(engine.tick(Duration::from_secs(4)), Tick::Running);
        assert_eq!(
            engine.tick(Duration::from_secs(6)),
            Tick::SpeakerTimedOut(SeatId(0))
        );
        assert_eq!(engine.state().current_speaker(), Some(SeatId(1)));
        assert_eq!(
            engine.state().speaker_remaining(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_phase_timer_advances() {
        let mut engine = started(
            MatchSettings::new(8).with_durations(PhaseDurations::uniform(Duration::from_secs(5))),
        );
        assert_eq!(
            engine.tick(Duration::from_secs(5)),
            Tick::Advanced(Phase::Discussion)
        );
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let mut engine = started(MatchSettings::new(8));
        engine.advance().unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.state().phase(), Phase::Voting);
        engine.apply_action(SeatId(2), Action::Vote(SeatId(0))).unwrap();
        assert_eq!(
            engine.apply_action(SeatId(2), Action::Vote(SeatId(1))),
            Err(ValidationError::AlreadyVoted(SeatId(2)))
        );
    }

    #[test]
    fn test_empty_vote_goes_to_next_night() {
        let mut engine = started(MatchSettings::new(8));
        engine.advance().unwrap();
        engine.advance().unwrap();
        assert_eq!(engine.advance().unwrap(), Phase::Night);
        assert_eq!(engine.state().day(), 2);
        assert!(engine.state().dead().is_empty());
    }

    #[test]
    fn test_voted_hunter_speaks_then_shoots() {
        let mut engine = started(MatchSettings::new(8));
        engine.advance().unwrap();
        engine.advance().unwrap();
        engine.apply_action(SeatId(0), Action::Vote(SeatId(5))).unwrap();
        assert_eq!(engine.advance().unwrap(), Phase::LastWords);
        assert_eq!(engine.state().pending_shot(), Some(SeatId(5)));
        assert_eq!(engine.state().current_speaker(), Some(SeatId(5)));

        engine
            .apply_action(SeatId(5), Action::Speak(Speech::new("it was seat 1", None)))
            .unwrap();
        assert!(!engine.phase_complete());
        engine.apply_action(SeatId(5), Action::Shoot(SeatId(1))).unwrap();
        assert!(!engine.state().is_alive(SeatId(1)));
        assert!(engine.phase_complete());
        assert_eq!(engine.advance().unwrap(), Phase::Night);
    }

    #[test]
    fn test_advance_after_over_is_rejected() {
        let mut engine = started(MatchSettings::new(8));
        engine.advance().unwrap();
        engine.advance().unwrap();
        engine.apply_action(SeatId(2), Action::Vote(SeatId(0))).unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        engine
            .apply_action(
                SeatId(3),
                Action::NightAbility(NightAbility::new(AbilityKind::Poison, SeatId(1))),
            )
            .unwrap();
        assert_eq!(engine.advance().unwrap(), Phase::Over);
        assert_eq!(engine.state().winner(), Some(Faction::Villager));
        assert_eq!(engine.advance(), Err(ValidationError::GameOver));
        assert!(engine.check_invariants().is_ok());
    }
}
