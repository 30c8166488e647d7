//! Contract-based validation for werewolf actions.
//!
//! Preconditions decide whether a seat may take an action in the current
//! state. Postconditions check that a transition kept the game invariants.

use crate::action::{Action, NightAbility, ValidationError};
use crate::invariants::{InvariantSet, InvariantViolation, WerewolfInvariants};
use crate::roles::{AbilityKind, Faction};
use crate::types::{GameState, Phase, SeatId};
use tracing::instrument;

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), ValidationError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), Vec<InvariantViolation>>;
}

// ─────────────────────────────────────────────────────────────
//  Seat Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the seat exists.
pub struct SeatExists;

impl SeatExists {
    /// Fails with [`ValidationError::UnknownSeat`].
    pub fn check(state: &GameState, seat: SeatId) -> Result<(), ValidationError> {
        state
            .player(seat)
            .map(|_| ())
            .ok_or(ValidationError::UnknownSeat(seat))
    }
}

/// Precondition: the acting seat is alive.
pub struct ActorAlive;

impl ActorAlive {
    /// Fails with [`ValidationError::ActorDead`].
    pub fn check(state: &GameState, seat: SeatId) -> Result<(), ValidationError> {
        if state.is_alive(seat) {
            Ok(())
        } else {
            Err(ValidationError::ActorDead(seat))
        }
    }
}

/// Precondition: the target exists and is alive.
pub struct TargetAlive;

impl TargetAlive {
    /// Fails with [`ValidationError::UnknownSeat`] or [`ValidationError::TargetDead`].
    pub fn check(state: &GameState, target: SeatId) -> Result<(), ValidationError> {
        SeatExists::check(state, target)?;
        if state.is_alive(target) {
            Ok(())
        } else {
            Err(ValidationError::TargetDead(target))
        }
    }
}

/// Precondition: the seat holds the floor.
///
/// In the discussion that is the head of the speaking queue; in last words
/// it is the eliminated seat until it has spoken.
pub struct HoldsFloor;

impl HoldsFloor {
    /// Fails with [`ValidationError::ShotPending`] or [`ValidationError::NotYourTurn`].
    pub fn check(state: &GameState, seat: SeatId) -> Result<(), ValidationError> {
        if state.phase() == Phase::Discussion
            && let Some(hunter) = state.pending_shot()
        {
            return Err(ValidationError::ShotPending(hunter));
        }
        if state.current_speaker() == Some(seat) {
            Ok(())
        } else {
            Err(ValidationError::NotYourTurn(seat))
        }
    }
}

/// Precondition: the seat has not voted or abstained yet.
pub struct HasNotVoted;

impl HasNotVoted {
    /// Fails with [`ValidationError::AlreadyVoted`].
    pub fn check(state: &GameState, seat: SeatId) -> Result<(), ValidationError> {
        if state.votes().iter().any(|v| v.voter == seat) || state.abstained.contains(&seat) {
            Err(ValidationError::AlreadyVoted(seat))
        } else {
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Night Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the seat's role may use the ability on the target tonight.
pub struct AbilityLegal;

impl AbilityLegal {
    /// Checks role, once-per-night use, potions and target rules.
    #[instrument(skip(state))]
    pub fn check(
        state: &GameState,
        seat: SeatId,
        ability: &NightAbility,
    ) -> Result<(), ValidationError> {
        let role = state
            .player(seat)
            .map(|p| p.role())
            .ok_or(ValidationError::UnknownSeat(seat))?;
        if !role.has_ability(ability.kind) {
            return Err(ValidationError::AbilityMismatch {
                seat,
                kind: ability.kind,
            });
        }
        if state.night().has_acted(seat) {
            return Err(ValidationError::AlreadyActed(seat));
        }
        TargetAlive::check(state, ability.target)?;

        let illegal = |reason| ValidationError::IllegalTarget {
            seat,
            target: ability.target,
            reason,
        };
        let potions = state.potions(seat).unwrap_or_default();
        let spent = ValidationError::PotionSpent {
            seat,
            kind: ability.kind,
        };

        match ability.kind {
            AbilityKind::Kill => {
                let target_is_wolf = state
                    .player(ability.target)
                    .is_some_and(|p| p.faction() == Faction::Werewolf);
                if target_is_wolf {
                    return Err(illegal("wolves cannot attack the pack"));
                }
            }
            AbilityKind::Inspect => {
                if ability.target == seat {
                    return Err(illegal("cannot inspect yourself"));
                }
            }
            AbilityKind::Heal => {
                if !potions.heal {
                    return Err(spent);
                }
                if state.night().wolf_target() != Some(ability.target) {
                    return Err(illegal("the potion only saves tonight's victim"));
                }
            }
            AbilityKind::Poison => {
                if !potions.poison {
                    return Err(spent);
                }
                if ability.target == seat {
                    return Err(illegal("cannot poison yourself"));
                }
            }
            AbilityKind::Protect => {}
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Composite Precondition
// ─────────────────────────────────────────────────────────────

/// Composite precondition: everything a seat must satisfy to act.
pub struct LegalAction;

impl LegalAction {
    /// Validates `action` from `seat` against the current state.
    #[instrument(skip(state, action), fields(phase = %state.phase(), action = action.label()))]
    pub fn check(state: &GameState, seat: SeatId, action: &Action) -> Result<(), ValidationError> {
        if state.phase() == Phase::Over {
            return Err(ValidationError::GameOver);
        }
        SeatExists::check(state, seat)?;

        let wrong_phase = || ValidationError::WrongPhase {
            phase: state.phase(),
            action: action.label(),
        };

        match (state.phase(), action) {
            (Phase::Discussion | Phase::LastWords, Action::Shoot(target)) => {
                if state.pending_shot() != Some(seat) {
                    return Err(ValidationError::NoPendingShot(seat));
                }
                TargetAlive::check(state, *target)?;
                if *target == seat {
                    return Err(ValidationError::IllegalTarget {
                        seat,
                        target: *target,
                        reason: "cannot shoot yourself",
                    });
                }
                Ok(())
            }
            (Phase::Discussion | Phase::LastWords, Action::HoldFire) => {
                if state.pending_shot() == Some(seat) {
                    Ok(())
                } else {
                    Err(ValidationError::NoPendingShot(seat))
                }
            }
            (Phase::LastWords, Action::Speak(_) | Action::Pass) => HoldsFloor::check(state, seat),
            (Phase::Discussion, Action::Speak(_) | Action::Pass) => {
                ActorAlive::check(state, seat)?;
                HoldsFloor::check(state, seat)
            }
            (Phase::Voting, Action::Vote(target)) => {
                ActorAlive::check(state, seat)?;
                HasNotVoted::check(state, seat)?;
                TargetAlive::check(state, *target)?;
                if *target == seat {
                    return Err(ValidationError::IllegalTarget {
                        seat,
                        target: *target,
                        reason: "cannot vote for yourself",
                    });
                }
                Ok(())
            }
            (Phase::Voting, Action::Pass) => {
                ActorAlive::check(state, seat)?;
                HasNotVoted::check(state, seat)
            }
            (Phase::Night, Action::NightAbility(ability)) => {
                ActorAlive::check(state, seat)?;
                AbilityLegal::check(state, seat, ability)
            }
            (Phase::Night, Action::Pass) => {
                ActorAlive::check(state, seat)?;
                let acts = state.player(seat).is_some_and(|p| p.role().acts_at_night());
                if !acts {
                    return Err(wrong_phase());
                }
                if state.night().has_acted(seat) {
                    return Err(ValidationError::AlreadyActed(seat));
                }
                Ok(())
            }
            _ => Err(wrong_phase()),
        }
    }
}

// ─────────────────────────────────────────────────────────────
//  Action Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for seat actions and phase transitions.
pub struct ActionContract;

impl Contract<GameState, (SeatId, Action)> for ActionContract {
    fn pre(state: &GameState, (seat, action): &(SeatId, Action)) -> Result<(), ValidationError> {
        LegalAction::check(state, *seat, action)
    }

    fn post(before: &GameState, after: &GameState) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        let revived = before
            .players()
            .iter()
            .zip(after.players())
            .any(|(b, a)| !b.is_alive() && a.is_alive());
        if revived {
            violations.push(InvariantViolation::new("A dead seat came back to life"));
        }
        if after.day() < before.day() {
            violations.push(InvariantViolation::new("The day counter went backwards"));
        }
        if let Err(mut found) = WerewolfInvariants::check_all(after) {
            violations.append(&mut found);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
