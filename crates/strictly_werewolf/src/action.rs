//! First-class action types.
//!
//! Actions are domain events, not side effects. Human and AI seats submit
//! the same [`Action`] values and both pass the same validation.

use crate::roles::AbilityKind;
use crate::types::{Phase, SeatId, SpeechKind};
use serde::{Deserialize, Serialize};

/// A night ability aimed at a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct NightAbility {
    /// Ability used.
    pub kind: AbilityKind,
    /// Seat it is aimed at.
    pub target: SeatId,
}

impl std::fmt::Display for NightAbility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.target)
    }
}

/// Text spoken by a seat, with its meaning when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    /// Text shown to the table.
    pub text: String,
    /// Meaning of the text.
    pub kind: Option<SpeechKind>,
}

impl Speech {
    /// Speech whose meaning is known.
    pub fn new(text: impl Into<String>, kind: Option<SpeechKind>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Anything a seat can submit to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Vote to eliminate a seat.
    Vote(SeatId),
    /// Use a night ability.
    NightAbility(NightAbility),
    /// Speak during the discussion or last words.
    Speak(Speech),
    /// Give up the current turn: skip speaking, abstain from voting,
    /// or skip a night ability.
    Pass,
    /// Fire the hunter's shot.
    Shoot(SeatId),
    /// Decline the hunter's shot.
    HoldFire,
}

impl Action {
    /// Short label used in logs and rejections.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Vote(_) => "vote",
            Action::NightAbility(_) => "night ability",
            Action::Speak(_) => "speak",
            Action::Pass => "pass",
            Action::Shoot(_) => "shoot",
            Action::HoldFire => "hold fire",
        }
    }

    /// Seat the action is aimed at, if any.
    pub fn target(&self) -> Option<SeatId> {
        match self {
            Action::Vote(t) | Action::Shoot(t) => Some(*t),
            Action::NightAbility(ability) => Some(ability.target),
            Action::Speak(_) | Action::Pass | Action::HoldFire => None,
        }
    }
}

/// Actions from the human seat are ordinary actions.
pub type HumanAction = Action;

/// What a strategy wants to do, before it becomes an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Accuse a seat.
    Accusation(SeatId),
    /// Defend oneself.
    Defense,
    /// Share information.
    Information(Option<crate::types::RoleClaim>),
    /// Comment on strategy.
    StrategyComment,
    /// Vote for a seat.
    Vote(SeatId),
    /// Use a night ability.
    NightAbility(NightAbility),
}

impl Intent {
    /// Speech meaning, for speech intents.
    pub fn speech_kind(&self) -> Option<SpeechKind> {
        match *self {
            Intent::Accusation(target) => Some(SpeechKind::Accusation(target)),
            Intent::Defense => Some(SpeechKind::Defense),
            Intent::Information(claim) => Some(SpeechKind::Information(claim)),
            Intent::StrategyComment => Some(SpeechKind::StrategyComment),
            Intent::Vote(_) | Intent::NightAbility(_) => None,
        }
    }

    /// Seat the intent concerns, if any.
    pub fn target(&self) -> Option<SeatId> {
        match *self {
            Intent::Accusation(t) | Intent::Vote(t) => Some(t),
            Intent::NightAbility(ability) => Some(ability.target),
            Intent::Information(Some(claim)) => claim.finding.map(|(seat, _)| seat),
            Intent::Information(None) | Intent::Defense | Intent::StrategyComment => None,
        }
    }
}

/// An intent with the strategy's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// What to do.
    pub intent: Intent,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Decision {
    /// Creates a decision, clamping confidence into `[0, 1]`.
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The engine action for vote and night intents. Speech intents need
    /// text first and return `None`.
    pub fn action(&self) -> Option<Action> {
        match self.intent {
            Intent::Vote(target) => Some(Action::Vote(target)),
            Intent::NightAbility(ability) => Some(Action::NightAbility(ability)),
            _ => None,
        }
    }
}

/// Why an action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ValidationError {
    /// No seat with that index.
    #[display("{} does not exist", _0)]
    UnknownSeat(SeatId),

    /// Dead seats cannot act.
    #[display("{} is dead", _0)]
    ActorDead(SeatId),

    /// The target is already dead.
    #[display("target {} is dead", _0)]
    TargetDead(SeatId),

    /// The action is not allowed in the current phase.
    #[display("cannot {} during {}", action, phase)]
    WrongPhase {
        /// Current phase.
        phase: Phase,
        /// Rejected action label.
        action: &'static str,
    },

    /// Someone else holds the floor.
    #[display("it is not {}'s turn to speak", _0)]
    NotYourTurn(SeatId),

    /// The seat's role lacks the ability.
    #[display("{} cannot {}", seat, kind)]
    AbilityMismatch {
        /// Acting seat.
        seat: SeatId,
        /// Requested ability.
        kind: AbilityKind,
    },

    /// The seat already voted this phase.
    #[display("{} has already voted", _0)]
    AlreadyVoted(SeatId),

    /// The seat already used its ability tonight.
    #[display("{} has already acted tonight", _0)]
    AlreadyActed(SeatId),

    /// The witch's potion is gone.
    #[display("{} has no {} potion left", seat, kind)]
    PotionSpent {
        /// Witch seat.
        seat: SeatId,
        /// Potion requested.
        kind: AbilityKind,
    },

    /// The target is not a legal choice for this action.
    #[display("{} cannot target {}: {}", seat, target, reason)]
    IllegalTarget {
        /// Acting seat.
        seat: SeatId,
        /// Rejected target.
        target: SeatId,
        /// Rule that was broken.
        reason: &'static str,
    },

    /// No hunter shot is pending for this seat.
    #[display("{} has no shot to take", _0)]
    NoPendingShot(SeatId),

    /// The table waits for a hunter to shoot.
    #[display("waiting for {} to take the hunter's shot", _0)]
    ShotPending(SeatId),

    /// The match has no human seat.
    #[display("this match has no human seat")]
    NoHumanSeat,

    /// The match is over.
    #[display("the match is over")]
    GameOver,
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_clamps_confidence() {
        let decision = Decision::new(Intent::Vote(SeatId(2)), 1.7);
        assert_eq!(decision.confidence, 1.0);
        assert_eq!(decision.action(), Some(Action::Vote(SeatId(2))));
    }

    #[test]
    fn test_speech_intents_have_no_direct_action() {
        let decision = Decision::new(Intent::Accusation(SeatId(1)), 0.6);
        assert_eq!(decision.action(), None);
        assert_eq!(
            decision.intent.speech_kind(),
            Some(SpeechKind::Accusation(SeatId(1)))
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::IllegalTarget {
            seat: SeatId(0),
            target: SeatId(3),
            reason: "wolves cannot attack the pack",
        };
        assert_eq!(
            err.to_string(),
            "seat 0 cannot target seat 3: wolves cannot attack the pack"
        );
    }
}
