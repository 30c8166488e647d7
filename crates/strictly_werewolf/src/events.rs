//! Events emitted by the phase engine.
//!
//! Every state change produces one event. Public events may be shown to
//! every seat; private ones reach only the seats named by [`EngineEvent::audience`].

use crate::roles::{AbilityKind, Faction, RoleKind};
use crate::types::{DeathCause, Phase, SeatId, SpeechKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEventKind {
    /// Roles were dealt.
    RolesAssigned {
        /// Number of seats.
        seats: usize,
    },
    /// The phase changed.
    PhaseChanged {
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
    },
    /// A night ability was accepted.
    NightActionAccepted {
        /// Ability used.
        kind: AbilityKind,
        /// Target seat.
        target: SeatId,
    },
    /// A seat skipped its night ability.
    NightActionSkipped,
    /// The night closed.
    NightResolved {
        /// Seats that died overnight.
        deaths: Vec<SeatId>,
    },
    /// A seer learned a faction.
    InspectionDelivered {
        /// Inspected seat.
        target: SeatId,
        /// Its faction.
        faction: Faction,
    },
    /// A seat spoke.
    Spoke {
        /// Text spoken.
        text: String,
        /// Meaning, when known.
        speech: Option<SpeechKind>,
    },
    /// A speaker gave up the floor.
    Passed,
    /// A speaker ran out of time.
    SpeakerTimedOut,
    /// A vote was cast.
    VoteCast {
        /// Seat voted for.
        target: SeatId,
    },
    /// The voting phase closed.
    VoteClosed {
        /// Eliminated seat, if anyone got a vote.
        eliminated: Option<SeatId>,
    },
    /// A seat died.
    Died {
        /// Cause of death.
        cause: DeathCause,
        /// Role, when roles are revealed on death.
        role: Option<RoleKind>,
    },
    /// A hunter may now shoot.
    ShotPending,
    /// The hunter fired or held fire.
    ShotResolved {
        /// Seat shot, if any.
        target: Option<SeatId>,
    },
    /// A faction won.
    GameOver {
        /// Winning faction.
        winner: Faction,
    },
}

/// Who may see an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Every seat.
    Public,
    /// Only these seats.
    Seats(Vec<SeatId>),
}

/// One engine event with its context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Day it happened on.
    pub day: u32,
    /// Phase it happened in.
    pub phase: Phase,
    /// Seat the event is about, if any.
    pub seat: Option<SeatId>,
    /// What happened.
    pub kind: EngineEventKind,
    /// Who may see it.
    pub audience: Audience,
    /// Wall-clock time.
    pub timestamp: DateTime<Utc>,
}

impl EngineEvent {
    /// Short snake-case name of the event kind.
    pub fn name(&self) -> &'static str {
        match self.kind {
            EngineEventKind::RolesAssigned { .. } => "roles_assigned",
            EngineEventKind::PhaseChanged { .. } => "phase_changed",
            EngineEventKind::NightActionAccepted { .. } => "night_action_accepted",
            EngineEventKind::NightActionSkipped => "night_action_skipped",
            EngineEventKind::NightResolved { .. } => "night_resolved",
            EngineEventKind::InspectionDelivered { .. } => "inspection_delivered",
            EngineEventKind::Spoke { .. } => "spoke",
            EngineEventKind::Passed => "passed",
            EngineEventKind::SpeakerTimedOut => "speaker_timed_out",
            EngineEventKind::VoteCast { .. } => "vote_cast",
            EngineEventKind::VoteClosed { .. } => "vote_closed",
            EngineEventKind::Died { .. } => "died",
            EngineEventKind::ShotPending => "shot_pending",
            EngineEventKind::ShotResolved { .. } => "shot_resolved",
            EngineEventKind::GameOver { .. } => "game_over",
        }
    }

    /// Whether every seat may see the event.
    pub fn is_public(&self) -> bool {
        self.audience == Audience::Public
    }

    /// Whether `seat` may see the event.
    pub fn visible_to(&self, seat: SeatId) -> bool {
        match &self.audience {
            Audience::Public => true,
            Audience::Seats(seats) => seats.contains(&seat),
        }
    }
}
