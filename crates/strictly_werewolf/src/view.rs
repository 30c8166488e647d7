//! What one seat is allowed to know.

use crate::roles::{Faction, RoleKind};
use crate::types::{
    GameState, Personality, Phase, SeatId, SpeechRecord, VoteRecord, WitchPotions,
};
use serde::{Deserialize, Serialize};

/// A seat as every other seat sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSeat {
    /// Seat index.
    pub seat: SeatId,
    /// Display name.
    pub name: String,
    /// Alive or dead.
    pub alive: bool,
    /// Role, once revealed by death.
    pub revealed_role: Option<RoleKind>,
    /// Whether the seat is the human.
    pub is_human: bool,
}

/// Game state filtered to one seat's knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    /// Viewing seat.
    pub seat: SeatId,
    /// Viewer's own role.
    pub role: RoleKind,
    /// Viewer's personality, for AI seats.
    pub personality: Option<Personality>,
    /// Current day.
    pub day: u32,
    /// Current phase.
    pub phase: Phase,
    /// Every seat's public face.
    pub roster: Vec<PublicSeat>,
    /// Fellow wolves, for wolves only.
    pub allies: Vec<SeatId>,
    /// Votes of the open voting phase.
    pub votes: Vec<VoteRecord>,
    /// Votes of closed voting phases.
    pub vote_history: Vec<VoteRecord>,
    /// Every speech so far.
    pub speeches: Vec<SpeechRecord>,
    /// Tonight's wolf victim, for the witch during the night.
    pub wolf_target: Option<SeatId>,
    /// Unused potions, for the witch.
    pub potions: Option<WitchPotions>,
    /// Findings received, for the seer.
    pub inspections: Vec<(SeatId, Faction)>,
}

impl SeatView {
    /// Builds the view of `seat`, or `None` if the seat does not exist.
    pub fn of(state: &GameState, seat: SeatId) -> Option<Self> {
        let me = state.player(seat)?;
        let reveal = state.settings().reveal_roles_on_death();
        let roster = state
            .players()
            .iter()
            .map(|p| PublicSeat {
                seat: p.seat(),
                name: p.name().to_string(),
                alive: p.is_alive(),
                revealed_role: (!p.is_alive() && *reveal).then_some(p.role()),
                is_human: p.is_human(),
            })
            .collect();

        let allies = if me.role() == RoleKind::Werewolf {
            state
                .players()
                .iter()
                .filter(|p| p.role() == RoleKind::Werewolf && p.seat() != seat)
                .map(|p| p.seat())
                .collect()
        } else {
            Vec::new()
        };

        let wolf_target = (me.role() == RoleKind::Witch && state.phase() == Phase::Night)
            .then(|| state.night().wolf_target())
            .flatten();

        Some(Self {
            seat,
            role: me.role(),
            personality: me.personality().copied(),
            day: state.day(),
            phase: state.phase(),
            roster,
            allies,
            votes: state.votes().to_vec(),
            vote_history: state.vote_history().to_vec(),
            speeches: state.speeches().to_vec(),
            wolf_target,
            potions: state.potions(seat),
            inspections: state.inspections(seat).to_vec(),
        })
    }

    /// Viewer's faction.
    pub fn faction(&self) -> Faction {
        self.role.faction()
    }

    /// Whether `seat` is alive.
    pub fn is_alive(&self, seat: SeatId) -> bool {
        self.roster.get(seat.index()).is_some_and(|p| p.alive)
    }

    /// Living seats in seat order.
    pub fn living(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.roster.iter().filter(|p| p.alive).map(|p| p.seat)
    }

    /// Living seats other than the viewer.
    pub fn living_others(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.living().filter(move |s| *s != self.seat)
    }

    /// Whether `seat` is a known ally.
    pub fn is_ally(&self, seat: SeatId) -> bool {
        self.allies.contains(&seat)
    }

    /// Display name of `seat`.
    pub fn name_of(&self, seat: SeatId) -> &str {
        self.roster
            .get(seat.index())
            .map(|p| p.name.as_str())
            .unwrap_or("unknown")
    }

    /// Role a dead seat was revealed to hold.
    pub fn revealed_role(&self, seat: SeatId) -> Option<RoleKind> {
        self.roster.get(seat.index()).and_then(|p| p.revealed_role)
    }

    /// Speeches made on the current day.
    pub fn speeches_today(&self) -> impl Iterator<Item = &SpeechRecord> + '_ {
        self.speeches.iter().filter(move |s| s.day == self.day)
    }
}

impl GameState {
    /// View of the game from `seat`.
    pub fn view_for(&self, seat: SeatId) -> Option<SeatView> {
        SeatView::of(self, seat)
    }
}
