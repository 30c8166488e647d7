//! Match settings: seat count, role distribution, phase timers and policies.

use crate::roles::RoleKind;
use crate::types::SeatId;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Smallest table the engine accepts.
pub const MIN_SEATS: usize = 4;
/// Largest table the engine accepts.
pub const MAX_SEATS: usize = 16;

/// Condition under which a faction wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum WinPolicy {
    /// Villagers win at zero wolves; wolves win at zero non-wolves.
    #[default]
    #[display("elimination")]
    Elimination,
    /// Villagers win at zero wolves; wolves win once they match the non-wolves.
    #[display("wolf parity")]
    WolfParity,
}

/// How many seats hold each role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleDistribution(BTreeMap<RoleKind, usize>);

impl RoleDistribution {
    /// Creates an empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` seats of `role`.
    pub fn with(mut self, role: RoleKind, count: usize) -> Self {
        if count > 0 {
            *self.0.entry(role).or_insert(0) += count;
        }
        self
    }

    /// Number of seats holding `role`.
    pub fn count(&self, role: RoleKind) -> usize {
        self.0.get(&role).copied().unwrap_or(0)
    }

    /// Total number of roles in the distribution.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Number of wolf seats.
    pub fn wolves(&self) -> usize {
        self.count(RoleKind::Werewolf)
    }

    /// Iterates `(role, count)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (RoleKind, usize)> + '_ {
        self.0.iter().map(|(role, count)| (*role, *count))
    }

    /// Expands the distribution into one role per seat, in catalog order.
    pub fn expand(&self) -> Vec<RoleKind> {
        self.iter()
            .flat_map(|(role, count)| std::iter::repeat_n(role, count))
            .collect()
    }

    /// Default deal for a table of `seats`: roughly a quarter wolves,
    /// one seer and one witch, a guard from eight seats and a hunter from ten.
    #[instrument]
    pub fn standard(seats: usize) -> Self {
        let wolves = (seats / 4).max(1);
        let mut dist = Self::new().with(RoleKind::Werewolf, wolves).with(RoleKind::Seer, 1);
        if seats >= 6 {
            dist = dist.with(RoleKind::Witch, 1);
        }
        if seats >= 8 {
            dist = dist.with(RoleKind::Guard, 1);
        }
        if seats >= 10 {
            dist = dist.with(RoleKind::Hunter, 1);
        }
        let filled = dist.total();
        dist.with(RoleKind::Villager, seats.saturating_sub(filled))
    }
}

impl FromIterator<(RoleKind, usize)> for RoleDistribution {
    fn from_iter<T: IntoIterator<Item = (RoleKind, usize)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |dist, (role, count)| dist.with(role, count))
    }
}

/// Time budget of each timed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct PhaseDurations {
    /// Whole night, both rounds.
    night: Duration,
    /// Whole discussion.
    discussion: Duration,
    /// One speaker's turn in the discussion or last words.
    per_speaker: Duration,
    /// Voting window.
    voting: Duration,
    /// Last words of an eliminated seat, including a hunter shot.
    last_words: Duration,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            night: Duration::from_secs(60),
            discussion: Duration::from_secs(300),
            per_speaker: Duration::from_secs(45),
            voting: Duration::from_secs(60),
            last_words: Duration::from_secs(45),
        }
    }
}

impl PhaseDurations {
    /// Same budget for every phase; handy for tests.
    pub fn uniform(duration: Duration) -> Self {
        Self {
            night: duration,
            discussion: duration,
            per_speaker: duration,
            voting: duration,
            last_words: duration,
        }
    }
}

/// Everything needed to start a match.
#[derive(Debug, Clone, PartialEq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct MatchSettings {
    /// Number of seats at the table.
    seats: usize,
    /// Roles dealt to the seats.
    roles: RoleDistribution,
    /// Seat played by the human, if any.
    #[setters(strip_option)]
    human_seat: Option<SeatId>,
    /// Position of the human in the speaking queue; seat order when unset.
    #[setters(strip_option)]
    human_speaking_slot: Option<usize>,
    /// Display name for the human seat.
    #[setters(into)]
    human_name: String,
    /// Phase timers.
    durations: PhaseDurations,
    /// Win rule.
    win_policy: WinPolicy,
    /// Whether a dead seat's role becomes public.
    reveal_roles_on_death: bool,
    /// Seed for role assignment and personalities; random when unset.
    #[setters(strip_option)]
    seed: Option<u64>,
}

impl MatchSettings {
    /// Settings for `seats` seats using the standard deal and no human.
    #[instrument]
    pub fn new(seats: usize) -> Self {
        Self {
            seats,
            roles: RoleDistribution::standard(seats),
            human_seat: None,
            human_speaking_slot: None,
            human_name: "You".to_string(),
            durations: PhaseDurations::default(),
            win_policy: WinPolicy::default(),
            reveal_roles_on_death: true,
            seed: None,
        }
    }

    /// Checks the settings before any state is built.
    #[instrument(skip(self), fields(seats = self.seats, roles = self.roles.total()))]
    pub fn validate(&self) -> Result<(), StateInvariantError> {
        if !(MIN_SEATS..=MAX_SEATS).contains(&self.seats) {
            return Err(StateInvariantError::new(format!(
                "seat count {} outside {}..={}",
                self.seats, MIN_SEATS, MAX_SEATS
            )));
        }
        if self.roles.total() != self.seats {
            return Err(StateInvariantError::new(format!(
                "role distribution deals {} roles for {} seats",
                self.roles.total(),
                self.seats
            )));
        }
        if self.roles.wolves() == 0 {
            return Err(StateInvariantError::new(
                "role distribution has no werewolf".to_string(),
            ));
        }
        if self.roles.wolves() >= self.seats {
            return Err(StateInvariantError::new(
                "role distribution has no villager-faction seat".to_string(),
            ));
        }
        if let Some(seat) = self.human_seat
            && seat.index() >= self.seats
        {
            return Err(StateInvariantError::new(format!(
                "human {} outside a table of {}",
                seat, self.seats
            )));
        }
        debug!("Match settings valid");
        Ok(())
    }
}

/// Raised when settings or state break a structural rule of the game.
#[derive(Debug, Clone, Display, Error)]
#[display("State invariant error: {} at {}:{}", message, file, line)]
pub struct StateInvariantError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StateInvariantError {
    /// Creates a new state invariant error.
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
