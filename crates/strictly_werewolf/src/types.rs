//! Core domain types: seats, players, phases and the game state.

use crate::rules::NightLedger;
use crate::roles::{Faction, RoleKind};
use crate::settings::MatchSettings;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;
use strum::EnumIter;

/// Index of a seat at the table, stable for the whole match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("seat {}", _0)]
pub struct SeatId(pub usize);

impl SeatId {
    /// Zero-based seat index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Behavioral traits of an AI seat, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Willingness to accuse and to break near-ties.
    pub aggressiveness: f32,
    /// How strongly evidence moves beliefs.
    pub logic: f32,
    /// Willingness to lie, for wolves.
    pub deception: f32,
    /// Tendency to believe other seats' claims.
    pub trust: f32,
}

impl Personality {
    /// Builds a personality, clamping every trait into `[0, 1]`.
    pub fn new(aggressiveness: f32, logic: f32, deception: f32, trust: f32) -> Self {
        Self {
            aggressiveness: aggressiveness.clamp(0.0, 1.0),
            logic: logic.clamp(0.0, 1.0),
            deception: deception.clamp(0.0, 1.0),
            trust: trust.clamp(0.0, 1.0),
        }
    }

    /// Draws a personality from the ranges AI seats are generated in.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::new(
            rng.gen_range(0.3..=0.8),
            rng.gen_range(0.5..=0.9),
            rng.gen_range(0.4..=0.7),
            rng.gen_range(0.3..=0.7),
        )
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::new(0.5, 0.7, 0.5, 0.5)
    }
}

/// A seat at the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    seat: SeatId,
    name: String,
    role: RoleKind,
    is_alive: bool,
    is_human: bool,
    personality: Option<Personality>,
}

impl Player {
    /// Creates a living player.
    pub fn new(
        seat: SeatId,
        name: impl Into<String>,
        role: RoleKind,
        is_human: bool,
        personality: Option<Personality>,
    ) -> Self {
        Self {
            seat,
            name: name.into(),
            role,
            is_alive: true,
            is_human,
            personality,
        }
    }

    /// Seat of this player.
    pub fn seat(&self) -> SeatId {
        self.seat
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role held for the whole match.
    pub fn role(&self) -> RoleKind {
        self.role
    }

    /// Faction of the role.
    pub fn faction(&self) -> Faction {
        self.role.faction()
    }

    /// Whether the player is still alive.
    pub fn is_alive(&self) -> bool {
        self.is_alive
    }

    /// Whether the seat is driven by the human.
    pub fn is_human(&self) -> bool {
        self.is_human
    }

    /// Personality of an AI seat.
    pub fn personality(&self) -> Option<&Personality> {
        self.personality.as_ref()
    }

    /// Marks the player dead. Returns false if already dead.
    pub(crate) fn kill(&mut self) -> bool {
        std::mem::replace(&mut self.is_alive, false)
    }
}

/// Phase of the match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, EnumIter,
)]
pub enum Phase {
    /// Roles are being dealt.
    Preparation,
    /// Night abilities are collected.
    Night,
    /// Seats speak in queue order.
    Discussion,
    /// Seats vote to eliminate.
    Voting,
    /// The eliminated seat speaks once.
    LastWords,
    /// A faction has won.
    Over,
}

impl Phase {
    /// Whether the phase runs on a timer.
    pub fn is_timed(self) -> bool {
        matches!(
            self,
            Phase::Night | Phase::Discussion | Phase::Voting | Phase::LastWords
        )
    }
}

/// One vote cast during the voting phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct VoteRecord {
    /// Seat casting the vote.
    pub voter: SeatId,
    /// Seat voted for.
    pub target: SeatId,
    /// Day the vote belongs to.
    pub day: u32,
    /// Phase the vote was cast in.
    pub phase: Phase,
    /// Monotonic cast order; ties are broken by the earliest sequence.
    pub sequence: u64,
    /// Wall-clock time of the vote.
    pub timestamp: DateTime<Utc>,
}

/// Public claim of a role, optionally with a night finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaim {
    /// Role the speaker claims to hold.
    pub role: RoleKind,
    /// Seat and faction the speaker claims to have learned.
    pub finding: Option<(SeatId, Faction)>,
}

/// Meaning attached to a speech, used by seats to update beliefs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechKind {
    /// Points at a suspected wolf.
    Accusation(SeatId),
    /// Argues for the speaker's own innocence.
    Defense,
    /// Shares information, possibly a role claim.
    Information(Option<RoleClaim>),
    /// General remarks on strategy.
    StrategyComment,
}

/// A line spoken in the discussion or last words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechRecord {
    /// Speaking seat.
    pub seat: SeatId,
    /// Day it was spoken on.
    pub day: u32,
    /// Phase it was spoken in.
    pub phase: Phase,
    /// Text shown to the table.
    pub text: String,
    /// Meaning of the speech, when known.
    pub kind: Option<SpeechKind>,
}

/// Potions a witch has not used yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitchPotions {
    /// Healing potion still available.
    pub heal: bool,
    /// Poison still available.
    pub poison: bool,
}

impl Default for WitchPotions {
    fn default() -> Self {
        Self {
            heal: true,
            poison: true,
        }
    }
}

/// Why a seat died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum DeathCause {
    /// Killed by the wolves at night.
    #[display("killed by wolves")]
    WolfKill,
    /// Poisoned by the witch.
    #[display("poisoned")]
    Poison,
    /// Eliminated by the day vote.
    #[display("voted out")]
    Vote,
    /// Shot by the hunter.
    #[display("shot by the hunter")]
    Shot,
}

/// A death and its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Death {
    /// Seat that died.
    pub seat: SeatId,
    /// Cause of death.
    pub cause: DeathCause,
}

/// Complete game state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub(crate) settings: MatchSettings,
    pub(crate) phase: Phase,
    pub(crate) day: u32,
    pub(crate) players: Vec<Player>,
    pub(crate) dead: Vec<Death>,
    pub(crate) votes: Vec<VoteRecord>,
    pub(crate) abstained: BTreeSet<SeatId>,
    pub(crate) vote_history: Vec<VoteRecord>,
    pub(crate) speeches: Vec<SpeechRecord>,
    pub(crate) speaking_queue: VecDeque<SeatId>,
    pub(crate) winner: Option<Faction>,
    pub(crate) remaining: Option<Duration>,
    pub(crate) speaker_remaining: Option<Duration>,
    pub(crate) last_eliminated: Option<SeatId>,
    pub(crate) last_words_spoken: bool,
    pub(crate) pending_shot: Option<SeatId>,
    pub(crate) night: NightLedger,
    pub(crate) potions: BTreeMap<SeatId, WitchPotions>,
    pub(crate) inspections: BTreeMap<SeatId, Vec<(SeatId, Faction)>>,
}

impl GameState {
    /// Fresh state in [`Phase::Preparation`] with no players dealt yet.
    pub(crate) fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            phase: Phase::Preparation,
            day: 0,
            players: Vec::new(),
            dead: Vec::new(),
            votes: Vec::new(),
            abstained: BTreeSet::new(),
            vote_history: Vec::new(),
            speeches: Vec::new(),
            speaking_queue: VecDeque::new(),
            winner: None,
            remaining: None,
            speaker_remaining: None,
            last_eliminated: None,
            last_words_spoken: false,
            pending_shot: None,
            night: NightLedger::default(),
            potions: BTreeMap::new(),
            inspections: BTreeMap::new(),
        }
    }

    /// Settings the match was started with.
    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current day, starting at 1 on the first night.
    pub fn day(&self) -> u32 {
        self.day
    }

    /// All seats in seat order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Player at `seat`.
    pub fn player(&self, seat: SeatId) -> Option<&Player> {
        self.players.get(seat.index())
    }

    /// Living players in seat order.
    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_alive())
    }

    /// Whether `seat` exists and is alive.
    pub fn is_alive(&self, seat: SeatId) -> bool {
        self.player(seat).is_some_and(Player::is_alive)
    }

    /// Deaths in the order they happened.
    pub fn dead(&self) -> &[Death] {
        &self.dead
    }

    /// Dead players in death order.
    pub fn dead_players(&self) -> impl Iterator<Item = &Player> {
        self.dead.iter().filter_map(|d| self.player(d.seat))
    }

    /// Votes cast in the current voting phase.
    pub fn votes(&self) -> &[VoteRecord] {
        &self.votes
    }

    /// Seats that abstained in the current voting phase.
    pub fn abstained(&self) -> &BTreeSet<SeatId> {
        &self.abstained
    }

    /// Votes from every closed voting phase.
    pub fn vote_history(&self) -> &[VoteRecord] {
        &self.vote_history
    }

    /// Every speech so far.
    pub fn speeches(&self) -> &[SpeechRecord] {
        &self.speeches
    }

    /// Seats still waiting to speak, current speaker first.
    pub fn speaking_queue(&self) -> &VecDeque<SeatId> {
        &self.speaking_queue
    }

    /// Seat whose turn it is to speak.
    pub fn current_speaker(&self) -> Option<SeatId> {
        match self.phase {
            Phase::Discussion => self.speaking_queue.front().copied(),
            Phase::LastWords if !self.last_words_spoken => self.last_eliminated,
            _ => None,
        }
    }

    /// Winning faction once the match is over.
    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    /// Time left in the current phase.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.remaining
    }

    /// Time left for the current speaker.
    pub fn speaker_remaining(&self) -> Option<Duration> {
        self.speaker_remaining
    }

    /// Seat eliminated by the most recent vote.
    pub fn last_eliminated(&self) -> Option<SeatId> {
        self.last_eliminated
    }

    /// Hunter waiting to fire.
    pub fn pending_shot(&self) -> Option<SeatId> {
        self.pending_shot
    }

    /// Unused potions of a witch seat.
    pub fn potions(&self, seat: SeatId) -> Option<WitchPotions> {
        self.potions.get(&seat).copied()
    }

    /// Findings a seer seat has received.
    pub fn inspections(&self, seat: SeatId) -> &[(SeatId, Faction)] {
        self.inspections.get(&seat).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Living seats of a faction.
    pub fn living_in(&self, faction: Faction) -> usize {
        self.living().filter(|p| p.faction() == faction).count()
    }

    /// Night bookkeeping for the current night.
    pub fn night(&self) -> &NightLedger {
        &self.night
    }
}
