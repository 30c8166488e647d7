//! Strictly Werewolf - rules, phase engine and AI reasoning for werewolf
//!
//! One human and several AI seats play the social-deduction game. This
//! crate holds everything that does not touch the network or the clock:
//!
//! # Architecture
//!
//! - **Roles**: catalog of roles, factions and night abilities
//! - **Engine**: [`GamePhaseEngine`] owns the state and validates every action
//! - **Rules**: pure night, vote and win resolution
//! - **Invariants**: properties checked after every transition
//! - **Suspicion**: per-seat belief scores fed by evidence
//! - **Strategy**: personality-driven decisions for AI seats
//!
//! # Example
//!
//! ```
//! use strictly_werewolf::{GamePhaseEngine, MatchSettings, Phase};
//!
//! let mut engine = GamePhaseEngine::new(MatchSettings::new(8).with_seed(7))?;
//! assert_eq!(engine.advance()?, Phase::Night);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod action;
mod analysis;
mod contracts;
mod engine;
mod events;
mod invariants;
mod roles;
mod rules;
mod settings;
mod strategy;
mod suspicion;
mod types;
mod view;

// Crate-level exports - Actions
pub use action::{Action, Decision, HumanAction, Intent, NightAbility, Speech, ValidationError};

// Crate-level exports - Roles
pub use roles::{AbilityKind, Faction, NightRound, RoleKind};

// Crate-level exports - Settings
pub use settings::{
    MatchSettings, PhaseDurations, RoleDistribution, StateInvariantError, WinPolicy, MAX_SEATS,
    MIN_SEATS,
};

// Crate-level exports - State
pub use types::{
    Death, DeathCause, GameState, Personality, Phase, Player, RoleClaim, SeatId, SpeechKind,
    SpeechRecord, VoteRecord, WitchPotions,
};
pub use view::{PublicSeat, SeatView};

// Crate-level exports - Engine
pub use contracts::{ActionContract, Contract, LegalAction};
pub use engine::{GamePhaseEngine, Tick};
pub use events::{Audience, EngineEvent, EngineEventKind};
pub use invariants::{
    DeadListConsistentInvariant, Invariant, InvariantSet, InvariantViolation, RoleCountInvariant,
    VoteLedgerInvariant, WerewolfInvariants, WinnerConsistentInvariant,
};
pub use rules::{
    check_winner, leading_target, resolve_night, tally, Inspection, NightLedger, NightReport,
    VoteOutcome,
};

// Crate-level exports - AI reasoning
pub use analysis::{accusation_pressure, infer_intent, mentioned_seat};
pub use strategy::{StrategyEngine, StrategyParams};
pub use suspicion::{
    Evidence, EvidenceKind, SuspicionState, CONTRADICTION_IN_SPEECH_WEIGHT,
    EVIDENCE_LOG_CAPACITY, NEUTRAL_PRIOR, NIGHT_RESULT_CONFLICT_WEIGHT,
    ROLE_CLAIM_CONFLICT_WEIGHT, VOTING_PATTERN_DIVERGENCE_WEIGHT,
};
