//! Game rules for werewolf.
//!
//! Pure functions over the roster and ledgers. The phase engine calls them
//! at phase boundaries; they never mutate state themselves.

pub mod night;
pub mod vote;
pub mod win;

pub use night::{resolve_night, Inspection, NightLedger, NightReport};
pub use vote::{leading_target, tally, VoteOutcome};
pub use win::check_winner;
