//! Strictly Match - plays a werewolf match between one human and AI seats
//!
//! Ties the phase engine to the generation gateway and to a human at the
//! keyboard.
//!
//! # Architecture
//!
//! - **Config**: one TOML file for the table, the timers and the providers
//! - **Runner**: [`MatchRunner`] walks the phases, collects actions and
//!   enforces every timer against the wall clock
//! - **Seats**: a [`SeatAgent`] per AI seat, speaking through prompts built
//!   from its own view
//! - **Human**: text commands parsed into engine actions
//! - **Replay**: every engine event, rejected command and gateway attempt
//!   as a JSON line
//!
//! # Example
//!
//! ```
//! use strictly_gateway::{BreakerSettings, GenerationGateway, RetryPolicy};
//! use strictly_match::MatchRunner;
//! use strictly_werewolf::{GamePhaseEngine, MatchSettings};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build()?.block_on(async {
//! let engine = GamePhaseEngine::new(MatchSettings::new(6).with_seed(4))?;
//! let gateway = GenerationGateway::new(vec![], RetryPolicy::default(), BreakerSettings::default());
//! let summary = MatchRunner::new(engine, gateway).run().await?;
//! assert!(summary.winner().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod console;
mod human;
mod replay;
mod runner;
mod seat;
mod speech;

// Crate-level exports - Configuration
pub use config::{DurationsSection, GameSection, MatchConfigError, MatchFile};

// Crate-level exports - Match loop
pub use runner::{MatchError, MatchRunner, MatchSummary, SeatSummary};
pub use seat::SeatAgent;
pub use speech::{build_prompt, hint_for, polish, MAX_SPEECH_CHARS};

// Crate-level exports - Human input
pub use human::{parse_command, CommandError};

// Crate-level exports - Replay
pub use console::Console;
pub use replay::{ChannelSink, JsonlSink, MemorySink, ReplayEvent, ReplayHub, ReplaySink};
