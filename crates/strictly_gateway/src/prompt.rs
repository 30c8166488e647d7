//! Structured prompts handed to providers.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// What the seat is trying to say, independent of wording.
///
/// The local fallback uses this to pick a canned line when every remote
/// provider has failed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    /// Pointing at a suspect.
    #[display("accusation")]
    Accusation,
    /// Answering accusations.
    #[display("defense")]
    Defense,
    /// Sharing a claim or finding.
    #[display("information")]
    Information,
    /// General talk about the game.
    #[default]
    #[display("strategy comment")]
    StrategyComment,
    /// Final words of an eliminated seat.
    #[display("last words")]
    LastWords,
}

/// Context the local fallback needs to produce a sensible line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Getters, derive_new::new)]
pub struct FallbackHint {
    /// Intent of the utterance.
    intent: IntentTag,
    /// Display name of the speaker.
    speaker: String,
    /// Display name of the seat the utterance is about.
    target: Option<String>,
    /// Role being claimed, for information lines.
    claim: Option<String>,
}

/// A prompt: system context, the user turn and a fallback hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Prompt {
    /// Role, personality and rules for the speaker.
    system: String,
    /// Recent public history and the instruction for this turn.
    user: String,
    /// Structured summary for offline generation.
    hint: FallbackHint,
}

impl Prompt {
    /// Creates a prompt.
    pub fn new(system: impl Into<String>, user: impl Into<String>, hint: FallbackHint) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            hint,
        }
    }
}
