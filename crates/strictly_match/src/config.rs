//! Match configuration loaded from one TOML file.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strictly_gateway::{
    BreakerSettings, GenerationGateway, ProviderConfig, RetryPolicy, SessionMode,
};
use strictly_werewolf::{
    MatchSettings, PhaseDurations, RoleDistribution, RoleKind, SeatId, WinPolicy,
};
use tracing::{debug, info, instrument};

/// Phase timers in seconds. Fractions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Getters, Serialize, Deserialize)]
pub struct DurationsSection {
    /// Whole night.
    #[serde(default = "default_night_secs")]
    night_secs: f64,
    /// Whole discussion.
    #[serde(default = "default_discussion_secs")]
    discussion_secs: f64,
    /// One speaker's turn.
    #[serde(default = "default_per_speaker_secs")]
    per_speaker_secs: f64,
    /// Voting window.
    #[serde(default = "default_voting_secs")]
    voting_secs: f64,
    /// Last words, including a hunter shot.
    #[serde(default = "default_last_words_secs")]
    last_words_secs: f64,
}

fn default_night_secs() -> f64 {
    60.0
}

fn default_discussion_secs() -> f64 {
    300.0
}

fn default_per_speaker_secs() -> f64 {
    45.0
}

fn default_voting_secs() -> f64 {
    60.0
}

fn default_last_words_secs() -> f64 {
    45.0
}

impl Default for DurationsSection {
    fn default() -> Self {
        Self {
            night_secs: default_night_secs(),
            discussion_secs: default_discussion_secs(),
            per_speaker_secs: default_per_speaker_secs(),
            voting_secs: default_voting_secs(),
            last_words_secs: default_last_words_secs(),
        }
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, MatchConfigError> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| MatchConfigError::new(format!("{name} must be a positive number of seconds")))
}

impl DurationsSection {
    /// Converts to engine timers.
    pub fn to_durations(&self) -> Result<PhaseDurations, MatchConfigError> {
        Ok(PhaseDurations::default()
            .with_night(seconds("night_secs", self.night_secs)?)
            .with_discussion(seconds("discussion_secs", self.discussion_secs)?)
            .with_per_speaker(seconds("per_speaker_secs", self.per_speaker_secs)?)
            .with_voting(seconds("voting_secs", self.voting_secs)?)
            .with_last_words(seconds("last_words_secs", self.last_words_secs)?))
    }
}

/// The `[game]` table.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct GameSection {
    /// Number of seats.
    seats: usize,
    /// Role counts by name; the standard deal when empty.
    #[serde(default)]
    roles: BTreeMap<String, usize>,
    /// Seat index of the human; all-AI when absent.
    #[serde(default)]
    human_seat: Option<usize>,
    /// Queue position of the human in discussions.
    #[serde(default)]
    human_speaking_slot: Option<usize>,
    /// Display name of the human.
    #[serde(default = "default_human_name")]
    human_name: String,
    /// Win rule.
    #[serde(default)]
    win_policy: WinPolicy,
    /// Whether dead seats' roles become public.
    #[serde(default = "default_reveal")]
    reveal_roles_on_death: bool,
    /// RNG seed for the deal, personalities and AI decisions.
    #[serde(default)]
    seed: Option<u64>,
    /// Day after which an unfinished match is abandoned.
    #[serde(default = "default_max_days")]
    max_days: u32,
    /// Phase timers.
    #[serde(default)]
    durations: DurationsSection,
}

fn default_human_name() -> String {
    "You".to_string()
}

fn default_reveal() -> bool {
    true
}

fn default_max_days() -> u32 {
    30
}

/// A whole match file: game rules, providers and resilience settings.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct MatchFile {
    /// How AI speech is requested.
    #[serde(default)]
    session_mode: SessionMode,
    /// Game rules.
    game: GameSection,
    /// Providers in priority order.
    #[serde(default)]
    providers: Vec<ProviderConfig>,
    /// Per-provider retries.
    #[serde(default)]
    retry: RetryPolicy,
    /// Per-provider circuit breaker.
    #[serde(default)]
    breaker: BreakerSettings,
}

impl FromStr for MatchFile {
    type Err = MatchConfigError;

    #[instrument(skip(s), fields(len = s.len()))]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let file: Self = toml::from_str(s)
            .map_err(|e| MatchConfigError::new(format!("Failed to parse config: {}", e)))?;
        debug!(
            seats = file.game.seats,
            providers = file.providers.len(),
            "Parsed match file"
        );
        Ok(file)
    }
}

impl MatchFile {
    /// Loads a match file from TOML.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MatchConfigError> {
        debug!("Loading match file");
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MatchConfigError::new(format!("Failed to read config file: {}", e))
        })?;
        let file = content.parse::<Self>()?;
        info!(seats = file.game.seats, "Match file loaded");
        Ok(file)
    }

    /// Role distribution named in the file, or the standard deal.
    pub fn distribution(&self) -> Result<RoleDistribution, MatchConfigError> {
        if self.game.roles.is_empty() {
            return Ok(RoleDistribution::standard(self.game.seats));
        }
        self.game
            .roles
            .iter()
            .map(|(name, count)| {
                RoleKind::from_str(name)
                    .map(|role| (role, *count))
                    .map_err(|_| MatchConfigError::new(format!("unknown role: {name}")))
            })
            .collect()
    }

    /// Engine settings, validated.
    ///
    /// `spectate` drops the human seat so every seat is AI.
    #[instrument(skip(self))]
    pub fn to_settings(&self, spectate: bool) -> Result<MatchSettings, MatchConfigError> {
        let game = &self.game;
        let mut settings = MatchSettings::new(game.seats)
            .with_roles(self.distribution()?)
            .with_human_name(game.human_name.clone())
            .with_durations(game.durations.to_durations()?)
            .with_win_policy(game.win_policy)
            .with_reveal_roles_on_death(game.reveal_roles_on_death);
        if let Some(seat) = game.human_seat
            && !spectate
        {
            settings = settings.with_human_seat(SeatId(seat));
        }
        if let Some(slot) = game.human_speaking_slot {
            settings = settings.with_human_speaking_slot(slot);
        }
        if let Some(seed) = game.seed {
            settings = settings.with_seed(seed);
        }
        settings
            .validate()
            .map_err(|e| MatchConfigError::new(e.message))?;
        Ok(settings)
    }

    /// Builds the generation gateway from the provider list.
    pub fn gateway(&self) -> Result<GenerationGateway, MatchConfigError> {
        GenerationGateway::from_configs(&self.providers, self.retry, self.breaker)
            .map_err(|e| MatchConfigError::new(e.message))
    }
}

/// Match configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Match config error: {} at {}:{}", message, file, line)]
pub struct MatchConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl MatchConfigError {
    /// Creates a new configuration error.
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

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_gateway::ProviderKind;

    const SAMPLE: &str = r#"
session_mode = "streaming"

[game]
seats = 8
human_seat = 2
seed = 7

[game.roles]
wolf = 2
villager = 3
seer = 1
witch = 1
guard = 1

[game.durations]
per_speaker_secs = 0.5

[[providers]]
name = "ollama"
kind = "openai_compatible"
endpoint = "http://localhost:11434"

[retry]
max_attempts = 2
"#;

    #[test]
    fn test_sample_parses_with_defaults() {
        let file: MatchFile = SAMPLE.parse().unwrap();
        assert_eq!(*file.session_mode(), SessionMode::Streaming);
        assert_eq!(*file.retry().max_attempts(), 2);
        assert_eq!(*file.retry().base_delay_ms(), 500);
        assert_eq!(*file.breaker(), BreakerSettings::default());
        assert_eq!(file.game().max_days(), &30);
    }

    #[test]
    fn test_role_aliases_resolve() {
        let file: MatchFile = SAMPLE.parse().unwrap();
        let dist = file.distribution().unwrap();
        assert_eq!(dist.count(RoleKind::Werewolf), 2);
        assert_eq!(dist.total(), 8);
    }

    #[test]
    fn test_settings_carry_human_and_timers() {
        let file: MatchFile = SAMPLE.parse().unwrap();
        let settings = file.to_settings(false).unwrap();
        assert_eq!(*settings.human_seat(), Some(SeatId(2)));
        assert_eq!(
            *settings.durations().per_speaker(),
            Duration::from_millis(500)
        );
        assert_eq!(*settings.durations().voting(), Duration::from_secs(60));
        assert_eq!(*file.to_settings(true).unwrap().human_seat(), None);
    }

    #[test]
    fn test_counts_must_fill_table() {
        let text = SAMPLE.replace("villager = 3", "villager = 1");
        let file: MatchFile = text.parse().unwrap();
        let err = file.to_settings(false).unwrap_err();
        assert!(err.message.contains("6 roles for 8 seats"), "{}", err.message);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let text = SAMPLE.replace("guard = 1", "jester = 1");
        let err = text.parse::<MatchFile>().unwrap().distribution().unwrap_err();
        assert!(err.message.contains("jester"));
    }

    #[test]
    fn test_zero_timer_rejected() {
        let text = SAMPLE.replace("per_speaker_secs = 0.5", "per_speaker_secs = 0");
        let err = text.parse::<MatchFile>().unwrap().to_settings(false).unwrap_err();
        assert!(err.message.contains("per_speaker_secs"));
    }

    #[test]
    fn test_provider_kinds_use_short_names() {
        let text = SAMPLE.replace("openai_compatible", "openai");
        let file: MatchFile = text.parse().unwrap();
        assert_eq!(*file.providers()[0].kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn test_demo_file_is_valid() {
        let file: MatchFile = include_str!("../../../demos/match.toml").parse().unwrap();
        let settings = file.to_settings(false).unwrap();
        assert_eq!(*settings.human_seat(), Some(SeatId(3)));
        assert_eq!(file.providers().len(), 3);
    }

    #[test]
    fn test_gateway_built_from_providers() {
        let file: MatchFile = SAMPLE.parse().unwrap();
        let gateway = file.gateway().unwrap();
        assert_eq!(gateway.provider_names(), vec!["ollama"]);
    }
}
