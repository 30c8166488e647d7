//! Offline generator that always answers.

use super::GenerationProvider;
use crate::config::ProviderKind;
use crate::error::ProviderError;
use crate::prompt::{FallbackHint, IntentTag, Prompt};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const ACCUSATIONS: [&str; 4] = [
    "I have a bad feeling about {target}.",
    "{target}, your story does not add up.",
    "My vote is leaning toward {target} today.",
    "Something about {target} feels off to me.",
];
const DEFENSES: [&str; 4] = [
    "I'm on the village's side, I promise.",
    "You are pointing at the wrong seat.",
    "Look at my votes, they speak for me.",
    "Voting me out only helps the wolves.",
];
const CLAIMS: [&str; 3] = [
    "As the {claim}, I can tell you {target} deserves a closer look.",
    "I'll be open: I am the {claim}.",
    "Speaking as the {claim}, keep an eye on {target}.",
];
const COMMENTS: [&str; 4] = [
    "Let's think carefully before we vote.",
    "Watch who stays quiet today.",
    "We need to compare everyone's votes from yesterday.",
    "Rushing this vote would be a mistake.",
];
const LAST_WORDS: [&str; 3] = [
    "Remember who pushed for this vote.",
    "You got it wrong. Look harder tomorrow.",
    "Good luck, village. Trust the evidence.",
];

/// Deterministic templated lines chosen from the prompt's fallback hint.
#[derive(Debug, Clone)]
pub struct LocalFallback {
    name: String,
}

impl Default for LocalFallback {
    fn default() -> Self {
        Self::named("local")
    }
}

impl LocalFallback {
    /// Local fallback registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The line for `hint`. Same hint, same line.
    #[instrument(skip(hint), fields(intent = %hint.intent()))]
    pub fn compose(hint: &FallbackHint) -> String {
        let templates: &[&str] = match hint.intent() {
            IntentTag::Accusation if hint.target().is_some() => &ACCUSATIONS,
            IntentTag::Defense => &DEFENSES,
            IntentTag::Information if hint.claim().is_some() => &CLAIMS,
            IntentTag::LastWords => &LAST_WORDS,
            _ => &COMMENTS,
        };
        let seed = hint
            .speaker()
            .bytes()
            .chain(hint.target().iter().flat_map(|t| t.bytes()))
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(usize::from(b)));
        let template = templates[seed % templates.len()];
        let target = hint.target().as_deref().unwrap_or("someone");
        let claim = hint.claim().as_deref().unwrap_or("villager");
        let line = template.replace("{target}", target).replace("{claim}", claim);
        debug!(%line, "Composed fallback line");
        line
    }
}

#[async_trait]
impl GenerationProvider for LocalFallback {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        Ok(Self::compose(prompt.hint()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn hint(intent: IntentTag, target: Option<&str>) -> FallbackHint {
        FallbackHint::new(intent, "Ash".to_string(), target.map(str::to_string), None)
    }

    #[test]
    fn test_every_intent_has_a_line() {
        for intent in IntentTag::iter() {
            let line = LocalFallback::compose(&hint(intent, Some("Ivy")));
            assert!(!line.trim().is_empty());
            assert!(!line.contains('{'));
        }
    }

    #[test]
    fn test_accusation_names_target() {
        let line = LocalFallback::compose(&hint(IntentTag::Accusation, Some("Juniper")));
        assert!(line.contains("Juniper"));
    }

    #[test]
    fn test_accusation_without_target_falls_back_to_comment() {
        let line = LocalFallback::compose(&hint(IntentTag::Accusation, None));
        assert!(COMMENTS.contains(&line.as_str()));
    }

    #[test]
    fn test_same_hint_same_line() {
        let h = hint(IntentTag::Defense, None);
        assert_eq!(LocalFallback::compose(&h), LocalFallback::compose(&h));
    }

    #[tokio::test]
    async fn test_generate_never_fails() {
        let prompt = Prompt::new("", "", FallbackHint::default());
        assert!(LocalFallback::default().generate(&prompt).await.is_ok());
    }
}
