//! Turning a speech intent into a prompt, and a reply into table talk.

use strictly_gateway::{FallbackHint, IntentTag, Prompt};
use strictly_werewolf::{Intent, Phase, RoleKind, SeatView};
use tracing::{debug, instrument};

/// Speeches quoted back to the model.
const RECENT_SPEECHES: usize = 8;

/// Longest line put on the table, in characters.
pub const MAX_SPEECH_CHARS: usize = 200;

/// Structured summary of what the seat means to say.
pub fn hint_for(view: &SeatView, intent: &Intent) -> FallbackHint {
    let speaker = view.name_of(view.seat).to_string();
    let (tag, target, claim) = match *intent {
        _ if view.phase == Phase::LastWords => (IntentTag::LastWords, None, None),
        Intent::Accusation(seat) => (
            IntentTag::Accusation,
            Some(view.name_of(seat).to_string()),
            None,
        ),
        Intent::Defense => (IntentTag::Defense, None, None),
        Intent::Information(claim) => (
            IntentTag::Information,
            claim
                .and_then(|c| c.finding)
                .map(|(seat, _)| view.name_of(seat).to_string()),
            claim.map(|c| c.role.to_string().to_lowercase()),
        ),
        _ => (IntentTag::StrategyComment, None, None),
    };
    FallbackHint::new(tag, speaker, target, claim)
}

fn persona(view: &SeatView) -> String {
    let Some(p) = view.personality else {
        return String::new();
    };
    let mut traits = Vec::new();
    if p.aggressiveness > 0.6 {
        traits.push("blunt and quick to accuse");
    } else if p.aggressiveness < 0.4 {
        traits.push("cautious");
    }
    if p.logic > 0.75 {
        traits.push("methodical about evidence");
    }
    if p.trust > 0.6 {
        traits.push("inclined to believe others");
    } else if p.trust < 0.4 {
        traits.push("slow to trust");
    }
    if traits.is_empty() {
        "You keep a level head.".to_string()
    } else {
        format!("You are {}.", traits.join(", "))
    }
}

fn instruction(view: &SeatView, intent: &Intent) -> String {
    if view.phase == Phase::LastWords {
        return "You have been voted out. Say your last words to the village.".to_string();
    }
    match *intent {
        Intent::Accusation(seat) => format!(
            "Accuse {} of being a werewolf and give a reason.",
            view.name_of(seat)
        ),
        Intent::Defense => {
            "Others suspect you. Defend yourself without sounding desperate.".to_string()
        }
        Intent::Information(Some(claim)) => match claim.finding {
            Some((seat, faction)) => format!(
                "Claim to be the {} and announce that {} is one of the {}.",
                claim.role.to_string().to_lowercase(),
                view.name_of(seat),
                faction.to_string().to_lowercase()
            ),
            None => format!(
                "Reveal that you are the {}.",
                claim.role.to_string().to_lowercase()
            ),
        },
        Intent::Information(None) => {
            "Share what you have noticed so far, such as who has been quiet or who voted together."
                .to_string()
        }
        _ => "Comment on how the village should approach today's vote.".to_string(),
    }
}

/// Prompt asking the model to voice `intent` for the viewing seat.
#[instrument(skip(view), fields(seat = %view.seat, day = view.day))]
pub fn build_prompt(view: &SeatView, intent: &Intent) -> Prompt {
    let name = view.name_of(view.seat);
    let mut system = format!(
        "You are {name}, playing a game of werewolf. Your role is {}. {}",
        view.role,
        view.role.briefing()
    );
    if view.role == RoleKind::Werewolf && !view.allies.is_empty() {
        let pack: Vec<&str> = view.allies.iter().map(|s| view.name_of(*s)).collect();
        system.push_str(&format!(
            " Your packmates are {}. Never reveal them or yourself.",
            pack.join(" and ")
        ));
    }
    let persona = persona(view);
    if !persona.is_empty() {
        system.push(' ');
        system.push_str(&persona);
    }
    system.push_str(" Reply with one to three spoken sentences, in character, with no narration.");

    let living: Vec<&str> = view.living().map(|s| view.name_of(s)).collect();
    let mut user = format!("Day {}. Alive: {}.\n", view.day, living.join(", "));
    let skip = view.speeches.len().saturating_sub(RECENT_SPEECHES);
    for speech in view.speeches.iter().skip(skip) {
        user.push_str(&format!("{}: {}\n", view.name_of(speech.seat), speech.text));
    }
    user.push_str(&instruction(view, intent));

    debug!(system_len = system.len(), user_len = user.len(), "Built prompt");
    Prompt::new(system, user, hint_for(view, intent))
}

/// Cleans a model reply for the table: trims, drops wrapping quotes and a
/// leading `Name:`, and caps the length. `None` when nothing is left.
pub fn polish(text: &str, speaker: &str) -> Option<String> {
    let mut line = text.trim();
    if let Some(rest) = line.strip_prefix(speaker)
        && let Some(rest) = rest.trim_start().strip_prefix(':')
    {
        line = rest.trim();
    }
    let line = line
        .trim_matches(|c| matches!(c, '"' | '\u{201c}' | '\u{201d}'))
        .trim();
    if line.is_empty() {
        return None;
    }
    if line.chars().count() <= MAX_SPEECH_CHARS {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(MAX_SPEECH_CHARS - 3).collect();
    Some(format!("{}...", cut.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strictly_werewolf::{
        Faction, GamePhaseEngine, MatchSettings, RoleClaim, SeatId,
    };

    fn wolf_view() -> SeatView {
        let roles = vec![
            RoleKind::Werewolf,
            RoleKind::Werewolf,
            RoleKind::Seer,
            RoleKind::Villager,
            RoleKind::Villager,
            RoleKind::Villager,
        ];
        let settings = MatchSettings::new(roles.len()).with_seed(3);
        let mut engine = GamePhaseEngine::with_roles(settings, roles).unwrap();
        engine.advance().unwrap();
        engine.advance().unwrap();
        engine.view_for(SeatId(0)).unwrap()
    }

    #[test]
    fn test_prompt_names_role_and_pack() {
        let view = wolf_view();
        let prompt = build_prompt(&view, &Intent::Accusation(SeatId(2)));
        assert!(prompt.system().contains("Werewolf"));
        assert!(prompt.system().contains(view.name_of(SeatId(1))));
        assert!(prompt.user().contains(&format!("Accuse {}", view.name_of(SeatId(2)))));
        assert_eq!(*prompt.hint().intent(), IntentTag::Accusation);
        assert_eq!(
            prompt.hint().target().as_deref(),
            Some(view.name_of(SeatId(2)))
        );
    }

    #[test]
    fn test_fake_claim_hint_carries_role() {
        let view = wolf_view();
        let claim = RoleClaim {
            role: RoleKind::Seer,
            finding: Some((SeatId(3), Faction::Werewolf)),
        };
        let hint = hint_for(&view, &Intent::Information(Some(claim)));
        assert_eq!(*hint.intent(), IntentTag::Information);
        assert_eq!(hint.claim().as_deref(), Some("seer"));
        assert_eq!(hint.target().as_deref(), Some(view.name_of(SeatId(3))));
    }

    #[test]
    fn test_plain_information_asks_for_observations() {
        let view = wolf_view();
        let prompt = build_prompt(&view, &Intent::Information(None));
        assert!(prompt.user().contains("Share what you have noticed"));
        assert_eq!(*prompt.hint().intent(), IntentTag::Information);
        assert_eq!(*prompt.hint().claim(), None);
    }

    #[test]
    fn test_last_words_override_intent() {
        let mut view = wolf_view();
        view.phase = Phase::LastWords;
        let hint = hint_for(&view, &Intent::Accusation(SeatId(2)));
        assert_eq!(*hint.intent(), IntentTag::LastWords);
        assert!(build_prompt(&view, &Intent::Defense)
            .user()
            .contains("last words"));
    }

    #[test]
    fn test_polish_strips_name_and_quotes() {
        assert_eq!(
            polish("  Ash: \"I trust Fern.\"  ", "Ash"),
            Some("I trust Fern.".to_string())
        );
        assert_eq!(polish(" \"\" ", "Ash"), None);
    }

    #[test]
    fn test_polish_caps_length() {
        let long = "wolf ".repeat(100);
        let line = polish(&long, "Ash").unwrap();
        assert!(line.chars().count() <= MAX_SPEECH_CHARS);
        assert!(line.ends_with("..."));
    }
}
