//! Plain-text rendering of replay records for the terminal.

use crate::replay::ReplayEvent;
use serde_json::Value;
use strictly_werewolf::SeatId;

fn faction(name: &str) -> &str {
    match name {
        "Werewolf" => "werewolves",
        "Villager" => "villagers",
        other => other,
    }
}

/// Renders replay records as one line each, from one seat's point of view.
#[derive(Debug, Clone)]
pub struct Console {
    names: Vec<String>,
    viewer: Option<SeatId>,
}

impl Console {
    /// Console for a table whose seats carry `names`. Without a viewer every
    /// record is shown.
    pub fn new(names: Vec<String>, viewer: Option<SeatId>) -> Self {
        Self { names, viewer }
    }

    fn name(&self, value: &Value) -> String {
        value
            .as_u64()
            .and_then(|i| self.names.get(i as usize))
            .map(|name| format!("{name} (#{})", value))
            .unwrap_or_else(|| "nobody".to_string())
    }

    fn seat_name(&self, event: &ReplayEvent) -> String {
        event
            .seat()
            .and_then(|seat| self.names.get(seat.index()))
            .cloned()
            .unwrap_or_else(|| "Someone".to_string())
    }

    /// The line for `event`, or `None` when the viewer may not see it or
    /// there is nothing to say.
    pub fn describe(&self, event: &ReplayEvent) -> Option<String> {
        if let Some(viewer) = self.viewer
            && !event.visible_to(viewer)
        {
            return None;
        }
        let p = event.payload();
        let who = self.seat_name(event);
        let line = match event.kind().as_str() {
            "roles_assigned" => format!("Roles dealt to {} seats.", p["seats"]),
            "phase_changed" => match p["to"].as_str()? {
                "Night" => format!("-- Night {} falls --", event.day()),
                "Discussion" => format!("-- Day {}: discussion --", event.day()),
                "Voting" => "-- Voting --".to_string(),
                "LastWords" => "-- Last words --".to_string(),
                _ => return None,
            },
            "night_action_accepted" => format!(
                "{who} will {} {}.",
                p["kind"].as_str()?.to_lowercase(),
                self.name(&p["target"])
            ),
            "night_resolved" => match p["deaths"].as_array() {
                Some(deaths) if !deaths.is_empty() => {
                    let names: Vec<String> = deaths.iter().map(|d| self.name(d)).collect();
                    format!("Dawn. Found dead: {}.", names.join(", "))
                }
                _ => "Dawn. Nobody died.".to_string(),
            },
            "inspection_delivered" => format!(
                "Your vision: {} is one of the {}.",
                self.name(&p["target"]),
                faction(p["faction"].as_str()?)
            ),
            "spoke" => format!("{who}: {}", p["text"].as_str()?),
            "passed" => format!("{who} passes."),
            "speaker_timed_out" => format!("{who} ran out of time."),
            "vote_cast" => format!("{who} votes for {}.", self.name(&p["target"])),
            "vote_closed" => match p["eliminated"] {
                Value::Null => "The vote ends with nobody eliminated.".to_string(),
                ref seat => format!("The village eliminates {}.", self.name(seat)),
            },
            "died" => match p["role"].as_str() {
                Some(role) => format!("{who} is dead. They were a {role}."),
                None => format!("{who} is dead."),
            },
            "shot_pending" => format!("{who} is a hunter and may shoot."),
            "shot_resolved" => match p["target"] {
                Value::Null => format!("{who} holds fire."),
                ref seat => format!("{who} shoots {}.", self.name(seat)),
            },
            "game_over" => format!("Game over. The {} win.", faction(p["winner"].as_str()?)),
            "briefing" => format!(
                "You are {who}, the {}. {}",
                p["role"].as_str()?,
                p["briefing"].as_str()?
            ),
            "human_turn" => format!(
                "Your turn ({:.0}s): {}.",
                p["seconds"].as_f64()?,
                p["expected"].as_str()?
            ),
            "human_rejected" => format!("Not accepted: {}", p["reason"].as_str()?),
            _ => return None,
        };
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strictly_werewolf::{Audience, EngineEvent, EngineEventKind, Phase};

    fn console(viewer: Option<SeatId>) -> Console {
        Console::new(vec!["Ash".into(), "Bramble".into(), "You".into()], viewer)
    }

    fn event(seat: usize, kind: EngineEventKind, audience: Audience) -> ReplayEvent {
        ReplayEvent::from_engine(&EngineEvent {
            day: 1,
            phase: Phase::Voting,
            seat: Some(SeatId(seat)),
            kind,
            audience,
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_vote_names_both_seats() {
        let line = console(None)
            .describe(&event(0, EngineEventKind::VoteCast { target: SeatId(1) }, Audience::Public))
            .unwrap();
        assert_eq!(line, "Ash votes for Bramble (#1).");
    }

    #[test]
    fn test_private_records_hidden_from_viewer() {
        let wolf_kill = event(
            0,
            EngineEventKind::NightActionAccepted {
                kind: strictly_werewolf::AbilityKind::Kill,
                target: SeatId(1),
            },
            Audience::Seats(vec![SeatId(0)]),
        );
        assert!(console(Some(SeatId(2))).describe(&wolf_kill).is_none());
        assert!(console(None).describe(&wolf_kill).is_some());
    }

    #[test]
    fn test_rejection_shows_reason() {
        let rejected = ReplayEvent::rejection(SeatId(2), 1, Phase::Voting, "vote 9", "no seat matches '9'");
        let line = console(Some(SeatId(2))).describe(&rejected).unwrap();
        assert!(line.contains("no seat matches"));
    }
}
