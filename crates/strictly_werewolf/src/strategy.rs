//! Deterministic, personality-parameterized decisions for AI seats.
//!
//! A [`StrategyEngine`] reads only its own seat's [`SeatView`] and
//! [`SuspicionState`]. All randomness comes from the engine's seeded RNG, so
//! a fixed seed reproduces every decision.

use crate::action::{Decision, Intent, NightAbility};
use crate::analysis::accusation_pressure;
use crate::events::{EngineEvent, EngineEventKind};
use crate::roles::{AbilityKind, Faction, RoleKind};
use crate::suspicion::{EvidenceKind, SuspicionState};
use crate::types::{DeathCause, Personality, RoleClaim, SeatId, SpeechKind};
use crate::view::SeatView;
use derive_getters::Getters;
use derive_setters::Setters;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Thresholds shaping every decision.
#[derive(Debug, Clone, Copy, PartialEq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct StrategyParams {
    /// Accusation pressure above which a seat defends itself.
    defense_threshold: f32,
    /// Scores within this distance of the top count as tied.
    tie_band: f32,
    /// Score at which the witch spends her poison.
    poison_threshold: f32,
    /// Score at which the hunter fires.
    shoot_threshold: f32,
    /// Scores below this make the witch save the victim.
    heal_ceiling: f32,
    /// Deception above which a wolf fakes a seer claim.
    fake_claim_deception: f32,
    /// Score added to a claimed seer when wolves pick a victim.
    seer_claim_bias: f32,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            defense_threshold: 0.35,
            tie_band: 0.02,
            poison_threshold: 0.8,
            shoot_threshold: 0.6,
            heal_ceiling: 0.5,
            fake_claim_deception: 0.6,
            seer_claim_bias: 0.15,
        }
    }
}

/// Decision maker for one AI seat.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    seat: SeatId,
    personality: Personality,
    params: StrategyParams,
    rng: StdRng,
    claims: BTreeMap<RoleKind, Vec<SeatId>>,
    announced: BTreeSet<SeatId>,
    claimed: bool,
}

impl StrategyEngine {
    /// Strategy for `seat` with its own RNG stream.
    #[instrument(skip(personality))]
    pub fn new(seat: SeatId, personality: Personality, seed: u64) -> Self {
        Self {
            seat,
            personality,
            params: StrategyParams::default(),
            rng: StdRng::seed_from_u64(seed),
            claims: BTreeMap::new(),
            announced: BTreeSet::new(),
            claimed: false,
        }
    }

    /// Replaces the decision thresholds.
    pub fn with_params(mut self, params: StrategyParams) -> Self {
        self.params = params;
        self
    }

    /// Seat this strategy plays.
    pub fn seat(&self) -> SeatId {
        self.seat
    }

    /// Personality driving the decisions.
    pub fn personality(&self) -> &Personality {
        &self.personality
    }

    /// Seeds the model with what the seat knows from the start: wolves
    /// trust their pack completely.
    pub fn prime(&self, view: &SeatView, suspicion: &mut SuspicionState) {
        for ally in &view.allies {
            suspicion.pin(*ally, 0.0);
        }
    }

    /// Seats this strategy may act against: living, not itself, and for
    /// wolves not a packmate.
    fn candidates(&self, view: &SeatView) -> Vec<SeatId> {
        view.living_others().filter(|s| !view.is_ally(*s)).collect()
    }

    /// Scale applied to every evidence strength.
    fn evidence_scale(&self) -> f32 {
        0.5 + 0.5 * self.personality.logic
    }

    // ─────────────────────────────────────────────────────────────
    //  Decisions
    // ─────────────────────────────────────────────────────────────

    /// Night ability for the seat's role, or `None` to skip.
    #[instrument(skip(self, view, suspicion), fields(seat = %self.seat, role = %view.role))]
    pub fn decide_night_action(
        &mut self,
        view: &SeatView,
        suspicion: &SuspicionState,
    ) -> Option<Decision> {
        let candidates = self.candidates(view);
        let ability = |kind, target| Intent::NightAbility(NightAbility::new(kind, target));

        let decision = match view.role {
            RoleKind::Werewolf => {
                let target = self.kill_target(&candidates, suspicion)?;
                Decision::new(ability(AbilityKind::Kill, target), suspicion.score(target))
            }
            RoleKind::Seer => {
                let unknown = candidates.into_iter().filter(|s| !suspicion.is_pinned(*s));
                let target = suspicion.most_suspicious_among(unknown)?;
                Decision::new(ability(AbilityKind::Inspect, target), suspicion.score(target))
            }
            RoleKind::Guard => {
                let target = suspicion.most_trusted_among(candidates)?;
                Decision::new(
                    ability(AbilityKind::Protect, target),
                    1.0 - suspicion.score(target),
                )
            }
            RoleKind::Witch => {
                let potions = view.potions?;
                let save = view.wolf_target.filter(|victim| {
                    potions.heal
                        && (*victim == self.seat
                            || suspicion.score(*victim) < self.params.heal_ceiling)
                });
                if let Some(victim) = save {
                    Decision::new(
                        ability(AbilityKind::Heal, victim),
                        1.0 - suspicion.score(victim),
                    )
                } else {
                    let top = suspicion.most_suspicious_among(candidates)?;
                    let score = suspicion.score(top);
                    if !potions.poison || score < self.params.poison_threshold {
                        return None;
                    }
                    Decision::new(ability(AbilityKind::Poison, top), score)
                }
            }
            RoleKind::Villager | RoleKind::Hunter => return None,
        };
        debug!(intent = ?decision.intent, confidence = decision.confidence, "Night decision");
        Some(decision)
    }

    /// Vote target, or `None` when nobody is eligible.
    ///
    /// Seats within the tie band of the top score count as tied. A tie is
    /// broken at random with probability equal to aggressiveness, otherwise
    /// toward the lowest seat.
    #[instrument(skip(self, view, suspicion), fields(seat = %self.seat))]
    pub fn decide_vote(&mut self, view: &SeatView, suspicion: &SuspicionState) -> Option<Decision> {
        let tied = suspicion.near_top(self.candidates(view), self.params.tie_band);
        let first = *tied.first()?;
        let aggressiveness = self.aggressiveness();
        let target = if tied.len() > 1 && self.rng.gen_bool(aggressiveness) {
            tied.choose(&mut self.rng).copied().unwrap_or(first)
        } else {
            first
        };
        debug!(%target, tied = tied.len(), "Vote decision");
        Some(Decision::new(Intent::Vote(target), suspicion.score(target)))
    }

    /// What to say when the seat holds the floor.
    ///
    /// Defends under pressure; otherwise accuses with probability equal to
    /// aggressiveness; otherwise shares information, with a night result
    /// when it holds one.
    #[instrument(skip(self, view, suspicion), fields(seat = %self.seat))]
    pub fn decide_speech_intent(&mut self, view: &SeatView, suspicion: &SuspicionState) -> Decision {
        let pressure = accusation_pressure(view, self.seat);
        if pressure > self.params.defense_threshold {
            return Decision::new(Intent::Defense, pressure);
        }

        let top = suspicion.most_suspicious_among(self.candidates(view));
        let aggressiveness = self.aggressiveness();
        if let Some(target) = top
            && self.rng.gen_bool(aggressiveness)
        {
            return Decision::new(Intent::Accusation(target), suspicion.score(target));
        }

        if let Some(claim) = self.claim_to_share(view) {
            self.claimed = true;
            if let Some((subject, _)) = claim.finding {
                self.announced.insert(subject);
            }
            let confidence = match view.role {
                RoleKind::Werewolf => self.personality.deception,
                _ => 0.9,
            };
            return Decision::new(Intent::Information(Some(claim)), confidence);
        }

        Decision::new(Intent::Information(None), 0.3)
    }

    /// Target of the hunter's shot, or `None` to hold fire.
    #[instrument(skip(self, view, suspicion), fields(seat = %self.seat))]
    pub fn decide_hunter_shot(&mut self, view: &SeatView, suspicion: &SuspicionState) -> Option<SeatId> {
        let target = suspicion.most_suspicious_among(self.candidates(view))?;
        (suspicion.score(target) >= self.params.shoot_threshold).then_some(target)
    }

    /// Highest-suspicion non-wolf, with claimed seers nudged up by the
    /// seer bias. Ties go to the lowest seat.
    fn kill_target(&self, candidates: &[SeatId], suspicion: &SuspicionState) -> Option<SeatId> {
        let seers = self.claims.get(&RoleKind::Seer);
        candidates
            .iter()
            .map(|seat| {
                let bias = match seers {
                    Some(claimants) if claimants.contains(seat) => self.params.seer_claim_bias,
                    _ => 0.0,
                };
                (*seat, suspicion.score(*seat) + bias)
            })
            .max_by(|(seat_a, a), (seat_b, b)| a.total_cmp(b).then(seat_b.cmp(seat_a)))
            .map(|(seat, _)| seat)
    }

    fn aggressiveness(&self) -> f64 {
        f64::from(self.personality.aggressiveness).clamp(0.0, 1.0)
    }

    /// A night result worth announcing: a seer's unannounced finding on a
    /// living seat, or a wolf's fabricated one.
    fn claim_to_share(&mut self, view: &SeatView) -> Option<RoleClaim> {
        match view.role {
            RoleKind::Seer => view
                .inspections
                .iter()
                .rev()
                .find(|(seat, _)| view.is_alive(*seat) && !self.announced.contains(seat))
                .map(|(seat, faction)| RoleClaim {
                    role: RoleKind::Seer,
                    finding: Some((*seat, *faction)),
                }),
            RoleKind::Werewolf
                if !self.claimed
                    && view.day >= 2
                    && self.personality.deception > self.params.fake_claim_deception =>
            {
                let victims = self.candidates(view);
                let framed = victims.choose(&mut self.rng).copied()?;
                Some(RoleClaim {
                    role: RoleKind::Seer,
                    finding: Some((framed, Faction::Werewolf)),
                })
            }
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────
    //  Observation
    // ─────────────────────────────────────────────────────────────

    /// Turns an event the seat saw into evidence.
    #[instrument(skip(self, view, event, suspicion), fields(seat = %self.seat, event = event.name()))]
    pub fn observe(&mut self, view: &SeatView, event: &EngineEvent, suspicion: &mut SuspicionState) {
        if !event.visible_to(self.seat) {
            return;
        }
        let day = event.day;
        match (&event.kind, event.seat) {
            (EngineEventKind::Spoke { speech: Some(kind), .. }, Some(speaker))
                if speaker != self.seat =>
            {
                self.observe_speech(view, speaker, *kind, day, suspicion);
            }
            (
                EngineEventKind::Died {
                    cause: DeathCause::Vote,
                    role: Some(role),
                },
                Some(eliminated),
            ) => self.observe_elimination(view, eliminated, *role, suspicion),
            (
                EngineEventKind::Died {
                    cause: DeathCause::WolfKill,
                    ..
                },
                Some(victim),
            ) => {
                // wolves tend to silence their accusers
                let accused: BTreeSet<SeatId> = view
                    .speeches
                    .iter()
                    .filter(|s| s.seat == victim)
                    .filter_map(|s| match s.kind {
                        Some(SpeechKind::Accusation(t)) => Some(t),
                        _ => None,
                    })
                    .collect();
                for seat in accused {
                    suspicion.update_from_evidence(
                        EvidenceKind::NightResultConflict,
                        seat,
                        0.5 * self.evidence_scale(),
                        day,
                    );
                }
            }
            (EngineEventKind::InspectionDelivered { target, faction }, _) => {
                let score = if *faction == Faction::Werewolf { 1.0 } else { 0.0 };
                suspicion.pin(*target, score);
            }
            _ => {}
        }
    }

    fn observe_speech(
        &mut self,
        view: &SeatView,
        speaker: SeatId,
        kind: SpeechKind,
        day: u32,
        suspicion: &mut SuspicionState,
    ) {
        let scale = self.evidence_scale();
        let trust = self.personality.trust;
        let note = |suspicion: &mut SuspicionState, kind, subject, strength: f32| {
            suspicion.update_from_evidence(kind, subject, strength * scale, day);
        };

        match kind {
            SpeechKind::Accusation(target) => {
                if target == self.seat && view.faction() == Faction::Villager {
                    note(suspicion, EvidenceKind::ContradictionInSpeech, speaker, 1.0);
                    return;
                }
                let target_score = suspicion.score(target);
                if target_score < 0.3 {
                    note(suspicion, EvidenceKind::ContradictionInSpeech, speaker, 1.0);
                } else if target_score > 0.7 {
                    note(suspicion, EvidenceKind::ContradictionInSpeech, speaker, -0.4);
                }
                note(suspicion, EvidenceKind::ContradictionInSpeech, target, 0.4 * trust);
            }
            SpeechKind::Defense => {
                if accusation_pressure(view, speaker) > self.params.defense_threshold {
                    note(suspicion, EvidenceKind::ContradictionInSpeech, speaker, 0.4);
                }
            }
            SpeechKind::Information(Some(claim)) => {
                self.observe_claim(view, speaker, claim, day, suspicion);
            }
            SpeechKind::Information(None) | SpeechKind::StrategyComment => {}
        }
    }

    fn observe_claim(
        &mut self,
        view: &SeatView,
        speaker: SeatId,
        claim: RoleClaim,
        day: u32,
        suspicion: &mut SuspicionState,
    ) {
        let scale = self.evidence_scale();
        let claimants = self.claims.entry(claim.role).or_default();
        if !claimants.contains(&speaker) {
            claimants.push(speaker);
        }
        let rivals: Vec<SeatId> = claimants
            .iter()
            .copied()
            .filter(|s| *s != speaker && view.is_alive(*s))
            .collect();

        if claim.role.is_unique_claim() {
            if view.role == claim.role {
                // only one seat holds this role, and it is us
                suspicion.update_from_evidence(EvidenceKind::RoleClaimConflict, speaker, 2.0, day);
            } else if !rivals.is_empty() {
                for seat in rivals.iter().copied().chain([speaker]) {
                    suspicion.update_from_evidence(
                        EvidenceKind::RoleClaimConflict,
                        seat,
                        scale,
                        day,
                    );
                }
            }
        }

        let Some((subject, faction)) = claim.finding else {
            return;
        };
        if subject == self.seat {
            if faction != view.faction() {
                suspicion.update_from_evidence(EvidenceKind::RoleClaimConflict, speaker, 2.0, day);
            }
            return;
        }
        if suspicion.is_pinned(subject) {
            let known_wolf = suspicion.score(subject) > 0.5;
            if known_wolf != (faction == Faction::Werewolf) {
                suspicion.update_from_evidence(
                    EvidenceKind::NightResultConflict,
                    speaker,
                    1.5 * scale,
                    day,
                );
            }
            return;
        }
        let belief = (1.0 - suspicion.score(speaker)) * (0.5 + self.personality.trust);
        let direction = if faction == Faction::Werewolf { 1.0 } else { -1.0 };
        suspicion.update_from_evidence(
            EvidenceKind::NightResultConflict,
            subject,
            direction * 1.5 * belief * scale,
            day,
        );
    }

    fn observe_elimination(
        &mut self,
        view: &SeatView,
        eliminated: SeatId,
        role: RoleKind,
        suspicion: &mut SuspicionState,
    ) {
        let scale = self.evidence_scale();
        let strength = if role == RoleKind::Werewolf { -0.8 } else { 1.0 };
        let Some(day) = view
            .vote_history
            .iter()
            .filter(|v| v.target == eliminated)
            .map(|v| v.day)
            .max()
        else {
            return;
        };
        let voters: Vec<SeatId> = view
            .vote_history
            .iter()
            .filter(|v| v.day == day && v.target == eliminated)
            .map(|v| v.voter)
            .collect();
        for voter in voters {
            suspicion.update_from_evidence(
                EvidenceKind::VotingPatternDivergence,
                voter,
                strength * scale,
                day,
            );
        }
    }
}
