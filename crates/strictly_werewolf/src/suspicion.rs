//! Per-seat belief model.
//!
//! Every AI seat keeps its own suspicion scores in `[0, 1]` for every other
//! seat. Scores start at a neutral prior and move with weighted evidence.
//! Seats never read each other's models.

use crate::types::SeatId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{instrument, trace};

/// Score every seat starts at.
pub const NEUTRAL_PRIOR: f32 = 0.5;

/// Evidence entries kept per model.
pub const EVIDENCE_LOG_CAPACITY: usize = 64;

/// Weight of a speech that contradicts what the observer believes.
pub const CONTRADICTION_IN_SPEECH_WEIGHT: f32 = 0.25;
/// Weight of a vote that went against a revealed role.
pub const VOTING_PATTERN_DIVERGENCE_WEIGHT: f32 = 0.3;
/// Weight of a claimed night result that conflicts with known facts.
pub const NIGHT_RESULT_CONFLICT_WEIGHT: f32 = 0.4;
/// Weight of competing claims of the same role.
pub const ROLE_CLAIM_CONFLICT_WEIGHT: f32 = 0.35;

/// Kind of evidence a seat can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum EvidenceKind {
    /// A speech at odds with the observer's beliefs.
    #[display("contradiction in speech")]
    ContradictionInSpeech,
    /// A vote at odds with what was later revealed.
    #[display("voting pattern divergence")]
    VotingPatternDivergence,
    /// A night result at odds with known facts.
    #[display("night result conflict")]
    NightResultConflict,
    /// Two seats claiming the same unique role.
    #[display("role claim conflict")]
    RoleClaimConflict,
}

impl EvidenceKind {
    /// Default weight of this evidence kind.
    pub fn weight(self) -> f32 {
        match self {
            EvidenceKind::ContradictionInSpeech => CONTRADICTION_IN_SPEECH_WEIGHT,
            EvidenceKind::VotingPatternDivergence => VOTING_PATTERN_DIVERGENCE_WEIGHT,
            EvidenceKind::NightResultConflict => NIGHT_RESULT_CONFLICT_WEIGHT,
            EvidenceKind::RoleClaimConflict => ROLE_CLAIM_CONFLICT_WEIGHT,
        }
    }
}

/// One piece of evidence applied to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Kind of evidence.
    pub kind: EvidenceKind,
    /// Seat the evidence is about.
    pub subject: SeatId,
    /// Signed strength; positive means more suspicious.
    pub strength: f32,
    /// Score after applying it.
    pub resulting: f32,
    /// Day it was observed.
    pub day: u32,
}

/// Suspicion scores held by one seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionState {
    owner: SeatId,
    beliefs: BTreeMap<SeatId, f32>,
    pinned: BTreeSet<SeatId>,
    log: VecDeque<Evidence>,
}

impl SuspicionState {
    /// Model for `owner` over `seats`, all at the neutral prior. The owner
    /// never tracks itself.
    #[instrument(skip(seats))]
    pub fn new(owner: SeatId, seats: impl IntoIterator<Item = SeatId>) -> Self {
        let beliefs = seats
            .into_iter()
            .filter(|s| *s != owner)
            .map(|s| (s, NEUTRAL_PRIOR))
            .collect();
        Self {
            owner,
            beliefs,
            pinned: BTreeSet::new(),
            log: VecDeque::new(),
        }
    }

    /// Seat holding this model.
    pub fn owner(&self) -> SeatId {
        self.owner
    }

    /// Current score for `subject`; the prior for unknown seats.
    pub fn score(&self, subject: SeatId) -> f32 {
        self.beliefs.get(&subject).copied().unwrap_or(NEUTRAL_PRIOR)
    }

    /// All tracked scores in seat order.
    pub fn scores(&self) -> &BTreeMap<SeatId, f32> {
        &self.beliefs
    }

    /// Whether the score of `subject` is fixed by certain knowledge.
    pub fn is_pinned(&self, subject: SeatId) -> bool {
        self.pinned.contains(&subject)
    }

    /// Most recent evidence, oldest first.
    pub fn evidence(&self) -> impl Iterator<Item = &Evidence> {
        self.log.iter()
    }

    /// Moves the score of `subject` by `weight(kind) * strength`, clamped to
    /// `[0, 1]`. Pinned seats and the owner are left alone. Returns the new
    /// score.
    #[instrument(skip(self), fields(owner = %self.owner))]
    pub fn update_from_evidence(
        &mut self,
        kind: EvidenceKind,
        subject: SeatId,
        strength: f32,
        day: u32,
    ) -> f32 {
        if subject == self.owner || self.pinned.contains(&subject) {
            return self.score(subject);
        }
        let entry = self.beliefs.entry(subject).or_insert(NEUTRAL_PRIOR);
        *entry = (*entry + kind.weight() * strength).clamp(0.0, 1.0);
        let resulting = *entry;
        trace!(%subject, %kind, strength, resulting, "Suspicion updated");

        if self.log.len() == EVIDENCE_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(Evidence {
            kind,
            subject,
            strength,
            resulting,
            day,
        });
        resulting
    }

    /// Fixes the score of `subject`; later evidence no longer moves it.
    pub fn pin(&mut self, subject: SeatId, score: f32) {
        if subject == self.owner {
            return;
        }
        self.beliefs.insert(subject, score.clamp(0.0, 1.0));
        self.pinned.insert(subject);
    }

    /// Highest score among every tracked seat; ties go to the lowest seat.
    pub fn most_suspicious(&self) -> Option<SeatId> {
        self.most_suspicious_among(self.beliefs.keys().copied())
    }

    /// Lowest score among every tracked seat; ties go to the lowest seat.
    pub fn most_trusted(&self) -> Option<SeatId> {
        self.most_trusted_among(self.beliefs.keys().copied())
    }

    /// Highest score among `candidates`; ties go to the lowest seat.
    pub fn most_suspicious_among(&self, candidates: impl IntoIterator<Item = SeatId>) -> Option<SeatId> {
        self.ranked(candidates)
            .into_iter()
            .max_by(|(seat_a, a), (seat_b, b)| a.total_cmp(b).then(seat_b.cmp(seat_a)))
            .map(|(seat, _)| seat)
    }

    /// Lowest score among `candidates`; ties go to the lowest seat.
    pub fn most_trusted_among(&self, candidates: impl IntoIterator<Item = SeatId>) -> Option<SeatId> {
        self.ranked(candidates)
            .into_iter()
            .min_by(|(seat_a, a), (seat_b, b)| a.total_cmp(b).then(seat_a.cmp(seat_b)))
            .map(|(seat, _)| seat)
    }

    /// Candidates whose score is within `band` of the highest, in seat order.
    pub fn near_top(&self, candidates: impl IntoIterator<Item = SeatId>, band: f32) -> Vec<SeatId> {
        let ranked = self.ranked(candidates);
        let Some(top) = ranked.iter().map(|(_, s)| *s).max_by(f32::total_cmp) else {
            return Vec::new();
        };
        let mut near: Vec<SeatId> = ranked
            .into_iter()
            .filter(|(_, score)| top - score <= band)
            .map(|(seat, _)| seat)
            .collect();
        near.sort();
        near
    }

    fn ranked(&self, candidates: impl IntoIterator<Item = SeatId>) -> Vec<(SeatId, f32)> {
        candidates
            .into_iter()
            .filter(|s| *s != self.owner)
            .map(|s| (s, self.score(s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SuspicionState {
        SuspicionState::new(SeatId(0), (0..6).map(SeatId))
    }

    #[test]
    fn test_starts_neutral_without_self() {
        let m = model();
        assert_eq!(m.scores().len(), 5);
        assert!(m.scores().values().all(|s| *s == NEUTRAL_PRIOR));
        assert!(!m.scores().contains_key(&SeatId(0)));
    }

    #[test]
    fn test_ties_break_to_lowest_seat() {
        let m = model();
        assert_eq!(m.most_suspicious(), Some(SeatId(1)));
        assert_eq!(m.most_trusted(), Some(SeatId(1)));
    }

    #[test]
    fn test_evidence_moves_and_clamps() {
        let mut m = model();
        let after = m.update_from_evidence(EvidenceKind::RoleClaimConflict, SeatId(3), 1.0, 1);
        assert!((after - (NEUTRAL_PRIOR + ROLE_CLAIM_CONFLICT_WEIGHT)).abs() < 1e-6);
        for _ in 0..10 {
            m.update_from_evidence(EvidenceKind::NightResultConflict, SeatId(3), 1.0, 1);
        }
        assert_eq!(m.score(SeatId(3)), 1.0);
        assert_eq!(m.most_suspicious(), Some(SeatId(3)));
    }

    #[test]
    fn test_pinned_scores_ignore_evidence() {
        let mut m = model();
        m.pin(SeatId(2), 0.0);
        m.update_from_evidence(EvidenceKind::ContradictionInSpeech, SeatId(2), 1.0, 1);
        assert_eq!(m.score(SeatId(2)), 0.0);
        assert_eq!(m.most_trusted(), Some(SeatId(2)));
    }

    #[test]
    fn test_owner_is_never_updated() {
        let mut m = model();
        m.update_from_evidence(EvidenceKind::ContradictionInSpeech, SeatId(0), 1.0, 1);
        assert!(m.evidence().next().is_none());
        assert_eq!(m.most_suspicious_among([SeatId(0)]), None);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut m = model();
        for i in 0..(EVIDENCE_LOG_CAPACITY + 10) {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            m.update_from_evidence(EvidenceKind::VotingPatternDivergence, SeatId(4), sign, 1);
        }
        assert_eq!(m.evidence().count(), EVIDENCE_LOG_CAPACITY);
    }

    #[test]
    fn test_near_top_band() {
        let mut m = model();
        m.update_from_evidence(EvidenceKind::RoleClaimConflict, SeatId(5), 0.1, 1);
        m.update_from_evidence(EvidenceKind::RoleClaimConflict, SeatId(2), 0.08, 1);
        let near = m.near_top([SeatId(1), SeatId(2), SeatId(5)], 0.02);
        assert_eq!(near, vec![SeatId(2), SeatId(5)]);
    }
}
