//! Candidate Ranker: deterministic "who goes next" ordering.
//!
//! Sort key, in precedence order:
//!   1. not awarded this cycle before awarded
//!   2. fewer total awards first
//!   3. never awarded before any timestamp, then earlier timestamps first
//!   4. name ascending
//!
//! Ranking is a pure function of a state snapshot. It never creates cycle
//! records; a participant without a record reads as not awarded.

use crate::types::{EntityId, Points, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Per-participant input to the ranker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateState {
    pub participant_id: EntityId,
    pub name: String,
    pub total_awards: u64,
    pub total_points: Points,
    pub last_award_at: Option<Timestamp>,
    pub awarded_this_cycle: bool,
}

/// "Never awarded" is its own value, ordered before every real instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LastAward {
    Never,
    At(Timestamp),
}

impl From<Option<Timestamp>> for LastAward {
    fn from(ts: Option<Timestamp>) -> Self {
        ts.map_or(Self::Never, Self::At)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateSummary {
    pub participant_id: EntityId,
    pub name: String,
    pub total_awards: u64,
    pub total_points: Points,
    pub last_award_at: Option<Timestamp>,
    pub awarded_this_cycle: bool,
    pub priority: Priority,
}

impl From<CandidateState> for CandidateSummary {
    fn from(s: CandidateState) -> Self {
        let priority = if s.awarded_this_cycle { Priority::Low } else { Priority::High };
        Self {
            participant_id: s.participant_id,
            name: s.name,
            total_awards: s.total_awards,
            total_points: s.total_points,
            last_award_at: s.last_award_at,
            awarded_this_cycle: s.awarded_this_cycle,
            priority,
        }
    }
}

pub fn compare_candidates(a: &CandidateState, b: &CandidateState) -> Ordering {
    a.awarded_this_cycle
        .cmp(&b.awarded_this_cycle)
        .then_with(|| a.total_awards.cmp(&b.total_awards))
        .then_with(|| LastAward::from(a.last_award_at).cmp(&LastAward::from(b.last_award_at)))
        .then_with(|| a.name.cmp(&b.name))
        // Names are unique on the roster; ids keep the order total regardless.
        .then_with(|| a.participant_id.cmp(&b.participant_id))
}

/// Full fairness ordering of the given active participants.
pub fn rank(mut states: Vec<CandidateState>) -> Vec<CandidateSummary> {
    states.sort_by(compare_candidates);
    states.into_iter().map(CandidateSummary::from).collect()
}

/// First element of [`rank`], or `None` for an empty active set.
pub fn next_candidate(states: Vec<CandidateState>) -> Option<CandidateSummary> {
    states
        .into_iter()
        .min_by(compare_candidates)
        .map(CandidateSummary::from)
}
