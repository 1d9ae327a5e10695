//! History Log: the append-only award ledger.
//!
//! Entries are never mutated or deleted. When a participant is hard-removed
//! the only permitted change is neutralizing the subject reference.

use crate::{
    error::RotationResult,
    store::RotationStore,
    types::{CycleNumber, EntityId, Points, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AwardEvent {
    pub award_id: EntityId,
    /// `None` once the subject has been removed from the roster.
    pub subject_id: Option<EntityId>,
    /// Display name at award time.
    pub subject_name: String,
    pub tier: String,
    pub points: Points,
    /// Cycle active at the moment of the award.
    pub cycle: CycleNumber,
    pub awarded_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopAwardee {
    pub participant_id: EntityId,
    pub name: String,
    pub total_awards: u64,
    pub total_points: Points,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwardStats {
    pub distinct_awardees: u64,
    pub total_awards: u64,
    pub total_points: Points,
    /// Mean awards per participant that holds at least one.
    pub avg_awards_per_awardee: f64,
    pub top_awardees: Vec<TopAwardee>,
}

pub struct HistoryLog<'a> {
    store: &'a RotationStore,
}

impl<'a> HistoryLog<'a> {
    pub fn new(store: &'a RotationStore) -> Self {
        Self { store }
    }

    pub fn append(&self, award: &AwardEvent) -> RotationResult<()> {
        self.store.insert_award(award)
    }

    /// Awards for one participant, most recent first.
    pub fn records_for(&self, participant_id: &str) -> RotationResult<Vec<AwardEvent>> {
        self.store.awards_for_subject(participant_id)
    }

    /// Latest awards across the roster, most recent first.
    pub fn recent(&self, limit: usize) -> RotationResult<Vec<AwardEvent>> {
        self.store.recent_awards(limit)
    }

    pub fn stats(&self, top_n: usize) -> RotationResult<AwardStats> {
        let totals = self.store.award_stats()?;
        let avg_awards_per_awardee = if totals.distinct_awardees == 0 {
            0.0
        } else {
            totals.attributed_awards as f64 / totals.distinct_awardees as f64
        };
        Ok(AwardStats {
            distinct_awardees: totals.distinct_awardees,
            total_awards: totals.total_awards,
            total_points: totals.total_points,
            avg_awards_per_awardee,
            top_awardees: self.store.top_awardees(top_n)?,
        })
    }
}
