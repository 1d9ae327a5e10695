//! Roster Store contract: participant records and their award aggregates.
//!
//! The engine consumes this contract; `RotationStore` is the SQLite
//! implementation (see store/participant.rs).

use crate::{
    error::{RotationError, RotationResult},
    types::{EntityId, Points, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub participant_id: EntityId,
    pub name: String,
    pub active: bool,
    pub total_awards: u64,
    pub total_points: Points,
    pub last_award_at: Option<Timestamp>,
    /// Only set when `last_award_at` is set.
    pub last_award_tier: Option<String>,
}

/// Typed partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl ParticipantPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.active.is_none()
    }
}

/// Roster-wide counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    /// Mean `total_awards` over every participant, active or not.
    pub avg_awards: f64,
}

/// The aggregate change applied by a single award.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateUpdate {
    pub points: Points,
    pub tier: String,
    pub awarded_at: Timestamp,
}

pub trait RosterStore {
    fn participant(&self, participant_id: &str) -> RotationResult<Option<Participant>>;

    fn active_participant_ids(&self) -> RotationResult<Vec<EntityId>>;

    /// totalAwards += 1, totalPoints += points, last award = (at, tier).
    fn apply_aggregate_update(
        &self,
        participant_id: &str,
        update: &AggregateUpdate,
    ) -> RotationResult<()>;

    /// Resolve an award-eligible participant.
    fn active_participant(&self, participant_id: &str) -> RotationResult<Participant> {
        match self.participant(participant_id)? {
            None => Err(RotationError::participant_not_found(participant_id)),
            Some(p) if !p.active => Err(RotationError::Inactive { id: p.participant_id }),
            Some(p) => Ok(p),
        }
    }
}

/// Trim and reject empty display names.
pub fn normalize_name(name: &str) -> RotationResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RotationError::Validation("participant name must be non-empty".into()));
    }
    Ok(trimmed.to_string())
}
