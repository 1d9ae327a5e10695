//! Engine audit events.
//!
//! RULE: every committed mutation appends exactly the events that describe
//! it, inside the same transaction. A rolled-back call leaves no events.

use crate::types::{CycleNumber, EntityId, Points, Timestamp};
use serde::{Deserialize, Serialize};

/// Variants are added over time, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RotationEvent {
    // ── Roster events ─────────────────────────────
    ParticipantAdded {
        participant_id: EntityId,
        name: String,
        active: bool,
    },
    ParticipantUpdated {
        participant_id: EntityId,
        name: Option<String>,
        active: Option<bool>,
    },
    ParticipantRemoved {
        participant_id: EntityId,
        anonymized_awards: u64,
    },

    // ── Award events ──────────────────────────────
    AwardGranted {
        award_id: EntityId,
        participant_id: EntityId,
        tier: String,
        points: Points,
        cycle: CycleNumber,
    },

    // ── Rotation events ───────────────────────────
    RotationAdvanced {
        from_cycle: CycleNumber,
        to_cycle: CycleNumber,
        reason: AdvanceReason,
        participants: usize,
    },
}

impl RotationEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ParticipantAdded { .. }   => "participant_added",
            Self::ParticipantUpdated { .. } => "participant_updated",
            Self::ParticipantRemoved { .. } => "participant_removed",
            Self::AwardGranted { .. }       => "award_granted",
            Self::RotationAdvanced { .. }   => "rotation_advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceReason {
    /// Every active participant was awarded in the cycle.
    Completed,
    /// Operator override.
    Manual,
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub event_type: String,
    pub payload: String, // JSON-serialized RotationEvent
    pub created_at: Timestamp,
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<RotationEvent> {
        serde_json::from_str(&self.payload)
    }
}
