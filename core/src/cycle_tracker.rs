//! Cycle Tracker: per-cycle completion bookkeeping.
//!
//! A cycle is complete when every currently active participant holds an
//! awarded record for it and at least one active participant exists.
//! Completion opens cycle N+1 with a fresh record per active participant.
//! Records from earlier cycles are kept.
//!
//! RULE: the tracker issues plain statements. Callers that need several
//! calls to land together run them inside `RotationStore::atomic`.

use crate::{
    error::{RotationError, RotationResult},
    store::RotationStore,
    types::{CycleNumber, EntityId},
};

pub struct CycleTracker<'a> {
    store: &'a RotationStore,
}

impl<'a> CycleTracker<'a> {
    pub fn new(store: &'a RotationStore) -> Self {
        Self { store }
    }

    /// Maximum cycle number holding any record; 0 if none exist.
    pub fn current_cycle(&self) -> RotationResult<CycleNumber> {
        self.store.max_cycle_number()
    }

    /// Materialize a not-awarded record for the current cycle if missing.
    /// Idempotent. Returns true when a record was created.
    pub fn ensure_tracked(&self, participant_id: &str) -> RotationResult<bool> {
        let cycle = self.current_cycle()?;
        let created = self.store.insert_cycle_record_if_absent(participant_id, cycle)?;
        if created {
            log::debug!("cycle={cycle} tracking participant {participant_id}");
        }
        Ok(created)
    }

    /// Mark the participant awarded in the current cycle, creating the
    /// record if absent. Returns the cycle used. Re-marking is a no-op.
    pub fn mark_awarded(&self, participant_id: &str) -> RotationResult<CycleNumber> {
        let cycle = self.current_cycle()?;
        self.store.upsert_cycle_awarded(participant_id, cycle)?;
        Ok(cycle)
    }

    /// Whether the current cycle is complete for this active set.
    pub fn is_complete(&self, active_participant_ids: &[EntityId]) -> RotationResult<bool> {
        if active_participant_ids.is_empty() {
            return Ok(false);
        }
        let cycle = self.current_cycle()?;
        let awarded = self.store.awarded_ids_in_cycle(cycle)?;
        Ok(active_participant_ids.iter().all(|id| awarded.contains(id)))
    }

    /// Advance by exactly one cycle if the current one is complete.
    ///
    /// The new cycle starts with not-awarded records for every active id,
    /// so a repeated call for the same completion finds it incomplete.
    pub fn check_and_advance_if_complete(
        &self,
        active_participant_ids: &[EntityId],
    ) -> RotationResult<bool> {
        if !self.is_complete(active_participant_ids)? {
            return Ok(false);
        }
        let next = self.open_next_cycle(active_participant_ids)?;
        log::info!("cycle={} complete, rotation advanced to {next}", next - 1);
        Ok(true)
    }

    /// Open cycle N+1 regardless of completion. Returns the new number.
    pub fn force_advance(&self, active_participant_ids: &[EntityId]) -> RotationResult<CycleNumber> {
        if active_participant_ids.is_empty() {
            return Err(RotationError::Validation(
                "cannot open a new cycle with no active participants".into(),
            ));
        }
        let next = self.open_next_cycle(active_participant_ids)?;
        log::info!("rotation force-advanced to cycle={next}");
        Ok(next)
    }

    fn open_next_cycle(&self, active_participant_ids: &[EntityId]) -> RotationResult<CycleNumber> {
        let next = self.current_cycle()? + 1;
        for id in active_participant_ids {
            self.store.insert_cycle_record_if_absent(id, next)?;
        }
        Ok(next)
    }
}
