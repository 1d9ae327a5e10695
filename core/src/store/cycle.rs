//! Store methods for per-cycle completion bookkeeping.

use super::RotationStore;
use crate::{
    error::RotationResult,
    ranker::CandidateState,
    types::{from_millis, CycleNumber, EntityId},
};
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;

impl RotationStore {
    /// Highest cycle number with any record; 0 when none exist.
    pub fn max_cycle_number(&self) -> RotationResult<CycleNumber> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(cycle_number) FROM cycle_record",
            [],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) as CycleNumber)
    }

    /// Insert a fresh (not awarded) record unless one exists.
    /// Returns true if a row was created.
    pub fn insert_cycle_record_if_absent(
        &self,
        participant_id: &str,
        cycle: CycleNumber,
    ) -> RotationResult<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO cycle_record (participant_id, cycle_number, has_been_awarded)
             VALUES (?1, ?2, 0)",
            params![participant_id, cycle as i64],
        )?;
        Ok(rows > 0)
    }

    /// Upsert the record for (participant, cycle) to awarded.
    pub fn upsert_cycle_awarded(
        &self,
        participant_id: &str,
        cycle: CycleNumber,
    ) -> RotationResult<()> {
        self.conn.execute(
            "INSERT INTO cycle_record (participant_id, cycle_number, has_been_awarded)
             VALUES (?1, ?2, 1)
             ON CONFLICT (participant_id, cycle_number) DO UPDATE SET has_been_awarded = 1",
            params![participant_id, cycle as i64],
        )?;
        Ok(())
    }

    /// Ids holding an awarded record in `cycle`.
    pub fn awarded_ids_in_cycle(&self, cycle: CycleNumber) -> RotationResult<HashSet<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id FROM cycle_record
             WHERE cycle_number = ?1 AND has_been_awarded = 1",
        )?;
        let ids = stmt.query_map(params![cycle as i64], |row| row.get(0))?;
        ids.collect::<Result<HashSet<_>, _>>().map_err(Into::into)
    }

    /// The stored awarded flag, `None` when no record exists.
    pub fn cycle_record(
        &self,
        participant_id: &str,
        cycle: CycleNumber,
    ) -> RotationResult<Option<bool>> {
        let flag = self
            .conn
            .query_row(
                "SELECT has_been_awarded FROM cycle_record
                 WHERE participant_id = ?1 AND cycle_number = ?2",
                params![participant_id, cycle as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(flag)
    }

    /// Number of records for a participant in a cycle (0 or 1).
    pub fn cycle_record_count(
        &self,
        participant_id: &str,
        cycle: CycleNumber,
    ) -> RotationResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cycle_record WHERE participant_id = ?1 AND cycle_number = ?2",
            params![participant_id, cycle as i64],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Active participants joined with their awarded flag for `cycle`.
    /// A missing record reads as not awarded.
    pub fn candidate_states(&self, cycle: CycleNumber) -> RotationResult<Vec<CandidateState>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.participant_id, p.name, p.total_awards, p.total_points, p.last_award_at,
                    COALESCE(cr.has_been_awarded, 0)
             FROM participant p
             LEFT JOIN cycle_record cr
                    ON cr.participant_id = p.participant_id AND cr.cycle_number = ?1
             WHERE p.active = 1",
        )?;
        let rows = stmt.query_map(params![cycle as i64], |row| {
            Ok(CandidateState {
                participant_id: row.get(0)?,
                name: row.get(1)?,
                total_awards: row.get::<_, i64>(2)? as u64,
                total_points: row.get::<_, i64>(3)? as u64,
                last_award_at: row.get::<_, Option<i64>>(4)?.map(from_millis),
                awarded_this_cycle: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
