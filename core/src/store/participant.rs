use super::RotationStore;
use crate::{
    error::{RotationError, RotationResult},
    roster::{AggregateUpdate, Participant, ParticipantPatch, RosterStats, RosterStore},
    types::{from_millis, to_millis, EntityId, Timestamp},
};
use rusqlite::{ffi, params, OptionalExtension, Row};

const PARTICIPANT_COLUMNS: &str =
    "participant_id, name, active, total_awards, total_points, last_award_at, last_award_tier";

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        participant_id: row.get(0)?,
        name: row.get(1)?,
        active: row.get(2)?,
        total_awards: row.get::<_, i64>(3)? as u64,
        total_points: row.get::<_, i64>(4)? as u64,
        last_award_at: row.get::<_, Option<i64>>(5)?.map(from_millis),
        last_award_tier: row.get(6)?,
    })
}

/// Unique-key violations become `Conflict`; everything else stays internal.
fn name_conflict(err: rusqlite::Error, name: &str) -> RotationError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RotationError::Conflict(format!("participant name '{name}' is already taken"))
        }
        _ => err.into(),
    }
}

impl RotationStore {
    // ── Participant ───────────────────────────────────────────────

    pub fn insert_participant(
        &self,
        participant_id: &str,
        name: &str,
        active: bool,
        created_at: &Timestamp,
    ) -> RotationResult<()> {
        self.conn
            .execute(
                "INSERT INTO participant (participant_id, name, active, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![participant_id, name, active, to_millis(created_at)],
            )
            .map_err(|e| name_conflict(e, name))?;
        Ok(())
    }

    /// Apply a partial update through one fixed statement.
    /// Returns false when no such participant exists.
    pub fn patch_participant(
        &self,
        participant_id: &str,
        patch: &ParticipantPatch,
    ) -> RotationResult<bool> {
        let name = patch.name.as_deref();
        let rows = self
            .conn
            .execute(
                "UPDATE participant
                 SET name   = COALESCE(?2, name),
                     active = COALESCE(?3, active)
                 WHERE participant_id = ?1",
                params![participant_id, name, patch.active],
            )
            .map_err(|e| name_conflict(e, name.unwrap_or_default()))?;
        Ok(rows > 0)
    }

    /// Hard-delete a roster row. History is handled separately.
    pub fn delete_participant(&self, participant_id: &str) -> RotationResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM participant WHERE participant_id = ?1",
            params![participant_id],
        )?;
        Ok(rows > 0)
    }

    /// Every participant, active or not, by name.
    pub fn participants(&self) -> RotationResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participant ORDER BY name ASC"
        ))?;
        let rows = stmt.query_map([], participant_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Award-eligible participants only, by name.
    pub fn active_participants(&self) -> RotationResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participant WHERE active = 1 ORDER BY name ASC"
        ))?;
        let rows = stmt.query_map([], participant_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn roster_stats(&self) -> RotationResult<RosterStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(active), 0), COALESCE(AVG(total_awards), 0.0)
             FROM participant",
            [],
            |row| {
                let total = row.get::<_, i64>(0)? as u64;
                let active = row.get::<_, i64>(1)? as u64;
                Ok(RosterStats {
                    total,
                    active,
                    inactive: total - active,
                    avg_awards: row.get(2)?,
                })
            },
        )?;
        Ok(stats)
    }
}

impl RosterStore for RotationStore {
    fn participant(&self, participant_id: &str) -> RotationResult<Option<Participant>> {
        let participant = self
            .conn
            .query_row(
                &format!("SELECT {PARTICIPANT_COLUMNS} FROM participant WHERE participant_id = ?1"),
                params![participant_id],
                participant_from_row,
            )
            .optional()?;
        Ok(participant)
    }

    fn active_participant_ids(&self) -> RotationResult<Vec<EntityId>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id FROM participant WHERE active = 1 ORDER BY participant_id ASC",
        )?;
        let ids = stmt.query_map([], |row| row.get(0))?;
        ids.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn apply_aggregate_update(
        &self,
        participant_id: &str,
        update: &AggregateUpdate,
    ) -> RotationResult<()> {
        let rows = self.conn.execute(
            "UPDATE participant
             SET total_awards    = total_awards + 1,
                 total_points    = total_points + ?2,
                 last_award_at   = ?3,
                 last_award_tier = ?4
             WHERE participant_id = ?1",
            params![
                participant_id,
                update.points as i64,
                to_millis(&update.awarded_at),
                &update.tier
            ],
        )?;
        if rows == 0 {
            return Err(RotationError::participant_not_found(participant_id));
        }
        Ok(())
    }
}
