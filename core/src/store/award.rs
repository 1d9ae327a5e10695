//! Store methods for the append-only award ledger.

use super::RotationStore;
use crate::{
    error::RotationResult,
    history::{AwardEvent, TopAwardee},
    types::{from_millis, to_millis},
};
use rusqlite::{params, OptionalExtension, Row};

/// Placeholder written over the name snapshot of a removed participant.
pub const REMOVED_SUBJECT_NAME: &str = "(removed participant)";

const AWARD_COLUMNS: &str =
    "award_id, subject_id, subject_name, tier, points, cycle_number, awarded_at";

fn award_from_row(row: &Row<'_>) -> rusqlite::Result<AwardEvent> {
    Ok(AwardEvent {
        award_id: row.get(0)?,
        subject_id: row.get(1)?,
        subject_name: row.get(2)?,
        tier: row.get(3)?,
        points: row.get::<_, i64>(4)? as u64,
        cycle: row.get::<_, i64>(5)? as u64,
        awarded_at: from_millis(row.get(6)?),
    })
}

/// Ledger-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardStatsRow {
    pub distinct_awardees: u64,
    pub total_awards: u64,
    /// Awards whose subject is still on the roster.
    pub attributed_awards: u64,
    pub total_points: u64,
}

impl RotationStore {
    pub fn insert_award(&self, award: &AwardEvent) -> RotationResult<()> {
        self.conn.execute(
            "INSERT INTO award_event (
                award_id, subject_id, subject_name, tier, points, cycle_number, awarded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &award.award_id,
                &award.subject_id,
                &award.subject_name,
                &award.tier,
                award.points as i64,
                award.cycle as i64,
                to_millis(&award.awarded_at),
            ],
        )?;
        Ok(())
    }

    pub fn award(&self, award_id: &str) -> RotationResult<Option<AwardEvent>> {
        let award = self
            .conn
            .query_row(
                &format!("SELECT {AWARD_COLUMNS} FROM award_event WHERE award_id = ?1"),
                params![award_id],
                award_from_row,
            )
            .optional()?;
        Ok(award)
    }

    /// Most recent first; append order breaks timestamp ties.
    pub fn awards_for_subject(&self, subject_id: &str) -> RotationResult<Vec<AwardEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AWARD_COLUMNS} FROM award_event
             WHERE subject_id = ?1
             ORDER BY awarded_at DESC, seq DESC"
        ))?;
        let rows = stmt.query_map(params![subject_id], award_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn recent_awards(&self, limit: usize) -> RotationResult<Vec<AwardEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {AWARD_COLUMNS} FROM award_event
             ORDER BY awarded_at DESC, seq DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], award_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Detach awards from a subject that is leaving the roster.
    /// Rows are kept; only the subject reference is neutralized.
    pub fn anonymize_awards(&self, subject_id: &str) -> RotationResult<u64> {
        let rows = self.conn.execute(
            "UPDATE award_event SET subject_id = NULL, subject_name = ?2 WHERE subject_id = ?1",
            params![subject_id, REMOVED_SUBJECT_NAME],
        )?;
        Ok(rows as u64)
    }

    pub fn award_count(&self) -> RotationResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM award_event", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn award_stats(&self) -> RotationResult<AwardStatsRow> {
        let row = self.conn.query_row(
            "SELECT COUNT(DISTINCT subject_id), COUNT(*), COUNT(subject_id), COALESCE(SUM(points), 0)
             FROM award_event",
            [],
            |row| {
                Ok(AwardStatsRow {
                    distinct_awardees: row.get::<_, i64>(0)? as u64,
                    total_awards: row.get::<_, i64>(1)? as u64,
                    attributed_awards: row.get::<_, i64>(2)? as u64,
                    total_points: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(row)
    }

    /// Participants with at least one award, most awarded first.
    pub fn top_awardees(&self, limit: usize) -> RotationResult<Vec<TopAwardee>> {
        let mut stmt = self.conn.prepare(
            "SELECT participant_id, name, total_awards, total_points
             FROM participant
             WHERE total_awards > 0
             ORDER BY total_awards DESC, name ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(TopAwardee {
                participant_id: row.get(0)?,
                name: row.get(1)?,
                total_awards: row.get::<_, i64>(2)? as u64,
                total_points: row.get::<_, i64>(3)? as u64,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
